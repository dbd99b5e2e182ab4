pub mod mindmap;
