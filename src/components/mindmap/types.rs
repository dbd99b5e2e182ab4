/// A 2D point. For a node this is parent-relative when `parent` is set,
/// otherwise canvas-absolute.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Position {
	pub x: f64,
	pub y: f64,
}

impl Position {
	pub fn new(x: f64, y: f64) -> Self {
		Self { x, y }
	}
}

/// Node flavor: a plain labeled box, or a group container that can hold
/// children via their `parent` back-reference.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NodeKind {
	#[default]
	Default,
	Group,
}

/// User-editable node content. Empty strings mean "unset"; the renderer
/// falls back to theme defaults.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NodeData {
	pub label: String,
	pub description: String,
	pub border_color: String,
	pub background_color: String,
	pub label_color: String,
}

/// Explicit geometry overrides. Meaningful chiefly for groups, which keep
/// their grown size here; plain nodes usually leave all three unset.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NodeStyle {
	pub width: Option<f64>,
	pub height: Option<f64>,
	pub z_index: Option<i32>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Node {
	pub id: String,
	pub kind: NodeKind,
	pub position: Position,
	pub data: NodeData,
	pub style: NodeStyle,
	/// Id of a containing node of kind [`NodeKind::Group`]. The parent
	/// chain is acyclic; `normalize` and the store keep it that way.
	pub parent: Option<String>,
	pub draggable: bool,
}

impl Node {
	pub fn new(id: impl Into<String>, kind: NodeKind, position: Position) -> Self {
		Self {
			id: id.into(),
			kind,
			position,
			data: NodeData::default(),
			style: NodeStyle::default(),
			parent: None,
			draggable: true,
		}
	}
}

/// A directed connection between two nodes. Handle ids are view-derived
/// on every draw pass and never stored here.
#[derive(Clone, Debug, PartialEq)]
pub struct Edge {
	pub id: String,
	pub source: String,
	pub target: String,
	pub label: String,
	pub animated: bool,
}

impl Edge {
	pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			source: source.into(),
			target: target.into(),
			label: String::new(),
			animated: false,
		}
	}
}
