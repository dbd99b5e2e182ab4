//! Canvas 2D drawing: groups, then edges, then plain nodes, with the
//! selection highlight and animated edge dashes on top.

use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use super::geometry::{self, Bounds, GROUP_PAD};
use super::handles;
use super::state::MindmapState;
use super::types::{Node, NodeKind};

const CANVAS_BG: &str = "#1a1a2e";
const NODE_BG: &str = "#232342";
const NODE_BORDER: &str = "rgba(100, 180, 255, 0.8)";
const NODE_LABEL: &str = "#ffffff";
const GROUP_BG: &str = "rgba(100, 180, 255, 0.07)";
const GROUP_BORDER: &str = "rgba(100, 180, 255, 0.35)";
const EDGE_COLOR: &str = "rgba(100, 180, 255, 0.6)";
const EDGE_SELECTED: &str = "rgba(100, 180, 255, 0.95)";
const SELECTION_GLOW: &str = "rgba(255, 255, 255, 0.85)";
const PENDING_RING: &str = "rgba(255, 209, 102, 0.9)";

pub fn render(state: &MindmapState, ctx: &CanvasRenderingContext2d) {
	ctx.set_fill_style_str(CANVAS_BG);
	ctx.fill_rect(0.0, 0.0, state.width, state.height);
	ctx.save();
	let _ = ctx.translate(state.transform.x, state.transform.y);
	let _ = ctx.scale(state.transform.k, state.transform.k);
	draw_groups(state, ctx);
	draw_edges(state, ctx);
	draw_nodes(state, ctx);
	ctx.restore();
}

fn is_selected(state: &MindmapState, id: &str) -> bool {
	state.selection.selected().is_some_and(|element| element.id() == id)
}

fn fallback<'a>(value: &'a str, default: &'a str) -> &'a str {
	if value.is_empty() { default } else { value }
}

fn draw_groups(state: &MindmapState, ctx: &CanvasRenderingContext2d) {
	let k = state.transform.k;
	for node in state.draw_order() {
		if node.kind != NodeKind::Group {
			continue;
		}
		let bounds = geometry::node_bounds(&state.graph, node);
		let selected = is_selected(state, &node.id);

		ctx.set_fill_style_str(fallback(&node.data.background_color, GROUP_BG));
		ctx.fill_rect(bounds.x, bounds.y, bounds.width, bounds.height);
		ctx.set_stroke_style_str(fallback(&node.data.border_color, GROUP_BORDER));
		ctx.set_line_width(if selected { 2.5 / k } else { 1.0 / k });
		ctx.stroke_rect(bounds.x, bounds.y, bounds.width, bounds.height);

		if !node.data.label.is_empty() {
			ctx.set_fill_style_str(fallback(&node.data.label_color, NODE_LABEL));
			ctx.set_font(&format!("600 {}px sans-serif", 13.0 / k.max(0.5)));
			ctx.set_text_align("left");
			let _ = ctx.fill_text(&node.data.label, bounds.x + GROUP_PAD, bounds.y + 24.0);
		}
		draw_rings(state, ctx, node, &bounds);
	}
}

fn draw_edges(state: &MindmapState, ctx: &CanvasRenderingContext2d) {
	let k = state.transform.k;
	let (line_width, dash, gap, arrow_size) = (1.5 / k, 8.0 / k, 4.0 / k, 8.0 / k);
	let dash_offset = -(state.flow_time * 30.0) % (dash + gap);

	for edge in &state.graph.edges {
		let Some((from, to)) = handles::edge_anchors(&state.graph, edge) else {
			continue;
		};
		let (dx, dy) = (to.0 - from.0, to.1 - from.1);
		let dist = (dx * dx + dy * dy).sqrt();
		if dist < 0.001 {
			continue;
		}
		let selected = is_selected(state, &edge.id);

		ctx.set_stroke_style_str(if selected { EDGE_SELECTED } else { EDGE_COLOR });
		ctx.set_line_width(if selected { line_width * 1.6 } else { line_width });
		if edge.animated {
			let _ = ctx.set_line_dash(&js_sys::Array::of2(
				&JsValue::from_f64(dash),
				&JsValue::from_f64(gap),
			));
			ctx.set_line_dash_offset(dash_offset);
		}

		let (ux, uy) = (dx / dist, dy / dist);
		ctx.begin_path();
		ctx.move_to(from.0, from.1);
		ctx.line_to(to.0 - ux * arrow_size, to.1 - uy * arrow_size);
		ctx.stroke();
		let _ = ctx.set_line_dash(&js_sys::Array::new());

		// arrowhead triangle anchored at the target handle
		ctx.set_fill_style_str(if selected { EDGE_SELECTED } else { EDGE_COLOR });
		let (back_x, back_y) = (to.0 - ux * arrow_size, to.1 - uy * arrow_size);
		let (px, py) = (-uy * arrow_size * 0.5, ux * arrow_size * 0.5);
		ctx.begin_path();
		ctx.move_to(to.0, to.1);
		ctx.line_to(back_x + px, back_y + py);
		ctx.line_to(back_x - px, back_y - py);
		ctx.close_path();
		ctx.fill();

		if !edge.label.is_empty() {
			let (mx, my) = ((from.0 + to.0) / 2.0, (from.1 + to.1) / 2.0);
			ctx.set_fill_style_str(NODE_LABEL);
			ctx.set_font(&format!("{}px sans-serif", 10.0 / k.max(0.5)));
			ctx.set_text_align("center");
			let _ = ctx.fill_text(&edge.label, mx, my - 4.0 / k);
		}
	}
}

fn draw_nodes(state: &MindmapState, ctx: &CanvasRenderingContext2d) {
	let k = state.transform.k;
	for node in state.draw_order() {
		if node.kind != NodeKind::Default {
			continue;
		}
		let bounds = geometry::node_bounds(&state.graph, node);
		let selected = is_selected(state, &node.id);

		if selected {
			ctx.set_shadow_color(SELECTION_GLOW);
			ctx.set_shadow_blur(12.0 / k);
		}
		ctx.set_fill_style_str(fallback(&node.data.background_color, NODE_BG));
		ctx.fill_rect(bounds.x, bounds.y, bounds.width, bounds.height);
		ctx.set_shadow_blur(0.0);

		ctx.set_stroke_style_str(fallback(&node.data.border_color, NODE_BORDER));
		ctx.set_line_width(if selected { 2.5 / k } else { 1.5 / k });
		ctx.stroke_rect(bounds.x, bounds.y, bounds.width, bounds.height);

		if !node.data.label.is_empty() {
			ctx.set_fill_style_str(fallback(&node.data.label_color, NODE_LABEL));
			ctx.set_font(&format!("{}px sans-serif", 12.0 / k.max(0.5)));
			ctx.set_text_align("center");
			let _ = ctx.fill_text(&node.data.label, bounds.center_x(), bounds.center_y() + 4.0 / k);
		}
		if !node.data.description.is_empty() {
			ctx.set_fill_style_str("rgba(255, 255, 255, 0.55)");
			ctx.set_font(&format!("{}px sans-serif", 10.0 / k.max(0.5)));
			ctx.set_text_align("center");
			let _ = ctx.fill_text(
				&node.data.description,
				bounds.center_x(),
				bounds.y + bounds.height + 14.0 / k,
			);
		}
		draw_rings(state, ctx, node, &bounds);
	}
}

/// Dashed ring marking the pending source of a connect gesture.
fn draw_rings(state: &MindmapState, ctx: &CanvasRenderingContext2d, node: &Node, bounds: &Bounds) {
	if state.pending_connect.as_deref() != Some(node.id.as_str()) {
		return;
	}
	let k = state.transform.k;
	let inset = 4.0 / k;
	ctx.set_stroke_style_str(PENDING_RING);
	ctx.set_line_width(1.5 / k);
	let _ = ctx.set_line_dash(&js_sys::Array::of2(
		&JsValue::from_f64(4.0 / k),
		&JsValue::from_f64(3.0 / k),
	));
	ctx.stroke_rect(
		bounds.x - inset,
		bounds.y - inset,
		bounds.width + inset * 2.0,
		bounds.height + inset * 2.0,
	);
	let _ = ctx.set_line_dash(&js_sys::Array::new());
}
