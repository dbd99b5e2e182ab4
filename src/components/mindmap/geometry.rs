//! Absolute bounds resolution for parent-relative node positions.

use super::graph::MindmapGraph;
use super::types::{Node, NodeKind};

pub const GROUP_DEFAULT_WIDTH: f64 = 300.0;
pub const GROUP_DEFAULT_HEIGHT: f64 = 200.0;
pub const NODE_DEFAULT_WIDTH: f64 = 150.0;
pub const NODE_DEFAULT_HEIGHT: f64 = 36.0;
pub const NODE_MAX_WIDTH: f64 = 420.0;

/// Group interior insets. The top inset is larger to reserve a band for
/// the group label.
pub const GROUP_PAD: f64 = 10.0;
pub const GROUP_PAD_TOP: f64 = 40.0;

const APPROX_CHAR_WIDTH: f64 = 7.25;
const LABEL_CHROME_WIDTH: f64 = 24.0;

/// Resolved, canvas-absolute box for one node.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Bounds {
	pub x: f64,
	pub y: f64,
	pub width: f64,
	pub height: f64,
}

impl Bounds {
	pub fn center_x(&self) -> f64 {
		self.x + self.width / 2.0
	}

	pub fn center_y(&self) -> f64 {
		self.y + self.height / 2.0
	}

	pub fn contains(&self, x: f64, y: f64) -> bool {
		x >= self.x && x <= self.x + self.width && y >= self.y && y <= self.y + self.height
	}
}

/// Kind-default footprint, ignoring style overrides and label measurement.
/// This is the footprint the drag constraint engine works with.
pub fn default_size(kind: NodeKind) -> (f64, f64) {
	match kind {
		NodeKind::Group => (GROUP_DEFAULT_WIDTH, GROUP_DEFAULT_HEIGHT),
		NodeKind::Default => (NODE_DEFAULT_WIDTH, NODE_DEFAULT_HEIGHT),
	}
}

/// Resolved width/height: explicit `style` override, else a measured label
/// width for plain nodes, else the kind default.
pub fn node_size(node: &Node) -> (f64, f64) {
	let (default_width, default_height) = default_size(node.kind);
	let width = node.style.width.unwrap_or_else(|| {
		if node.kind == NodeKind::Default && !node.data.label.is_empty() {
			measured_width(&node.data.label)
		} else {
			default_width
		}
	});
	let height = node.style.height.unwrap_or(default_height);
	(width, height)
}

fn measured_width(label: &str) -> f64 {
	let text = label.chars().count() as f64 * APPROX_CHAR_WIDTH + LABEL_CHROME_WIDTH;
	text.clamp(NODE_DEFAULT_WIDTH, NODE_MAX_WIDTH)
}

/// Canvas-absolute bounds, walking the containment chain up to the root.
/// O(depth): the parent chain is acyclic by store/normalize invariant.
pub fn node_bounds(graph: &MindmapGraph, node: &Node) -> Bounds {
	let (width, height) = node_size(node);
	let mut x = node.position.x;
	let mut y = node.position.y;
	let mut parent = node.parent.clone();
	while let Some(parent_id) = parent {
		match graph.node(&parent_id) {
			Some(p) => {
				x += p.position.x;
				y += p.position.y;
				parent = p.parent.clone();
			}
			None => break,
		}
	}
	Bounds { x, y, width, height }
}

/// Distance from a point to the closest point of a segment. Used for edge
/// hit-testing.
pub fn segment_distance(px: f64, py: f64, a: (f64, f64), b: (f64, f64)) -> f64 {
	let (dx, dy) = (b.0 - a.0, b.1 - a.1);
	let len_sq = dx * dx + dy * dy;
	let t = if len_sq == 0.0 {
		0.0
	} else {
		(((px - a.0) * dx + (py - a.1) * dy) / len_sq).clamp(0.0, 1.0)
	};
	let (cx, cy) = (a.0 + t * dx, a.1 + t * dy);
	((px - cx).powi(2) + (py - cy).powi(2)).sqrt()
}
