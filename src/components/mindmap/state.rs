//! Selection/editing state machine and the pointer-interaction state the
//! component layer keeps between events.

use super::geometry;
use super::graph::MindmapGraph;
use super::handles;
use super::types::{Node, NodeKind};

/// Debounce window after a pan release during which a click on empty
/// canvas does not clear the selection.
pub const PAN_DEBOUNCE_MS: f64 = 75.0;

/// World-space distance within which a click counts as hitting an edge.
const EDGE_HIT_DISTANCE: f64 = 6.0;

/// Id reference to a selected node or edge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ElementRef {
	Node(String),
	Edge(String),
}

impl ElementRef {
	pub fn id(&self) -> &str {
		match self {
			Self::Node(id) | Self::Edge(id) => id,
		}
	}
}

/// Idle → Selected → Editing. Editing is an admin-only sub-state of
/// Selected; losing the capability drops straight back to Selected.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SelectionState {
	#[default]
	Idle,
	Selected(ElementRef),
	Editing(ElementRef),
}

/// The state machine, with the pan-release timestamp it needs to suppress
/// spurious deselects. Timestamps come in as arguments so the machine
/// stays pure and host-testable.
#[derive(Clone, Debug, Default)]
pub struct Selection {
	state: SelectionState,
	last_pan_end: Option<f64>,
}

impl Selection {
	/// Currently held element, in either Selected or Editing.
	pub fn selected(&self) -> Option<&ElementRef> {
		match &self.state {
			SelectionState::Idle => None,
			SelectionState::Selected(element) | SelectionState::Editing(element) => Some(element),
		}
	}

	/// Element under inline text-editing, if any.
	pub fn editing(&self) -> Option<&ElementRef> {
		match &self.state {
			SelectionState::Editing(element) => Some(element),
			_ => None,
		}
	}

	/// Click on a node or edge. Always lands in Selected, also when it
	/// interrupts editing of another element.
	pub fn select(&mut self, element: ElementRef) {
		self.state = SelectionState::Selected(element);
	}

	/// Record the end of a pan gesture.
	pub fn note_pan_end(&mut self, now_ms: f64) {
		self.last_pan_end = Some(now_ms);
	}

	/// Click on empty canvas: back to Idle, unless a pan gesture just
	/// ended within the debounce window.
	pub fn canvas_click(&mut self, now_ms: f64) {
		if let Some(pan_end) = self.last_pan_end {
			if now_ms - pan_end < PAN_DEBOUNCE_MS {
				return;
			}
		}
		self.state = SelectionState::Idle;
	}

	/// A graph element was deleted; drop the selection if it was held.
	pub fn element_deleted(&mut self, id: &str) {
		if self.selected().is_some_and(|element| element.id() == id) {
			self.state = SelectionState::Idle;
		}
	}

	/// Enter inline text-editing. Requires a held element and the admin
	/// capability; returns whether the transition happened.
	pub fn begin_edit(&mut self, admin: bool) -> bool {
		if !admin {
			return false;
		}
		if let SelectionState::Selected(element) = &self.state {
			self.state = SelectionState::Editing(element.clone());
			return true;
		}
		false
	}

	/// Leave inline text-editing, keeping the element selected.
	pub fn end_edit(&mut self) {
		if let SelectionState::Editing(element) = &self.state {
			self.state = SelectionState::Selected(element.clone());
		}
	}

	/// Capability change. Revoking admin while editing forces an
	/// immediate exit back to Selected.
	pub fn set_admin(&mut self, admin: bool) {
		if !admin {
			self.end_edit();
		}
	}
}

/// View transform from graph space to screen space.
#[derive(Clone, Debug)]
pub struct ViewTransform {
	pub x: f64,
	pub y: f64,
	pub k: f64,
}

impl Default for ViewTransform {
	fn default() -> Self {
		Self { x: 0.0, y: 0.0, k: 1.0 }
	}
}

/// An in-flight node drag.
#[derive(Clone, Debug, Default)]
pub struct DragState {
	pub active: bool,
	pub node_id: Option<String>,
	pub start_x: f64,
	pub start_y: f64,
	pub node_start_x: f64,
	pub node_start_y: f64,
	pub moved: bool,
}

/// An in-flight canvas pan.
#[derive(Clone, Debug, Default)]
pub struct PanState {
	pub active: bool,
	pub start_x: f64,
	pub start_y: f64,
	pub transform_start_x: f64,
	pub transform_start_y: f64,
	pub moved: bool,
}

/// Everything the canvas component keeps between browser events.
#[derive(Clone, Debug, Default)]
pub struct MindmapState {
	pub graph: MindmapGraph,
	pub transform: ViewTransform,
	pub drag: DragState,
	pub pan: PanState,
	pub selection: Selection,
	/// Source node of a connect gesture waiting for its target.
	pub pending_connect: Option<String>,
	pub width: f64,
	pub height: f64,
	pub flow_time: f64,
}

impl MindmapState {
	pub fn new(width: f64, height: f64) -> Self {
		Self { width, height, ..Self::default() }
	}

	pub fn screen_to_graph(&self, sx: f64, sy: f64) -> (f64, f64) {
		(
			(sx - self.transform.x) / self.transform.k,
			(sy - self.transform.y) / self.transform.k,
		)
	}

	/// Nodes in draw order: explicit z-index ascending, groups defaulting
	/// behind plain nodes, insertion order as the tiebreak.
	pub fn draw_order(&self) -> Vec<&Node> {
		let mut nodes: Vec<&Node> = self.graph.nodes.iter().collect();
		nodes.sort_by_key(|n| {
			n.style.z_index.unwrap_or(match n.kind {
				NodeKind::Group => -1,
				NodeKind::Default => 0,
			})
		});
		nodes
	}

	/// Topmost node under a screen position.
	pub fn node_at_position(&self, sx: f64, sy: f64) -> Option<&Node> {
		let (gx, gy) = self.screen_to_graph(sx, sy);
		self.draw_order()
			.into_iter()
			.rev()
			.find(|node| geometry::node_bounds(&self.graph, node).contains(gx, gy))
	}

	/// Topmost element under a screen position: nodes first, then edges
	/// by distance to their rendered segment.
	pub fn element_at_position(&self, sx: f64, sy: f64) -> Option<ElementRef> {
		if let Some(node) = self.node_at_position(sx, sy) {
			return Some(ElementRef::Node(node.id.clone()));
		}
		let (gx, gy) = self.screen_to_graph(sx, sy);
		// EDGE_HIT_DISTANCE is in world-space, scales with zoom like edges
		self.graph
			.edges
			.iter()
			.find(|edge| {
				handles::edge_anchors(&self.graph, edge)
					.is_some_and(|(a, b)| geometry::segment_distance(gx, gy, a, b) < EDGE_HIT_DISTANCE)
			})
			.map(|edge| ElementRef::Edge(edge.id.clone()))
	}

	pub fn tick(&mut self, dt: f64) {
		self.flow_time += dt;
	}

	pub fn resize(&mut self, width: f64, height: f64) {
		self.width = width;
		self.height = height;
	}
}

#[cfg(test)]
mod tests {
	use super::super::types::{Node, NodeKind, Position};
	use super::*;

	fn selected_node() -> Selection {
		let mut selection = Selection::default();
		selection.select(ElementRef::Node("n-1".into()));
		selection
	}

	#[test]
	fn select_then_canvas_click_returns_to_idle() {
		let mut selection = selected_node();
		assert_eq!(selection.selected().map(ElementRef::id), Some("n-1"));
		selection.canvas_click(1_000.0);
		assert!(selection.selected().is_none());
	}

	#[test]
	fn canvas_click_within_pan_debounce_keeps_selection() {
		let mut selection = selected_node();
		selection.note_pan_end(1_000.0);
		selection.canvas_click(1_040.0);
		assert_eq!(selection.selected().map(ElementRef::id), Some("n-1"));
		// outside the window the click clears as usual
		selection.canvas_click(1_000.0 + PAN_DEBOUNCE_MS);
		assert!(selection.selected().is_none());
	}

	#[test]
	fn editing_requires_admin_and_a_selection() {
		let mut selection = Selection::default();
		assert!(!selection.begin_edit(true));

		let mut selection = selected_node();
		assert!(!selection.begin_edit(false));
		assert!(selection.begin_edit(true));
		assert!(selection.editing().is_some());
	}

	#[test]
	fn revoking_admin_forces_exit_from_editing() {
		let mut selection = selected_node();
		selection.begin_edit(true);
		selection.set_admin(false);
		assert_eq!(selection.editing(), None);
		assert_eq!(selection.selected(), Some(&ElementRef::Node("n-1".into())));
	}

	#[test]
	fn deleting_the_held_element_clears_selection() {
		let mut selection = selected_node();
		selection.element_deleted("other");
		assert!(selection.selected().is_some());
		selection.element_deleted("n-1");
		assert!(selection.selected().is_none());
	}

	#[test]
	fn selecting_another_element_interrupts_editing() {
		let mut selection = selected_node();
		selection.begin_edit(true);
		selection.select(ElementRef::Edge("e-a-b".into()));
		assert_eq!(selection.editing(), None);
		assert_eq!(selection.selected().map(ElementRef::id), Some("e-a-b"));
	}

	#[test]
	fn hit_test_prefers_topmost_plain_node_over_group() {
		let mut state = MindmapState::new(800.0, 600.0);
		let mut group = Node::new("g-1", NodeKind::Group, Position::new(0.0, 0.0));
		group.style.width = Some(300.0);
		group.style.height = Some(200.0);
		state.graph.nodes.push(group);
		let mut child = Node::new("n-1", NodeKind::Default, Position::new(20.0, 50.0));
		child.parent = Some("g-1".into());
		state.graph.nodes.push(child);

		let hit = state.node_at_position(30.0, 60.0).unwrap();
		assert_eq!(hit.id, "n-1");
		let hit = state.node_at_position(280.0, 190.0).unwrap();
		assert_eq!(hit.id, "g-1");
		assert!(state.node_at_position(600.0, 400.0).is_none());
	}

	#[test]
	fn hit_test_respects_view_transform() {
		let mut state = MindmapState::new(800.0, 600.0);
		state
			.graph
			.nodes
			.push(Node::new("n-1", NodeKind::Default, Position::new(0.0, 0.0)));
		state.transform = ViewTransform { x: 400.0, y: 300.0, k: 2.0 };
		// node occupies graph (0..150, 0..36) → screen (400..700, 300..372)
		assert!(state.node_at_position(500.0, 330.0).is_some());
		assert!(state.node_at_position(300.0, 330.0).is_none());
	}

	#[test]
	fn edges_are_hit_after_nodes() {
		let mut state = MindmapState::new(800.0, 600.0);
		state
			.graph
			.nodes
			.push(Node::new("a", NodeKind::Default, Position::new(0.0, 0.0)));
		state
			.graph
			.nodes
			.push(Node::new("b", NodeKind::Default, Position::new(300.0, 0.0)));
		state.graph.connect("a", "b");
		// midway between the two boxes, on the connector
		let hit = state.element_at_position(225.0, 18.0).unwrap();
		assert_eq!(hit, ElementRef::Edge("e-a-b".into()));
		// far from the segment
		assert!(state.element_at_position(225.0, 200.0).is_none());
	}
}
