//! Flat, id-indexed store for nodes and edges, and every mutation the
//! canvas performs on them.
//!
//! Containment is a back-reference (`Node::parent`) into this flat store,
//! never nested child objects, so the structure stays cycle-free by
//! construction and serializes trivially.

use super::geometry::{self, GROUP_DEFAULT_HEIGHT, GROUP_DEFAULT_WIDTH, GROUP_PAD, GROUP_PAD_TOP};
use super::types::{Edge, Node, NodeKind, NodeStyle, Position};

/// Patch for [`NodeData`]; `None` fields are left untouched.
#[derive(Clone, Debug, Default)]
pub struct NodeDataPatch {
	pub label: Option<String>,
	pub description: Option<String>,
	pub border_color: Option<String>,
	pub background_color: Option<String>,
	pub label_color: Option<String>,
}

/// Patch for an [`Edge`]; `None` fields are left untouched.
#[derive(Clone, Debug, Default)]
pub struct EdgePatch {
	pub label: Option<String>,
	pub animated: Option<bool>,
}

/// The node/edge collections. Owns every graph entity; everything outside
/// refers to entities by id only.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MindmapGraph {
	pub nodes: Vec<Node>,
	pub edges: Vec<Edge>,
}

impl MindmapGraph {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn node(&self, id: &str) -> Option<&Node> {
		self.nodes.iter().find(|n| n.id == id)
	}

	pub fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
		self.nodes.iter_mut().find(|n| n.id == id)
	}

	pub fn edge(&self, id: &str) -> Option<&Edge> {
		self.edges.iter().find(|e| e.id == id)
	}

	/// Next unused id for a prefix: one past the highest numeric suffix
	/// already present, so loaded graphs never collide with fresh inserts.
	fn fresh_id(&self, prefix: &str) -> String {
		let next = self
			.nodes
			.iter()
			.filter_map(|n| {
				n.id
					.strip_prefix(prefix)
					.and_then(|rest| rest.strip_prefix('-'))
					.and_then(|suffix| suffix.parse::<u64>().ok())
			})
			.max()
			.map_or(1, |highest| highest + 1);
		format!("{prefix}-{next}")
	}

	/// Stagger consecutive inserts diagonally so they do not stack.
	fn spawn_position(&self, base: f64) -> Position {
		let offset = (self.nodes.len() % 8) as f64 * 24.0;
		Position::new(base + offset, base + offset)
	}

	/// Insert a fresh plain node and return its id.
	pub fn add_node(&mut self) -> String {
		let id = self.fresh_id("n");
		let mut node = Node::new(&id, NodeKind::Default, self.spawn_position(80.0));
		node.data.label = "New node".into();
		self.nodes.push(node);
		id
	}

	/// Insert a fresh group with an explicit default-size style box and
	/// return its id.
	pub fn add_group(&mut self) -> String {
		let id = self.fresh_id("g");
		let mut node = Node::new(&id, NodeKind::Group, self.spawn_position(60.0));
		node.data.label = "New group".into();
		node.style = NodeStyle {
			width: Some(GROUP_DEFAULT_WIDTH),
			height: Some(GROUP_DEFAULT_HEIGHT),
			z_index: None,
		};
		self.nodes.push(node);
		id
	}

	/// Shallow-merge a patch into a node's data. Unknown id: no-op.
	pub fn update_node_data(&mut self, id: &str, patch: NodeDataPatch) {
		let Some(node) = self.node_mut(id) else {
			return;
		};
		let NodeDataPatch { label, description, border_color, background_color, label_color } = patch;
		if let Some(label) = label {
			node.data.label = label;
		}
		if let Some(description) = description {
			node.data.description = description;
		}
		if let Some(border_color) = border_color {
			node.data.border_color = border_color;
		}
		if let Some(background_color) = background_color {
			node.data.background_color = background_color;
		}
		if let Some(label_color) = label_color {
			node.data.label_color = label_color;
		}
	}

	/// Shallow-merge a patch into an edge. Unknown id: no-op.
	pub fn update_edge(&mut self, id: &str, patch: EdgePatch) {
		let Some(edge) = self.edges.iter_mut().find(|e| e.id == id) else {
			return;
		};
		if let Some(label) = patch.label {
			edge.label = label;
		}
		if let Some(animated) = patch.animated {
			edge.animated = animated;
		}
	}

	/// Create the edge `e-<source>-<target>`. No-op when either endpoint
	/// is missing, when the pair is already connected, or for self-edges.
	/// Callers gate this behind the edit capability.
	pub fn connect(&mut self, source: &str, target: &str) {
		if source == target || self.node(source).is_none() || self.node(target).is_none() {
			return;
		}
		let id = format!("e-{source}-{target}");
		if self.edge(&id).is_some() {
			return;
		}
		self.edges.push(Edge::new(id, source, target));
	}

	/// True when `ancestor` appears anywhere on `id`'s parent chain.
	fn is_ancestor(&self, ancestor: &str, id: &str) -> bool {
		let mut current = self.node(id).and_then(|n| n.parent.clone());
		while let Some(parent_id) = current {
			if parent_id == ancestor {
				return true;
			}
			current = self.node(&parent_id).and_then(|n| n.parent.clone());
		}
		false
	}

	/// Put a node into a group: its absolute position becomes group-local
	/// and is clamped into the padding-adjusted interior. Refused when the
	/// target is not a group or when the assignment would close a
	/// containment cycle.
	pub fn assign_to_group(&mut self, node_id: &str, group_id: &str) {
		if node_id == group_id || self.is_ancestor(node_id, group_id) {
			return;
		}
		let Some(group) = self.node(group_id) else {
			return;
		};
		if group.kind != NodeKind::Group {
			return;
		}
		let Some(node) = self.node(node_id) else {
			return;
		};
		let node_bounds = geometry::node_bounds(self, node);
		let group_bounds = geometry::node_bounds(self, group);
		let local_x = node_bounds.x - group_bounds.x;
		let local_y = node_bounds.y - group_bounds.y;
		let x = local_x
			.min(group_bounds.width - node_bounds.width - GROUP_PAD)
			.max(GROUP_PAD);
		let y = local_y
			.min(group_bounds.height - node_bounds.height - GROUP_PAD)
			.max(GROUP_PAD_TOP);
		if let Some(node) = self.node_mut(node_id) {
			node.position = Position::new(x, y);
			node.parent = Some(group_id.to_string());
		}
	}

	/// Inverse of [`assign_to_group`]: absolute position recovered from
	/// the parent's resolved origin, back-reference cleared.
	pub fn remove_from_group(&mut self, node_id: &str) {
		let Some(node) = self.node(node_id) else {
			return;
		};
		let Some(parent_id) = node.parent.clone() else {
			return;
		};
		let origin = match self.node(&parent_id) {
			Some(parent) => geometry::node_bounds(self, parent),
			None => geometry::Bounds::default(),
		};
		if let Some(node) = self.node_mut(node_id) {
			node.position.x += origin.x;
			node.position.y += origin.y;
			node.parent = None;
		}
	}

	/// Delete a node (cascading to every incident edge; a deleted group's
	/// children are reparented to the canvas root at their recovered
	/// absolute positions) or, for an edge id, just that edge.
	pub fn delete_element(&mut self, id: &str) {
		let Some(index) = self.nodes.iter().position(|n| n.id == id) else {
			self.edges.retain(|e| e.id != id);
			return;
		};
		let node = self.nodes.remove(index);
		let origin = geometry::node_bounds(self, &node);
		for child in self.nodes.iter_mut() {
			if child.parent.as_deref() == Some(id) {
				child.position.x += origin.x;
				child.position.y += origin.y;
				child.parent = None;
			}
		}
		self.edges.retain(|e| e.source != id && e.target != id);
	}
}
