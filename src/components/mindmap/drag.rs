//! Containment constraints applied to position-change events during an
//! active drag.

use super::geometry::{self, GROUP_PAD, GROUP_PAD_TOP};
use super::graph::MindmapGraph;
use super::types::{NodeKind, Position};

/// Apply one position-change event. For a node inside a group: first grow
/// the group's style box to just fit the node's kind-default footprint
/// (growth only; a drag gesture never shrinks the parent), then clamp the
/// node into the padded interior. The clamp is unconditional: a parented
/// node is never left outside its parent.
pub fn apply_drag(graph: &mut MindmapGraph, id: &str, new_pos: Position) {
	let Some(node) = graph.node(id) else {
		return;
	};
	if !node.draggable {
		return;
	}
	let kind = node.kind;
	let parent_id = node.parent.clone();

	let group_parent = parent_id.filter(|pid| {
		graph.node(pid).is_some_and(|p| p.kind == NodeKind::Group)
	});
	let Some(parent_id) = group_parent else {
		if let Some(node) = graph.node_mut(id) {
			node.position = new_pos;
		}
		return;
	};

	// footprint during drag is the kind default, not the measured width
	let (node_width, node_height) = geometry::default_size(kind);
	let needed_width = new_pos.x + node_width + GROUP_PAD;
	let needed_height = new_pos.y + node_height + GROUP_PAD;

	let Some(parent) = graph.node_mut(&parent_id) else {
		return;
	};
	let (current_width, current_height) = geometry::node_size(parent);
	let parent_width = current_width.max(needed_width);
	let parent_height = current_height.max(needed_height);
	parent.style.width = Some(parent_width);
	parent.style.height = Some(parent_height);

	let x = new_pos.x.min(parent_width - node_width - GROUP_PAD).max(GROUP_PAD);
	let y = new_pos.y.min(parent_height - node_height - GROUP_PAD).max(GROUP_PAD_TOP);
	if let Some(node) = graph.node_mut(id) {
		node.position = Position::new(x, y);
	}
}

#[cfg(test)]
mod tests {
	use super::super::types::Node;
	use super::*;

	fn graph_with_child() -> MindmapGraph {
		let mut graph = MindmapGraph::new();
		let mut group = Node::new("g-1", NodeKind::Group, Position::new(0.0, 0.0));
		group.style.width = Some(300.0);
		group.style.height = Some(200.0);
		graph.nodes.push(group);
		let mut child = Node::new("n-1", NodeKind::Default, Position::new(50.0, 60.0));
		child.parent = Some("g-1".into());
		graph.nodes.push(child);
		graph
	}

	fn group_size(graph: &MindmapGraph) -> (f64, f64) {
		let group = graph.node("g-1").unwrap();
		(group.style.width.unwrap(), group.style.height.unwrap())
	}

	#[test]
	fn free_node_moves_unconstrained() {
		let mut graph = MindmapGraph::new();
		graph
			.nodes
			.push(Node::new("n-1", NodeKind::Default, Position::default()));
		apply_drag(&mut graph, "n-1", Position::new(-500.0, 700.0));
		assert_eq!(graph.node("n-1").unwrap().position, Position::new(-500.0, 700.0));
	}

	#[test]
	fn undraggable_node_stays_put() {
		let mut graph = graph_with_child();
		graph.node_mut("n-1").unwrap().draggable = false;
		apply_drag(&mut graph, "n-1", Position::new(90.0, 90.0));
		assert_eq!(graph.node("n-1").unwrap().position, Position::new(50.0, 60.0));
	}

	#[test]
	fn child_is_clamped_into_padded_interior() {
		let mut graph = graph_with_child();
		apply_drag(&mut graph, "n-1", Position::new(-40.0, 1.0));
		let pos = graph.node("n-1").unwrap().position;
		assert_eq!(pos, Position::new(GROUP_PAD, GROUP_PAD_TOP));
		// dragging left/up never grew the group
		assert_eq!(group_size(&graph), (300.0, 200.0));
	}

	#[test]
	fn group_grows_to_fit_child_dragged_past_its_edge() {
		let mut graph = graph_with_child();
		apply_drag(&mut graph, "n-1", Position::new(250.0, 180.0));
		// 250 + 150 + 10 wide, 180 + 36 + 10 tall
		assert_eq!(group_size(&graph), (410.0, 226.0));
		// after growth the requested position fits as-is
		assert_eq!(graph.node("n-1").unwrap().position, Position::new(250.0, 180.0));
	}

	#[test]
	fn group_growth_is_monotonic_across_a_gesture() {
		let mut graph = graph_with_child();
		let drags = [
			Position::new(300.0, 50.0),
			Position::new(120.0, 50.0),
			Position::new(340.0, 260.0),
			Position::new(20.0, 45.0),
		];
		let mut previous = group_size(&graph);
		for pos in drags {
			apply_drag(&mut graph, "n-1", pos);
			let current = group_size(&graph);
			assert!(current.0 >= previous.0 && current.1 >= previous.1, "shrank at {pos:?}");
			previous = current;
		}
	}

	#[test]
	fn containment_invariant_holds_after_any_sequence() {
		let mut graph = graph_with_child();
		let drags = [
			Position::new(-100.0, -100.0),
			Position::new(500.0, 10.0),
			Position::new(3.0, 900.0),
			Position::new(250.0, 250.0),
		];
		for pos in drags {
			apply_drag(&mut graph, "n-1", pos);
			let node = graph.node("n-1").unwrap().position;
			let (width, height) = group_size(&graph);
			assert!(node.x >= GROUP_PAD && node.x <= width - 150.0 - GROUP_PAD);
			assert!(node.y >= GROUP_PAD_TOP && node.y <= height - 36.0 - GROUP_PAD);
		}
	}
}
