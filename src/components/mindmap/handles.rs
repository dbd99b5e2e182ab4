//! Deterministic connection-handle selection.
//!
//! Handles are view-derived: recomputed from node geometry on every draw
//! pass and never persisted. Plain nodes expose an 8-point compass, groups
//! a 16-point perimeter (4 sub-handles per edge).

use super::geometry::{self, Bounds};
use super::graph::MindmapGraph;
use super::types::{Edge, NodeKind};

/// Suffix distinguishing the receiving node's handle id set from the
/// sending node's, so the two sides never collide.
const TARGET_SUFFIX: &str = "-target";

/// Pick the best anchor handle on `bounds` for a connector heading toward
/// `target`. Pure: identical inputs always yield the identical id.
pub fn best_handle(bounds: &Bounds, kind: NodeKind, target: &Bounds, is_source: bool) -> String {
	let angle = (target.center_y() - bounds.center_y())
		.atan2(target.center_x() - bounds.center_x())
		.to_degrees();
	let base = match kind {
		NodeKind::Group => group_handle(bounds, target, angle),
		NodeKind::Default => compass_handle(angle).to_string(),
	};
	if is_source { base } else { format!("{base}{TARGET_SUFFIX}") }
}

/// 8-point compass sector for plain nodes. Sectors are lower-inclusive,
/// upper-exclusive: due east (0°) is `right`, exactly 45° below-east is
/// `bottom-right`.
fn compass_handle(angle: f64) -> &'static str {
	if (-22.5..22.5).contains(&angle) {
		"right"
	} else if (22.5..67.5).contains(&angle) {
		"bottom-right"
	} else if (67.5..112.5).contains(&angle) {
		"bottom"
	} else if (112.5..157.5).contains(&angle) {
		"bottom-left"
	} else if (-67.5..-22.5).contains(&angle) {
		"top-right"
	} else if (-112.5..-67.5).contains(&angle) {
		"top"
	} else if (-157.5..-112.5).contains(&angle) {
		"top-left"
	} else {
		"left"
	}
}

/// 16-point perimeter handle for groups: pick an edge from the approach
/// angle, then bucket the target's relative position along that edge into
/// four sub-handles.
fn group_handle(bounds: &Bounds, target: &Bounds, angle: f64) -> String {
	let (edge, fraction) = if angle.abs() <= 45.0 {
		("r", edge_fraction(target.center_y(), bounds.y, bounds.height))
	} else if angle.abs() >= 135.0 {
		("l", edge_fraction(target.center_y(), bounds.y, bounds.height))
	} else if angle > 0.0 {
		("b", edge_fraction(target.center_x(), bounds.x, bounds.width))
	} else {
		("t", edge_fraction(target.center_x(), bounds.x, bounds.width))
	};
	format!("{edge}-{}", bucket(fraction))
}

fn edge_fraction(center: f64, start: f64, extent: f64) -> f64 {
	if extent <= 0.0 {
		return 0.0;
	}
	((center - start) / extent).clamp(0.0, 1.0)
}

fn bucket(fraction: f64) -> u8 {
	if fraction < 0.25 {
		1
	} else if fraction < 0.5 {
		2
	} else if fraction < 0.75 {
		3
	} else {
		4
	}
}

/// Boundary coordinates for a handle id produced by [`best_handle`].
/// Compass handles anchor at side midpoints and corners; group sub-handles
/// at the bucket midpoints (1/8, 3/8, 5/8, 7/8 along the edge). Unknown
/// ids fall back to the box center.
pub fn handle_point(bounds: &Bounds, handle: &str) -> (f64, f64) {
	let handle = handle.strip_suffix(TARGET_SUFFIX).unwrap_or(handle);
	let Bounds { x, y, width, height } = *bounds;
	match handle {
		"right" => (x + width, y + height / 2.0),
		"bottom-right" => (x + width, y + height),
		"bottom" => (x + width / 2.0, y + height),
		"bottom-left" => (x, y + height),
		"left" => (x, y + height / 2.0),
		"top-left" => (x, y),
		"top" => (x + width / 2.0, y),
		"top-right" => (x + width, y),
		_ => group_point(bounds, handle),
	}
}

fn group_point(bounds: &Bounds, handle: &str) -> (f64, f64) {
	let center = (bounds.center_x(), bounds.center_y());
	let Some((edge, slot)) = handle.split_once('-') else {
		return center;
	};
	let offset = match slot {
		"1" => 1.0 / 8.0,
		"2" => 3.0 / 8.0,
		"3" => 5.0 / 8.0,
		"4" => 7.0 / 8.0,
		_ => return center,
	};
	let Bounds { x, y, width, height } = *bounds;
	match edge {
		"r" => (x + width, y + height * offset),
		"l" => (x, y + height * offset),
		"b" => (x + width * offset, y + height),
		"t" => (x + width * offset, y),
		_ => center,
	}
}

/// Resolved endpoint coordinates for one edge: handle selection on both
/// sides mapped back onto the two boundaries. `None` when either endpoint
/// node is gone (the store prevents this; belt and braces for render).
pub fn edge_anchors(graph: &MindmapGraph, edge: &Edge) -> Option<((f64, f64), (f64, f64))> {
	let source = graph.node(&edge.source)?;
	let target = graph.node(&edge.target)?;
	let source_bounds = geometry::node_bounds(graph, source);
	let target_bounds = geometry::node_bounds(graph, target);
	let source_handle = best_handle(&source_bounds, source.kind, &target_bounds, true);
	let target_handle = best_handle(&target_bounds, target.kind, &source_bounds, false);
	Some((
		handle_point(&source_bounds, &source_handle),
		handle_point(&target_bounds, &target_handle),
	))
}

#[cfg(test)]
mod tests {
	use super::super::types::{Node, NodeKind, Position};
	use super::*;

	fn bounds(x: f64, y: f64, width: f64, height: f64) -> Bounds {
		Bounds { x, y, width, height }
	}

	fn plain_at(x: f64, y: f64) -> Bounds {
		bounds(x, y, 150.0, 36.0)
	}

	#[test]
	fn due_east_selects_right() {
		let a = plain_at(0.0, 0.0);
		let b = plain_at(100.0, 0.0);
		assert_eq!(best_handle(&a, NodeKind::Default, &b, true), "right");
	}

	#[test]
	fn forty_five_below_east_selects_bottom_right() {
		let a = plain_at(0.0, 0.0);
		// target center exactly 45° below-east of a's center
		let b = bounds(a.center_x() + 80.0 - 75.0, a.center_y() + 80.0 - 18.0, 150.0, 36.0);
		assert_eq!(best_handle(&a, NodeKind::Default, &b, true), "bottom-right");
	}

	#[test]
	fn target_side_gets_suffix() {
		let a = plain_at(0.0, 0.0);
		let b = plain_at(100.0, 0.0);
		assert_eq!(best_handle(&b, NodeKind::Default, &a, false), "left-target");
	}

	#[test]
	fn compass_covers_all_eight_sectors() {
		let a = plain_at(0.0, 0.0);
		let cases = [
			(200.0, 0.0, "right"),
			(200.0, 200.0, "bottom-right"),
			(0.0, 200.0, "bottom"),
			(-200.0, 200.0, "bottom-left"),
			(-200.0, 0.0, "left"),
			(-200.0, -200.0, "top-left"),
			(0.0, -200.0, "top"),
			(200.0, -200.0, "top-right"),
		];
		for (dx, dy, expected) in cases {
			let b = bounds(a.x + dx, a.y + dy, 150.0, 36.0);
			assert_eq!(best_handle(&a, NodeKind::Default, &b, true), expected, "({dx}, {dy})");
		}
	}

	#[test]
	fn handle_selection_is_deterministic() {
		let a = plain_at(0.0, 0.0);
		let b = plain_at(63.0, -41.0);
		let first = best_handle(&a, NodeKind::Default, &b, true);
		for _ in 0..8 {
			assert_eq!(best_handle(&a, NodeKind::Default, &b, true), first);
		}
	}

	#[test]
	fn group_right_edge_buckets_by_target_height() {
		let group = bounds(0.0, 0.0, 300.0, 200.0);
		// due east, target centered on the top quarter of the right edge
		let high = bounds(400.0, 30.0 - 18.0, 150.0, 36.0);
		assert_eq!(best_handle(&group, NodeKind::Group, &high, true), "r-1");
		let low = bounds(400.0, 180.0 - 18.0, 150.0, 36.0);
		assert_eq!(best_handle(&group, NodeKind::Group, &low, true), "r-4");
	}

	#[test]
	fn group_perimeter_edges_by_angle() {
		let group = bounds(0.0, 0.0, 300.0, 200.0);
		let east = bounds(500.0, 82.0, 150.0, 36.0);
		assert!(best_handle(&group, NodeKind::Group, &east, true).starts_with("r-"));
		let west = bounds(-500.0, 82.0, 150.0, 36.0);
		assert!(best_handle(&group, NodeKind::Group, &west, true).starts_with("l-"));
		let south = bounds(75.0, 800.0, 150.0, 36.0);
		assert!(best_handle(&group, NodeKind::Group, &south, true).starts_with("b-"));
		let north = bounds(75.0, -800.0, 150.0, 36.0);
		assert!(best_handle(&group, NodeKind::Group, &north, true).starts_with("t-"));
	}

	#[test]
	fn handle_points_sit_on_the_boundary() {
		let b = bounds(10.0, 20.0, 150.0, 36.0);
		assert_eq!(handle_point(&b, "right"), (160.0, 38.0));
		assert_eq!(handle_point(&b, "left-target"), (10.0, 38.0));
		assert_eq!(handle_point(&b, "bottom"), (85.0, 56.0));
		let group = bounds(0.0, 0.0, 300.0, 200.0);
		assert_eq!(handle_point(&group, "r-2"), (300.0, 75.0));
		assert_eq!(handle_point(&group, "t-4-target"), (262.5, 0.0));
	}

	#[test]
	fn east_connection_scenario_yields_right_and_left_target() {
		let mut graph = MindmapGraph::default();
		graph.nodes = vec![
			Node::new("a", NodeKind::Default, Position::new(0.0, 0.0)),
			Node::new("b", NodeKind::Default, Position::new(100.0, 0.0)),
		];
		graph.connect("a", "b");
		let edge = graph.edges.first().expect("edge created");

		let a = graph.node("a").unwrap();
		let b = graph.node("b").unwrap();
		let ab = geometry::node_bounds(&graph, a);
		let bb = geometry::node_bounds(&graph, b);
		assert_eq!(best_handle(&ab, a.kind, &bb, true), "right");
		assert_eq!(best_handle(&bb, b.kind, &ab, false), "left-target");

		let (start, end) = edge_anchors(&graph, edge).unwrap();
		assert_eq!(start, (150.0, 18.0));
		assert_eq!(end, (100.0, 18.0));
	}
}
