//! Boundary normalization between the document-store JSON shape and the
//! canonical in-memory graph.
//!
//! `normalize` never trusts the input shape and never fails: missing or
//! wrong-typed fields fall back to defaults, entities that cannot be
//! repaired are dropped. `serialize` is the inverse and omits fields that
//! hold their defaults. For any graph already in normalized form,
//! `normalize(serialize(g))` is observationally equal to `g`.

use std::collections::HashSet;

use serde::Serialize;
use serde_json::{Value, json};

use super::graph::MindmapGraph;
use super::types::{Edge, Node, NodeData, NodeKind, NodeStyle, Position};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NodeDto {
	id: String,
	#[serde(rename = "type")]
	kind: &'static str,
	#[serde(skip_serializing_if = "Option::is_none")]
	parent_node: Option<String>,
	#[serde(skip_serializing_if = "is_true")]
	draggable: bool,
	#[serde(skip_serializing_if = "DataDto::is_empty")]
	data: DataDto,
	position: PositionDto,
	#[serde(skip_serializing_if = "StyleDto::is_empty")]
	style: StyleDto,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DataDto {
	#[serde(skip_serializing_if = "String::is_empty")]
	label: String,
	#[serde(skip_serializing_if = "String::is_empty")]
	description: String,
	#[serde(skip_serializing_if = "String::is_empty")]
	border_color: String,
	#[serde(skip_serializing_if = "String::is_empty")]
	background_color: String,
	#[serde(skip_serializing_if = "String::is_empty")]
	label_color: String,
}

impl DataDto {
	fn is_empty(&self) -> bool {
		self.label.is_empty()
			&& self.description.is_empty()
			&& self.border_color.is_empty()
			&& self.background_color.is_empty()
			&& self.label_color.is_empty()
	}
}

#[derive(Serialize)]
struct PositionDto {
	x: f64,
	y: f64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StyleDto {
	#[serde(skip_serializing_if = "Option::is_none")]
	width: Option<f64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	height: Option<f64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	z_index: Option<i32>,
}

impl StyleDto {
	fn is_empty(&self) -> bool {
		self.width.is_none() && self.height.is_none() && self.z_index.is_none()
	}
}

#[derive(Serialize)]
struct EdgeDto {
	id: String,
	source: String,
	target: String,
	#[serde(skip_serializing_if = "String::is_empty")]
	label: String,
	#[serde(skip_serializing_if = "is_false")]
	animated: bool,
}

fn is_true(value: &bool) -> bool {
	*value
}

fn is_false(value: &bool) -> bool {
	!*value
}

/// Serialize a graph into the document-store wire shape. Handle ids are
/// never emitted: handles are view-derived, stored values would be dead
/// data.
pub fn serialize(graph: &MindmapGraph) -> Value {
	let nodes: Vec<NodeDto> = graph
		.nodes
		.iter()
		.map(|node| NodeDto {
			id: node.id.clone(),
			kind: match node.kind {
				NodeKind::Group => "group",
				NodeKind::Default => "default",
			},
			parent_node: node.parent.clone(),
			draggable: node.draggable,
			data: DataDto {
				label: node.data.label.clone(),
				description: node.data.description.clone(),
				border_color: node.data.border_color.clone(),
				background_color: node.data.background_color.clone(),
				label_color: node.data.label_color.clone(),
			},
			position: PositionDto { x: node.position.x, y: node.position.y },
			style: StyleDto {
				width: node.style.width,
				height: node.style.height,
				z_index: node.style.z_index,
			},
		})
		.collect();
	let edges: Vec<EdgeDto> = graph
		.edges
		.iter()
		.map(|edge| EdgeDto {
			id: edge.id.clone(),
			source: edge.source.clone(),
			target: edge.target.clone(),
			label: edge.label.clone(),
			animated: edge.animated,
		})
		.collect();
	json!({ "nodes": nodes, "edges": edges })
}

fn string_field(value: Option<&Value>, key: &str) -> String {
	value
		.and_then(|v| v.get(key))
		.and_then(Value::as_str)
		.unwrap_or_default()
		.to_string()
}

fn number_field(value: Option<&Value>, key: &str) -> Option<f64> {
	value
		.and_then(|v| v.get(key))
		.and_then(Value::as_f64)
		.filter(|v| v.is_finite())
}

/// True when the node itself sits on a containment cycle. A node merely
/// hanging below a cycle is not flagged; breaking the cycle above it is
/// enough.
fn on_cycle(graph: &MindmapGraph, node: &Node) -> bool {
	let mut seen = HashSet::new();
	let mut current = node.parent.clone();
	while let Some(parent_id) = current {
		if parent_id == node.id {
			return true;
		}
		if !seen.insert(parent_id.clone()) {
			return false;
		}
		current = graph.node(&parent_id).and_then(|p| p.parent.clone());
	}
	false
}

/// Defensively reshape arbitrary external JSON into a canonical graph.
/// Entities that cannot be repaired are dropped; fields that can are
/// defaulted. Never errors on malformed input.
pub fn normalize(raw: &Value) -> MindmapGraph {
	let mut graph = MindmapGraph::new();

	if let Some(items) = raw.get("nodes").and_then(Value::as_array) {
		for item in items {
			let Some(id) = item.get("id").and_then(Value::as_str) else {
				continue;
			};
			if id.is_empty() || graph.node(id).is_some() {
				continue;
			}
			let kind = match item.get("type").and_then(Value::as_str) {
				Some("group") => NodeKind::Group,
				_ => NodeKind::Default,
			};
			let position = item.get("position");
			let x = number_field(position, "x").unwrap_or(0.0);
			let y = number_field(position, "y").unwrap_or(0.0);
			let data = item.get("data");
			let style = item.get("style");
			graph.nodes.push(Node {
				id: id.to_string(),
				kind,
				position: Position::new(x, y),
				data: NodeData {
					label: string_field(data, "label"),
					description: string_field(data, "description"),
					border_color: string_field(data, "borderColor"),
					background_color: string_field(data, "backgroundColor"),
					label_color: string_field(data, "labelColor"),
				},
				style: NodeStyle {
					width: number_field(style, "width").filter(|v| *v > 0.0),
					height: number_field(style, "height").filter(|v| *v > 0.0),
					z_index: style
						.and_then(|s| s.get("zIndex"))
						.and_then(Value::as_i64)
						.and_then(|v| i32::try_from(v).ok()),
				},
				parent: item
					.get("parentNode")
					.and_then(Value::as_str)
					.filter(|p| !p.is_empty())
					.map(str::to_string),
				draggable: item.get("draggable").and_then(Value::as_bool).unwrap_or(true),
			});
		}
	}

	// parent refs must point at an existing group that is not the node itself
	let group_ids: HashSet<String> = graph
		.nodes
		.iter()
		.filter(|n| n.kind == NodeKind::Group)
		.map(|n| n.id.clone())
		.collect();
	for node in &mut graph.nodes {
		let valid = node
			.parent
			.as_ref()
			.is_some_and(|p| *p != node.id && group_ids.contains(p));
		if !valid {
			node.parent = None;
		}
	}

	// break each containment cycle by clearing the link of its first
	// member in insertion order
	loop {
		let cyclic = graph
			.nodes
			.iter()
			.find(|node| on_cycle(&graph, node))
			.map(|node| node.id.clone());
		match cyclic {
			Some(id) => {
				if let Some(node) = graph.node_mut(&id) {
					node.parent = None;
				}
			}
			None => break,
		}
	}

	if let Some(items) = raw.get("edges").and_then(Value::as_array) {
		for item in items {
			let source = string_field(Some(item), "source");
			let target = string_field(Some(item), "target");
			if source == target || graph.node(&source).is_none() || graph.node(&target).is_none() {
				continue;
			}
			// a missing id is re-derivable; stored handle ids are not read
			let id = match item.get("id").and_then(Value::as_str) {
				Some(id) if !id.is_empty() => id.to_string(),
				_ => format!("e-{source}-{target}"),
			};
			if graph.edge(&id).is_some() {
				continue;
			}
			graph.edges.push(Edge {
				id,
				source,
				target,
				label: string_field(Some(item), "label"),
				animated: item.get("animated").and_then(Value::as_bool).unwrap_or(false),
			});
		}
	}

	graph
}

/// The hardcoded welcome graph used when both the local cache and the
/// remote store come up empty.
pub fn seed_graph() -> MindmapGraph {
	let mut graph = MindmapGraph::new();

	let mut root = Node::new("n-1", NodeKind::Default, Position::new(340.0, 60.0));
	root.data.label = "Welcome to the mindmap".into();
	root.data.description = "Click an element to select it.".into();
	graph.nodes.push(root);

	let mut group = Node::new("g-1", NodeKind::Group, Position::new(80.0, 220.0));
	group.data.label = "Ideas".into();
	group.style.width = Some(300.0);
	group.style.height = Some(200.0);
	graph.nodes.push(group);

	let mut inside = Node::new("n-2", NodeKind::Default, Position::new(40.0, 80.0));
	inside.data.label = "Drag me around".into();
	inside.parent = Some("g-1".into());
	graph.nodes.push(inside);

	let mut loose = Node::new("n-3", NodeKind::Default, Position::new(560.0, 240.0));
	loose.data.label = "Connect things".into();
	graph.nodes.push(loose);

	graph.connect("n-1", "g-1");
	graph.connect("n-1", "n-3");
	if let Some(edge) = graph.edges.iter_mut().find(|e| e.id == "e-n-1-n-3") {
		edge.animated = true;
	}
	graph
}
