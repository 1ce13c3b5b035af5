// SPDX-License-Identifier: MIT OR Apache-2.0
//! Plain serialization document for a graph.
//!
//! Node instance state is flattened into each node record, next to the fixed
//! fields. Older documents naming the type `nodeTypeId` and the edge list
//! `connections` are accepted on load.

use crate::edge::EdgeId;
use crate::error::GraphError;
use crate::graph::{Graph, NodeSpec};
use crate::node::{Node, NodeId, NodeState, DEFAULT_NODE_WIDTH};
use crate::socket::{SocketId, SocketRef, SocketSpec};
use egui::{Pos2, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Record keys that instance state may not shadow
const RESERVED_KEYS: &[&str] = &[
    "id",
    "title",
    "x",
    "y",
    "width",
    "height",
    "typeId",
    "nodeTypeId",
    "inputs",
    "outputs",
];

fn record_state(node: &Node) -> NodeState {
    let mut state = NodeState::new();
    for (key, value) in node.state.iter() {
        if RESERVED_KEYS.contains(&key.as_str()) {
            tracing::warn!("Node {} state key '{}' clashes with a record field, not saved", node.id, key);
            continue;
        }
        state.set(key.clone(), value.clone());
    }
    state
}

fn default_width() -> f32 {
    DEFAULT_NODE_WIDTH
}

/// Serialized node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    /// Node ID
    pub id: NodeId,
    /// Title
    #[serde(default)]
    pub title: String,
    /// Left edge in graph space
    #[serde(default)]
    pub x: f32,
    /// Top edge in graph space
    #[serde(default)]
    pub y: f32,
    /// Width
    #[serde(default = "default_width")]
    pub width: f32,
    /// Height; zero means "use the natural height"
    #[serde(default)]
    pub height: f32,
    /// Node type ID, absent for generic nodes
    #[serde(
        rename = "typeId",
        alias = "nodeTypeId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub type_id: Option<String>,
    /// Input sockets; absent means the type's defaults
    #[serde(default)]
    pub inputs: Option<Vec<SocketSpec>>,
    /// Output sockets; absent means the type's defaults
    #[serde(default)]
    pub outputs: Option<Vec<SocketSpec>>,
    /// Type-specific fields
    #[serde(flatten)]
    pub state: NodeState,
}

impl NodeRecord {
    /// Snapshot a node
    pub fn from_node(node: &Node) -> Self {
        Self {
            id: node.id.clone(),
            title: node.title.clone(),
            x: node.position.x,
            y: node.position.y,
            width: node.size.x,
            height: node.size.y,
            type_id: node.type_id.clone(),
            inputs: Some(node.inputs.iter().map(|s| s.spec()).collect()),
            outputs: Some(node.outputs.iter().map(|s| s.spec()).collect()),
            state: record_state(node),
        }
    }

    /// Top-left corner
    pub fn position(&self) -> Pos2 {
        Pos2::new(self.x, self.y)
    }
}

/// Serialized edge, addressed by node and socket IDs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeRecord {
    /// Source node
    pub from_node: NodeId,
    /// Output socket on the source node
    pub from_socket: SocketId,
    /// Target node
    pub to_node: NodeId,
    /// Input socket on the target node
    pub to_socket: SocketId,
}

/// Serialized graph
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Nodes, in graph order
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,
    /// Committed edges
    #[serde(default, alias = "connections")]
    pub edges: Vec<EdgeRecord>,
}

impl Document {
    /// Render as pretty-printed JSON
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Parse from JSON
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Whether the document holds no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Outcome of loading a document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    /// Nodes created
    pub nodes: usize,
    /// Edges created
    pub edges: usize,
    /// Entities that could not be restored
    pub skipped: Vec<GraphError>,
}

/// Nodes and edges created by [`instantiate`]
#[derive(Debug, Default)]
pub(crate) struct Instantiated {
    pub nodes: Vec<NodeId>,
    pub edges: Vec<EdgeId>,
    pub skipped: Vec<GraphError>,
}

/// Add records to a graph, shifting them by `offset`.
///
/// With `fresh_ids` every node gets a new ID; edges are remapped to follow.
/// Edges that cannot be resolved or no longer type-check are skipped.
pub(crate) fn instantiate(
    graph: &mut Graph,
    nodes: &[NodeRecord],
    edges: &[EdgeRecord],
    offset: Vec2,
    fresh_ids: bool,
) -> Instantiated {
    let mut out = Instantiated::default();
    let mut id_map: HashMap<&NodeId, NodeId> = HashMap::new();

    for record in nodes {
        let spec = NodeSpec {
            id: (!fresh_ids).then(|| record.id.clone()),
            type_id: record.type_id.clone(),
            width: Some(record.width),
            height: (record.height > 0.0).then_some(record.height),
            inputs: record.inputs.clone(),
            outputs: record.outputs.clone(),
            state: record.state.clone(),
            compute: None,
        };
        let id = graph.add_node(record.title.clone(), record.position() + offset, spec);
        if id_map.contains_key(&record.id) {
            tracing::warn!("Duplicate node id {} in document, loaded as {}", record.id, id);
        } else {
            id_map.insert(&record.id, id.clone());
        }
        out.nodes.push(id);
    }

    for record in edges {
        let (Some(from_node), Some(to_node)) = (id_map.get(&record.from_node), id_map.get(&record.to_node))
        else {
            let err = GraphError::DanglingReference(format!(
                "edge {}:{} -> {}:{}",
                record.from_node, record.from_socket, record.to_node, record.to_socket
            ));
            tracing::warn!("Skipping edge: {}", err);
            out.skipped.push(err);
            continue;
        };
        let from = SocketRef::output(from_node.clone(), record.from_socket.clone());
        let to = SocketRef::input(to_node.clone(), record.to_socket.clone());
        match graph.connect(&from, &to) {
            Ok(id) => out.edges.push(id),
            Err(err) => {
                let err = match err {
                    GraphError::NodeNotFound(_) | GraphError::SocketNotFound(_) => {
                        GraphError::DanglingReference(format!("edge {from} -> {to}"))
                    }
                    other => other,
                };
                tracing::warn!("Skipping edge: {}", err);
                out.skipped.push(err);
            }
        }
    }
    out
}

impl Graph {
    /// Produce a plain document describing every node and committed edge
    pub fn serialize(&self) -> Document {
        Document {
            nodes: self.nodes().map(NodeRecord::from_node).collect(),
            edges: self
                .edges()
                .map(|e| EdgeRecord {
                    from_node: e.from.node.clone(),
                    from_socket: e.from.socket.clone(),
                    to_node: e.to.node.clone(),
                    to_socket: e.to.socket.clone(),
                })
                .collect(),
        }
    }

    /// Replace the graph's contents with a document.
    ///
    /// Nodes are created in document order before any edge. A bad edge is
    /// skipped and reported; it never fails the whole load.
    pub fn deserialize(&mut self, document: &Document) -> LoadReport {
        self.clear();
        let loaded = instantiate(self, &document.nodes, &document.edges, Vec2::ZERO, false);
        tracing::info!(
            "Loaded {} nodes and {} edges ({} skipped)",
            loaded.nodes.len(),
            loaded.edges.len(),
            loaded.skipped.len()
        );
        LoadReport {
            nodes: loaded.nodes.len(),
            edges: loaded.edges.len(),
            skipped: loaded.skipped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::socket::DataType;

    fn sample_graph() -> Graph {
        let mut graph = Graph::default();
        let a = graph.add_node(
            "Source",
            Pos2::new(10.0, 20.0),
            NodeSpec::generic()
                .with_outputs(vec![SocketSpec::new("out", "Out", DataType::Integer)])
                .with_state(NodeState::new().with("inputValue", "3").with("floatRound", false)),
        );
        let b = graph.add_node(
            "Sink",
            Pos2::new(300.0, 20.0),
            NodeSpec::generic().with_inputs(vec![SocketSpec::new("in", "In", DataType::Any)]),
        );
        graph
            .connect(&SocketRef::output(a, "out"), &SocketRef::input(b, "in"))
            .unwrap();
        graph
    }

    #[test]
    fn test_round_trip_preserves_nodes_edges_and_state() {
        let graph = sample_graph();
        let json = graph.serialize().to_json_pretty().unwrap();
        let document = Document::from_json(&json).unwrap();

        let mut restored = Graph::default();
        let report = restored.deserialize(&document);
        assert!(report.skipped.is_empty());
        assert_eq!(restored.node_count(), graph.node_count());
        assert_eq!(restored.edge_count(), graph.edge_count());
        for (a, b) in graph.nodes().zip(restored.nodes()) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.state, b.state);
            assert_eq!(a.position, b.position);
            assert_eq!(a.size, b.size);
        }
        assert_eq!(restored.serialize(), graph.serialize());
    }

    #[test]
    fn test_state_is_flattened_into_node_record() {
        let json = serde_json::to_value(sample_graph().serialize()).unwrap();
        let node = &json["nodes"][0];
        assert_eq!(node["inputValue"], "3");
        assert_eq!(node["floatRound"], false);
        assert!(node.get("typeId").is_none());
        assert_eq!(json["edges"][0]["fromSocket"], "out");
    }

    #[test]
    fn test_state_cannot_shadow_record_fields() {
        let mut graph = Graph::default();
        graph.add_node(
            "Real title",
            Pos2::new(5.0, 6.0),
            NodeSpec::generic().with_state(NodeState::new().with("title", "shadow").with("x", 99).with("keep", 1)),
        );
        let json = graph.serialize().to_json_pretty().unwrap();
        let document = Document::from_json(&json).unwrap();

        let record = &document.nodes[0];
        assert_eq!(record.title, "Real title");
        assert_eq!(record.x, 5.0);
        assert!(record.state.get("title").is_none());
        assert!(record.state.get("x").is_none());
        assert_eq!(record.state.get_i64("keep"), Some(1));
    }

    #[test]
    fn test_legacy_field_names_and_bad_edges() {
        let json = r#"{
            "nodes": [
                {"id": "a", "title": "A", "x": 0, "y": 0, "width": 180, "height": 80,
                 "nodeTypeId": "mystery",
                 "outputs": [{"id": "out", "label": "out", "dataType": "float"}]},
                {"id": "b", "title": "B", "x": 200, "y": 0, "width": 180, "height": 80,
                 "inputs": [{"id": "in", "label": "in", "dataType": "string"}]}
            ],
            "connections": [
                {"fromNode": "a", "fromSocket": "out", "toNode": "b", "toSocket": "in"},
                {"fromNode": "a", "fromSocket": "out", "toNode": "gone", "toSocket": "in"},
                {"fromNode": "a", "fromSocket": "nope", "toNode": "b", "toSocket": "in"}
            ]
        }"#;
        let document = Document::from_json(json).unwrap();
        let mut graph = Graph::default();
        let report = graph.deserialize(&document);

        assert_eq!(report.nodes, 2);
        assert_eq!(report.edges, 0);
        assert_eq!(graph.edge_count(), 0);
        assert!(matches!(report.skipped[0], GraphError::IncompatibleTypes { .. }));
        assert!(matches!(report.skipped[1], GraphError::DanglingReference(_)));
        assert!(matches!(report.skipped[2], GraphError::DanglingReference(_)));
        assert_eq!(
            graph.node(&NodeId::from("a")).unwrap().type_id.as_deref(),
            Some("mystery")
        );
    }

    #[test]
    fn test_deserialize_clears_previous_contents() {
        let mut graph = sample_graph();
        graph.add_node("Extra", Pos2::ZERO, NodeSpec::generic());
        let report = graph.deserialize(&Document::default());
        assert_eq!(report, LoadReport::default());
        assert_eq!(graph.node_count(), 0);
        assert_eq!(graph.edge_count(), 0);
    }
}
