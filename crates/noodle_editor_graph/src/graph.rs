// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph data structure containing nodes and edges.
//!
//! Nodes and edges live in id-indexed arenas. Sockets only hold edge ids and
//! edges only hold socket addresses, so removing either side never leaves a
//! dangling pointer behind: every mutation updates both tables together.

use crate::compat::{self, types_compatible};
use crate::edge::{Edge, EdgeId};
use crate::error::GraphError;
use crate::node::{HeightMode, Node, NodeId, NodeState, DEFAULT_NODE_WIDTH};
use crate::registry::{ComputeFn, NodeBehavior, NodeTypeDef, NodeTypeRegistry, SocketValues};
use crate::socket::{DataType, Direction, Socket, SocketRef, SocketSpec};
use crate::topology;
use egui::{Pos2, Rect};
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// Creation parameters for [`Graph::add_node`]
#[derive(Clone, Default)]
pub struct NodeSpec {
    /// Requested ID; a fresh one is generated when absent or already taken
    pub id: Option<NodeId>,
    /// Registry type; `None` creates a generic node
    pub type_id: Option<String>,
    /// Explicit width
    pub width: Option<f32>,
    /// Explicit height
    pub height: Option<f32>,
    /// Explicit input sockets, overriding the type's defaults
    pub inputs: Option<Vec<SocketSpec>>,
    /// Explicit output sockets, overriding the type's defaults
    pub outputs: Option<Vec<SocketSpec>>,
    /// Initial instance state
    pub state: NodeState,
    /// Compute binding overriding the type's
    pub compute: Option<ComputeFn>,
}

impl NodeSpec {
    /// Spec for a generic node
    pub fn generic() -> Self {
        Self::default()
    }

    /// Spec for a node of a registered type
    pub fn of_type(type_id: impl Into<String>) -> Self {
        Self {
            type_id: Some(type_id.into()),
            ..Self::default()
        }
    }

    /// Request a specific ID
    pub fn with_id(mut self, id: impl Into<NodeId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set explicit input sockets
    pub fn with_inputs(mut self, inputs: Vec<SocketSpec>) -> Self {
        self.inputs = Some(inputs);
        self
    }

    /// Set explicit output sockets
    pub fn with_outputs(mut self, outputs: Vec<SocketSpec>) -> Self {
        self.outputs = Some(outputs);
        self
    }

    /// Set an explicit size
    pub fn with_size(mut self, width: f32, height: f32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Set the initial instance state
    pub fn with_state(mut self, state: NodeState) -> Self {
        self.state = state;
        self
    }

    /// Bind a compute function
    pub fn with_compute(
        mut self,
        compute: impl Fn(&SocketValues, &Node) -> SocketValues + Send + Sync + 'static,
    ) -> Self {
        self.compute = Some(Arc::new(compute));
        self
    }
}

impl fmt::Debug for NodeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeSpec")
            .field("id", &self.id)
            .field("type_id", &self.type_id)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("state", &self.state)
            .field("compute", &self.compute.is_some())
            .finish()
    }
}

/// A node graph
#[derive(Debug, Clone)]
pub struct Graph {
    /// Nodes in insertion order
    nodes: IndexMap<NodeId, Node>,
    /// Committed edges
    edges: IndexMap<EdgeId, Edge>,
    /// Node types available to this graph
    registry: Arc<NodeTypeRegistry>,
}

impl Graph {
    /// Create an empty graph backed by a node-type registry
    pub fn new(registry: Arc<NodeTypeRegistry>) -> Self {
        Self {
            nodes: IndexMap::new(),
            edges: IndexMap::new(),
            registry,
        }
    }

    /// Node types available to this graph
    pub fn registry(&self) -> &Arc<NodeTypeRegistry> {
        &self.registry
    }

    /// Add a node; no edges are created
    pub fn add_node(&mut self, title: impl Into<String>, position: Pos2, spec: NodeSpec) -> NodeId {
        let def = spec.type_id.as_deref().and_then(|t| self.registry.get(t));
        if let (Some(type_id), None) = (&spec.type_id, def) {
            tracing::warn!("Unknown node type '{}', creating a generic node", type_id);
        }

        let inputs = spec
            .inputs
            .or_else(|| def.map(|d| d.inputs.clone()))
            .unwrap_or_else(|| vec![SocketSpec::new("in", "in", DataType::Default)]);
        let outputs = spec
            .outputs
            .or_else(|| def.map(|d| d.outputs.clone()))
            .unwrap_or_else(|| vec![SocketSpec::new("out", "out", DataType::Default)]);

        let id = match spec.id {
            Some(id) if !self.nodes.contains_key(&id) => id,
            _ => self.fresh_node_id(),
        };

        let mut node = Node::new(id.clone(), title, position, &inputs, &outputs);
        node.type_id = spec.type_id;
        node.state = spec.state;

        let mut behavior = def.map(NodeTypeDef::behavior).unwrap_or_else(NodeBehavior::generic);
        if let Some(compute) = spec.compute {
            behavior.compute = compute;
        }
        node.set_behavior(behavior);

        if let Some(def) = def {
            node.resizable_width = def.resizable_width;
            node.height_mode = def.height_mode;
        }
        let min = node.min_size();
        node.size.x = spec.width.unwrap_or(DEFAULT_NODE_WIDTH).max(min.x);
        let height = spec
            .height
            .or_else(|| def.and_then(|d| d.default_height))
            .unwrap_or(min.y);
        node.size.y = match node.height_mode {
            HeightMode::Fixed => height,
            HeightMode::Auto | HeightMode::Resizable => height.max(min.y),
        };

        tracing::info!("Added node {} ({})", id, node.title);
        self.nodes.insert(id.clone(), node);
        id
    }

    fn fresh_node_id(&self) -> NodeId {
        loop {
            let id = NodeId::new();
            if !self.nodes.contains_key(&id) {
                return id;
            }
        }
    }

    /// Remove a node and every edge touching it; no-op for unknown IDs
    pub fn remove_node(&mut self, node_id: &NodeId) -> Option<Node> {
        let node = self.nodes.get(node_id)?;
        let incident: Vec<EdgeId> = node
            .inputs
            .iter()
            .chain(node.outputs.iter())
            .flat_map(|s| s.connections().iter().copied())
            .collect();
        for edge in incident {
            self.disconnect(edge);
        }
        let removed = self.nodes.shift_remove(node_id);
        tracing::info!("Removed node {}", node_id);
        removed
    }

    /// Remove every node and edge
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
        tracing::info!("Cleared graph");
    }

    /// Get a node by ID
    pub fn node(&self, node_id: &NodeId) -> Option<&Node> {
        self.nodes.get(node_id)
    }

    /// Get a mutable node by ID
    pub fn node_mut(&mut self, node_id: &NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(node_id)
    }

    /// Get all nodes, in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub(crate) fn nodes_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        self.nodes.values_mut()
    }

    /// Get all node IDs, in insertion order
    pub fn node_ids(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes.keys()
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Whether a node is present
    pub fn contains_node(&self, node_id: &NodeId) -> bool {
        self.nodes.contains_key(node_id)
    }

    /// Get an edge by ID
    pub fn edge(&self, edge_id: EdgeId) -> Option<&Edge> {
        self.edges.get(&edge_id)
    }

    /// Get all committed edges, in creation order
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    /// Get the number of edges
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Resolve a socket address
    pub fn socket(&self, socket: &SocketRef) -> Option<&Socket> {
        self.nodes
            .get(&socket.node)?
            .socket(socket.direction, &socket.socket)
    }

    pub(crate) fn socket_mut(&mut self, socket: &SocketRef) -> Option<&mut Socket> {
        self.nodes
            .get_mut(&socket.node)?
            .socket_mut(socket.direction, &socket.socket)
    }

    fn require_socket(&self, socket: &SocketRef) -> Result<&Socket, GraphError> {
        if !self.nodes.contains_key(&socket.node) {
            return Err(GraphError::NodeNotFound(socket.node.clone()));
        }
        self.socket(socket)
            .ok_or_else(|| GraphError::SocketNotFound(socket.clone()))
    }

    /// Whether `connect(from, to)` would succeed
    pub fn can_connect(&self, from: &SocketRef, to: &SocketRef) -> bool {
        match (self.socket(from), self.socket(to)) {
            (Some(output), Some(input)) => compat::can_connect(output, input),
            _ => false,
        }
    }

    /// Connect an output socket to an input socket.
    ///
    /// Any edge already feeding the input is removed first. On error nothing
    /// is mutated.
    pub fn connect(&mut self, from: &SocketRef, to: &SocketRef) -> Result<EdgeId, GraphError> {
        if from.direction != Direction::Output || to.direction != Direction::Input {
            return Err(GraphError::WrongDirection {
                from: from.clone(),
                to: to.clone(),
            });
        }
        let from_type = self.require_socket(from)?.data_type;
        let target = self.require_socket(to)?;
        if !types_compatible(from_type, target.data_type) {
            return Err(GraphError::IncompatibleTypes {
                from: from_type,
                to: target.data_type,
            });
        }

        for previous in target.connections().to_vec() {
            self.disconnect(previous);
        }

        let edge = Edge::new(from.clone(), to.clone());
        let id = edge.id;
        if let Some(socket) = self.socket_mut(from) {
            socket.add_connection(id);
        }
        if let Some(socket) = self.socket_mut(to) {
            socket.add_connection(id);
        }
        self.edges.insert(id, edge);
        tracing::debug!("Connected {} -> {}", from, to);
        Ok(id)
    }

    /// Remove an edge from the graph and from both endpoint sockets
    pub fn disconnect(&mut self, edge_id: EdgeId) -> Option<Edge> {
        let edge = self.edges.shift_remove(&edge_id)?;
        if let Some(socket) = self.socket_mut(&edge.from) {
            socket.remove_connection(edge_id);
        }
        if let Some(socket) = self.socket_mut(&edge.to) {
            socket.remove_connection(edge_id);
        }
        tracing::debug!("Disconnected {} -> {}", edge.from, edge.to);
        Some(edge)
    }

    /// Change an output socket's data type and rewire its edges.
    ///
    /// Edges that stay compatible are kept. Any other edge moves to the first
    /// free compatible input on the same downstream node, else to the first
    /// compatible input there (displacing its edge), else it is dropped.
    pub fn set_output_type(&mut self, output: &SocketRef, data_type: DataType) -> Result<(), GraphError> {
        if output.direction != Direction::Output {
            return Err(GraphError::SocketNotFound(output.clone()));
        }
        let socket = self.require_socket(output)?;
        if socket.data_type == data_type {
            return Ok(());
        }
        let edges = socket.connections().to_vec();
        if let Some(socket) = self.socket_mut(output) {
            socket.data_type = data_type;
        }

        for edge_id in edges {
            let Some(edge) = self.edges.get(&edge_id).cloned() else {
                continue;
            };
            let still_ok = self
                .socket(&edge.to)
                .is_some_and(|s| types_compatible(data_type, s.data_type));
            if still_ok {
                continue;
            }

            self.disconnect(edge_id);
            let replacement = self.nodes.get(&edge.to.node).and_then(|node| {
                let candidates: Vec<&Socket> = node
                    .inputs
                    .iter()
                    .filter(|s| types_compatible(data_type, s.data_type))
                    .collect();
                candidates
                    .iter()
                    .find(|s| !s.is_connected())
                    .or_else(|| candidates.first())
                    .map(|s| s.id.clone())
            });

            match replacement {
                Some(socket_id) => {
                    let target = SocketRef::input(edge.to.node.clone(), socket_id);
                    match self.connect(output, &target) {
                        Ok(_) => tracing::debug!("Rewired {} -> {}", output, target),
                        Err(err) => tracing::warn!("Dropped {} -> {} after type change: {}", output, edge.to, err),
                    }
                }
                None => tracing::debug!("Dropped {} -> {} after type change", output, edge.to),
            }
        }
        Ok(())
    }

    fn node_pairs(&self) -> Vec<(NodeId, NodeId)> {
        self.edges
            .values()
            .map(|e| (e.from.node.clone(), e.to.node.clone()))
            .collect()
    }

    /// Nodes in dependency order, or `None` when the graph has a cycle
    pub fn execution_order(&self) -> Option<Vec<NodeId>> {
        let nodes: Vec<NodeId> = self.nodes.keys().cloned().collect();
        topology::compute_order(&nodes, &self.node_pairs())
    }

    /// Whether the committed edges form a cycle
    pub fn has_cycles(&self) -> bool {
        self.execution_order().is_none()
    }

    /// Nodes with an edge directly into `node_id`
    pub fn upstream_of(&self, node_id: &NodeId) -> Vec<NodeId> {
        topology::upstream_of(node_id, &self.node_pairs())
    }

    /// Nodes with an edge directly out of `node_id`
    pub fn downstream_of(&self, node_id: &NodeId) -> Vec<NodeId> {
        topology::downstream_of(node_id, &self.node_pairs())
    }

    /// Union of all node rectangles
    pub fn bounds(&self) -> Option<Rect> {
        self.nodes
            .values()
            .map(Node::rect)
            .reduce(|acc, r| acc.union(r))
    }

    /// Nodes whose rectangle intersects `rect`
    pub fn nodes_in_rect(&self, rect: Rect) -> Vec<NodeId> {
        self.nodes
            .values()
            .filter(|n| n.rect().intersects(rect))
            .map(|n| n.id.clone())
            .collect()
    }

    /// Topmost node under a point; later nodes are drawn above earlier ones
    pub fn node_at(&self, pos: Pos2) -> Option<NodeId> {
        self.nodes
            .values()
            .rev()
            .find(|n| n.rect().contains(pos))
            .map(|n| n.id.clone())
    }

    /// Closest socket whose centre lies within `radius` of `pos`
    pub fn socket_at(&self, pos: Pos2, radius: f32) -> Option<SocketRef> {
        self.closest_socket(pos, radius, |_, _| true)
    }

    /// Closest socket that could complete an edge anchored at `anchor`.
    ///
    /// Only sockets of the opposite direction that pass the type check are
    /// considered, and only strictly within `radius`.
    pub fn nearest_compatible_socket(&self, anchor: &SocketRef, pos: Pos2, radius: f32) -> Option<SocketRef> {
        let anchor_type = self.socket(anchor)?.data_type;
        let wanted = anchor.direction.opposite();
        self.closest_socket(pos, radius, |candidate, socket| {
            candidate != anchor
                && candidate.direction == wanted
                && types_compatible(anchor_type, socket.data_type)
        })
    }

    fn closest_socket(
        &self,
        pos: Pos2,
        radius: f32,
        accept: impl Fn(&SocketRef, &Socket) -> bool,
    ) -> Option<SocketRef> {
        let mut best: Option<(f32, SocketRef)> = None;
        for node in self.nodes.values() {
            for socket in node.inputs.iter().chain(node.outputs.iter()) {
                let candidate = SocketRef {
                    node: node.id.clone(),
                    direction: socket.direction,
                    socket: socket.id.clone(),
                };
                if !accept(&candidate, socket) {
                    continue;
                }
                let Some(center) = node.socket_center(socket.direction, &socket.id) else {
                    continue;
                };
                let distance = center.distance(pos);
                if distance < best.as_ref().map_or(radius, |(d, _)| *d) {
                    best = Some((distance, candidate));
                }
            }
        }
        best.map(|(_, s)| s)
    }

    /// The edge feeding an input socket, if any
    pub fn incoming_edge(&self, input: &SocketRef) -> Option<&Edge> {
        let socket = self.socket(input)?;
        socket.connections().first().and_then(|id| self.edges.get(id))
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new(Arc::new(NodeTypeRegistry::new()))
    }
}
