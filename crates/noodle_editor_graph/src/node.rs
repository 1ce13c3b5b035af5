// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node definitions for the graph.
//!
//! A node owns its sockets, its geometry and a bag of per-type instance state.
//! Layout is computed from a handful of fixed metrics so that hit-testing and
//! rendering agree on where every socket sits.

use crate::registry::{NodeBehavior, SocketValues};
use crate::socket::{Direction, Socket, SocketId, SocketSpec};
use egui::{Pos2, Rect, Vec2};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Width given to nodes that do not ask for one
pub const DEFAULT_NODE_WIDTH: f32 = 180.0;
/// Smallest width any node can be resized to
pub const MIN_NODE_WIDTH: f32 = 120.0;
/// Smallest height any node can be resized to
pub const MIN_NODE_HEIGHT: f32 = 80.0;
/// Height of the title bar
pub const HEADER_HEIGHT: f32 = 24.0;
/// Vertical space taken by one socket row
pub const SOCKET_ROW_HEIGHT: f32 = 22.0;
/// Padding below the socket rows and around widget content
pub const BODY_PADDING: f32 = 8.0;
/// Drawn radius of a socket circle
pub const SOCKET_RADIUS: f32 = 6.0;
/// Side length of the square resize grip in the bottom-right corner
pub const RESIZE_HANDLE_SIZE: f32 = 12.0;

/// Unique identifier for a node, stable for the whole session
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    /// Create a new random node ID
    pub fn new() -> Self {
        Self(format!("node-{}", Uuid::new_v4().simple()))
    }

    /// Borrow the raw string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Per-type instance data of a node.
///
/// The engine treats it as an opaque ordered map; its shape belongs to the node
/// type. It is persisted alongside the node's geometry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeState(IndexMap<String, serde_json::Value>);

impl NodeState {
    /// Create an empty state bag
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.set(key, value);
        self
    }

    /// Raw entry
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    /// Entry as a string
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.as_str())
    }

    /// Entry as a boolean
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.0.get(key).and_then(|v| v.as_bool())
    }

    /// Entry as an integer
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.0.get(key).and_then(|v| v.as_i64())
    }

    /// Entry as a float
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.0.get(key).and_then(|v| v.as_f64())
    }

    /// Insert or replace an entry
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Remove an entry
    pub fn remove(&mut self, key: &str) -> Option<serde_json::Value> {
        self.0.shift_remove(key)
    }

    /// Iterate entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &serde_json::Value)> {
        self.0.iter()
    }

    /// Whether the bag holds nothing
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// How a node's height is determined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HeightMode {
    /// Recomputed from the socket rows and the rendered widget content
    #[default]
    Auto,
    /// Fixed by the node type
    Fixed,
    /// Dragged by the user, never below the natural height
    Resizable,
}

/// A node instance in the graph
#[derive(Clone)]
pub struct Node {
    /// Unique instance ID
    pub id: NodeId,
    /// Node type ID; `None` for generic nodes
    pub type_id: Option<String>,
    /// Display title
    pub title: String,
    /// Top-left corner in graph space
    pub position: Pos2,
    /// Width and height in graph units
    pub size: Vec2,
    /// Whether users may resize the width
    pub resizable_width: bool,
    /// How the height is determined
    pub height_mode: HeightMode,
    /// Input sockets, in declaration order
    pub inputs: Vec<Socket>,
    /// Output sockets, in declaration order
    pub outputs: Vec<Socket>,
    /// Per-type instance state
    pub state: NodeState,
    content_height: f32,
    display: Option<String>,
    behavior: NodeBehavior,
}

impl Node {
    /// Create a generic node with the given sockets
    pub fn new(
        id: NodeId,
        title: impl Into<String>,
        position: Pos2,
        inputs: &[SocketSpec],
        outputs: &[SocketSpec],
    ) -> Self {
        let mut node = Self {
            id,
            type_id: None,
            title: title.into(),
            position,
            size: Vec2::new(DEFAULT_NODE_WIDTH, 0.0),
            resizable_width: true,
            height_mode: HeightMode::Auto,
            inputs: inputs
                .iter()
                .map(|s| Socket::new(Direction::Input, s))
                .collect(),
            outputs: outputs
                .iter()
                .map(|s| Socket::new(Direction::Output, s))
                .collect(),
            state: NodeState::new(),
            content_height: 0.0,
            display: None,
            behavior: NodeBehavior::generic(),
        };
        node.size.y = node.min_size().y;
        node
    }

    /// Behaviour bound at creation
    pub fn behavior(&self) -> &NodeBehavior {
        &self.behavior
    }

    pub(crate) fn set_behavior(&mut self, behavior: NodeBehavior) {
        self.behavior = behavior;
    }

    /// Get an input socket by ID
    pub fn input(&self, id: &SocketId) -> Option<&Socket> {
        self.inputs.iter().find(|s| s.id == *id)
    }

    /// Get an output socket by ID
    pub fn output(&self, id: &SocketId) -> Option<&Socket> {
        self.outputs.iter().find(|s| s.id == *id)
    }

    /// Get a socket by direction and ID
    pub fn socket(&self, direction: Direction, id: &SocketId) -> Option<&Socket> {
        self.sockets(direction).iter().find(|s| s.id == *id)
    }

    /// Get a mutable socket by direction and ID
    pub fn socket_mut(&mut self, direction: Direction, id: &SocketId) -> Option<&mut Socket> {
        let list = match direction {
            Direction::Input => &mut self.inputs,
            Direction::Output => &mut self.outputs,
        };
        list.iter_mut().find(|s| s.id == *id)
    }

    /// Socket list for one direction
    pub fn sockets(&self, direction: Direction) -> &[Socket] {
        match direction {
            Direction::Input => &self.inputs,
            Direction::Output => &self.outputs,
        }
    }

    /// Bounding rectangle in graph space
    pub fn rect(&self) -> Rect {
        Rect::from_min_size(self.position, self.size)
    }

    /// Title bar rectangle in graph space
    pub fn header_rect(&self) -> Rect {
        Rect::from_min_size(self.position, Vec2::new(self.size.x, HEADER_HEIGHT))
    }

    fn socket_rows(&self) -> usize {
        self.inputs.len().max(self.outputs.len())
    }

    /// Size of the un-styled layout: socket rows plus widget content
    pub fn natural_size(&self) -> Vec2 {
        let height = HEADER_HEIGHT
            + self.socket_rows() as f32 * SOCKET_ROW_HEIGHT
            + self.content_height
            + BODY_PADDING;
        Vec2::new(MIN_NODE_WIDTH, height)
    }

    /// Smallest size a resize may produce
    pub fn min_size(&self) -> Vec2 {
        let natural = self.natural_size();
        Vec2::new(natural.x.max(MIN_NODE_WIDTH), natural.y.max(MIN_NODE_HEIGHT))
    }

    /// Whether either dimension can be dragged
    pub fn is_resizable(&self) -> bool {
        self.resizable_width || self.height_mode == HeightMode::Resizable
    }

    /// Apply a requested size, respecting the sizing policy and the minimum
    pub fn set_size(&mut self, size: Vec2) {
        let min = self.min_size();
        if self.resizable_width {
            self.size.x = size.x.max(min.x);
        }
        match self.height_mode {
            HeightMode::Resizable => self.size.y = size.y.max(min.y),
            HeightMode::Auto => self.size.y = min.y,
            HeightMode::Fixed => {}
        }
    }

    /// Record the measured widget content height and re-flow the node
    pub fn fit_to_content(&mut self, content_height: f32) {
        self.content_height = content_height.max(0.0);
        let min = self.min_size();
        match self.height_mode {
            HeightMode::Auto => self.size.y = min.y,
            HeightMode::Resizable => self.size.y = self.size.y.max(min.y),
            HeightMode::Fixed => {}
        }
    }

    /// Centre of a socket circle in graph space
    pub fn socket_center(&self, direction: Direction, id: &SocketId) -> Option<Pos2> {
        let index = self.sockets(direction).iter().position(|s| s.id == *id)?;
        let x = match direction {
            Direction::Input => self.position.x,
            Direction::Output => self.position.x + self.size.x,
        };
        let y = self.position.y
            + HEADER_HEIGHT
            + index as f32 * SOCKET_ROW_HEIGHT
            + SOCKET_ROW_HEIGHT / 2.0;
        Some(Pos2::new(x, y))
    }

    /// Resize grip in graph space, if the node can be resized
    pub fn resize_handle_rect(&self) -> Option<Rect> {
        self.is_resizable().then(|| {
            let max = self.rect().max;
            Rect::from_min_max(
                max - Vec2::splat(RESIZE_HANDLE_SIZE),
                max,
            )
        })
    }

    /// Area below the socket rows reserved for the widget
    pub fn content_rect(&self) -> Rect {
        let top = self.position.y + HEADER_HEIGHT + self.socket_rows() as f32 * SOCKET_ROW_HEIGHT;
        let rect = self.rect();
        Rect::from_min_max(
            Pos2::new(rect.min.x + BODY_PADDING, top),
            Pos2::new(rect.max.x - BODY_PADDING, (rect.max.y - BODY_PADDING).max(top)),
        )
    }

    /// Text set by the after-execute hook
    pub fn display(&self) -> Option<&str> {
        self.display.as_deref()
    }

    /// Replace the display text
    pub fn set_display(&mut self, text: Option<String>) {
        self.display = text;
    }

    /// Values currently held by the input sockets
    pub fn input_values(&self) -> SocketValues {
        self.inputs
            .iter()
            .filter_map(|s| s.value().map(|v| (s.id.clone(), v.clone())))
            .collect()
    }

    /// Values currently held by the output sockets
    pub fn output_values(&self) -> SocketValues {
        self.outputs
            .iter()
            .filter_map(|s| s.value().map(|v| (s.id.clone(), v.clone())))
            .collect()
    }

    /// Reset every socket to "unset"
    pub fn clear_values(&mut self) {
        for socket in self.inputs.iter_mut().chain(self.outputs.iter_mut()) {
            socket.clear_value();
        }
    }

    /// Run the bound compute function
    pub fn compute(&self, inputs: &SocketValues) -> SocketValues {
        (self.behavior.compute)(inputs, self)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("type_id", &self.type_id)
            .field("title", &self.title)
            .field("position", &self.position)
            .field("size", &self.size)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::socket::{DataType, Value};

    fn two_in_one_out() -> Node {
        Node::new(
            NodeId::from("n"),
            "Test",
            Pos2::new(10.0, 20.0),
            &[
                SocketSpec::new("a", "A", DataType::Float),
                SocketSpec::new("b", "B", DataType::Float),
            ],
            &[SocketSpec::new("out", "", DataType::Float)],
        )
    }

    #[test]
    fn test_new_node_uses_natural_height() {
        let node = two_in_one_out();
        assert_eq!(node.size.x, DEFAULT_NODE_WIDTH);
        let natural = HEADER_HEIGHT + 2.0 * SOCKET_ROW_HEIGHT + BODY_PADDING;
        assert_eq!(node.size.y, natural.max(MIN_NODE_HEIGHT));
        assert_eq!(node.outputs[0].label, "out");
    }

    #[test]
    fn test_socket_centers() {
        let node = two_in_one_out();
        let a = node.socket_center(Direction::Input, &"a".into()).unwrap();
        let b = node.socket_center(Direction::Input, &"b".into()).unwrap();
        let out = node.socket_center(Direction::Output, &"out".into()).unwrap();
        assert_eq!(a.x, 10.0);
        assert_eq!(b.y - a.y, SOCKET_ROW_HEIGHT);
        assert_eq!(out.x, 10.0 + DEFAULT_NODE_WIDTH);
        assert_eq!(out.y, a.y);
        assert!(node.socket_center(Direction::Output, &"a".into()).is_none());
    }

    #[test]
    fn test_resize_clamps_to_minimum() {
        let mut node = two_in_one_out();
        node.height_mode = HeightMode::Resizable;
        node.set_size(Vec2::new(10.0, 10.0));
        assert_eq!(node.size, node.min_size());

        node.set_size(Vec2::new(300.0, 400.0));
        assert_eq!(node.size, Vec2::new(300.0, 400.0));

        node.resizable_width = false;
        node.height_mode = HeightMode::Fixed;
        node.set_size(Vec2::new(500.0, 500.0));
        assert_eq!(node.size, Vec2::new(300.0, 400.0));
    }

    #[test]
    fn test_fit_to_content_grows_auto_nodes() {
        let mut node = two_in_one_out();
        let before = node.size.y;
        node.fit_to_content(100.0);
        assert!(node.size.y > before);
        assert_eq!(node.size.y, node.natural_size().y);
    }

    #[test]
    fn test_clear_values() {
        let mut node = two_in_one_out();
        node.outputs[0].set_value(Value::Float(1.0));
        assert_eq!(node.output_values().len(), 1);
        node.clear_values();
        assert!(node.output_values().is_empty());
    }

    #[test]
    fn test_state_accessors() {
        let state = NodeState::new()
            .with("inputValue", "3.5")
            .with("floatRound", true)
            .with("floatDecimals", 2);
        assert_eq!(state.get_str("inputValue"), Some("3.5"));
        assert_eq!(state.get_bool("floatRound"), Some(true));
        assert_eq!(state.get_i64("floatDecimals"), Some(2));
        assert_eq!(state.get_f64("floatDecimals"), Some(2.0));
        let keys: Vec<_> = state.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["inputValue", "floatRound", "floatDecimals"]);
    }
}
