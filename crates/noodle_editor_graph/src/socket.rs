// SPDX-License-Identifier: MIT OR Apache-2.0
//! Socket definitions for node inputs/outputs.

use crate::edge::EdgeId;
use crate::node::NodeId;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Identifier of a socket, unique among one node's sockets of the same direction
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SocketId(pub String);

impl SocketId {
    /// Create a socket ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SocketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for SocketId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SocketId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for SocketId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Socket direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Input socket (at most one connection)
    Input,
    /// Output socket (any number of connections)
    Output,
}

impl Direction {
    /// The other direction
    pub fn opposite(self) -> Self {
        match self {
            Self::Input => Self::Output,
            Self::Output => Self::Input,
        }
    }
}

/// Data type that can flow through sockets.
///
/// The vocabulary is closed; `Any` is the wildcard. Unknown names read from a
/// document fall back to `Default`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum DataType {
    /// Untyped value
    #[default]
    Default,
    /// Floating point number
    Float,
    /// Integer number
    Integer,
    /// Text
    String,
    /// Boolean
    Bool,
    /// Wildcard, compatible with every type
    Any,
}

impl DataType {
    /// Every data type, in declaration order
    pub const ALL: [DataType; 6] = [
        Self::Default,
        Self::Float,
        Self::Integer,
        Self::String,
        Self::Bool,
        Self::Any,
    ];

    /// Whether this is the wildcard type
    pub fn is_wildcard(self) -> bool {
        matches!(self, Self::Any)
    }

    /// Name used in documents
    pub fn name(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Float => "float",
            Self::Integer => "integer",
            Self::String => "string",
            Self::Bool => "bool",
            Self::Any => "any",
        }
    }

    /// Parse a document name
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }
}

impl From<String> for DataType {
    fn from(value: String) -> Self {
        Self::parse(&value).unwrap_or_default()
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Value carried through a socket during one execution pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Boolean
    Bool(bool),
    /// Integer
    Integer(i64),
    /// Float
    Float(f64),
    /// String
    String(String),
}

impl Value {
    /// The data type this value naturally belongs to
    pub fn data_type(&self) -> DataType {
        match self {
            Self::Bool(_) => DataType::Bool,
            Self::Integer(_) => DataType::Integer,
            Self::Float(_) => DataType::Float,
            Self::String(_) => DataType::String,
        }
    }

    /// Numeric view of the value
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Integer view of the value (floats are truncated)
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(*v),
            Self::Float(v) => Some(v.trunc() as i64),
            _ => None,
        }
    }

    /// String view of the value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Boolean view of the value
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::String(v) => f.write_str(v),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

/// Socket declaration, as supplied by a node type or a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocketSpec {
    /// Socket ID
    pub id: SocketId,
    /// Display label (falls back to the ID when empty)
    #[serde(default)]
    pub label: String,
    /// Data type
    #[serde(default)]
    pub data_type: DataType,
}

impl SocketSpec {
    /// Create a socket declaration
    pub fn new(id: impl Into<SocketId>, label: impl Into<String>, data_type: DataType) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            data_type,
        }
    }
}

/// A socket on a node
#[derive(Debug, Clone)]
pub struct Socket {
    /// Socket ID
    pub id: SocketId,
    /// Display label
    pub label: String,
    /// Data type
    pub data_type: DataType,
    /// Socket direction
    pub direction: Direction,
    connections: Vec<EdgeId>,
    value: Option<Value>,
}

impl Socket {
    /// Create a socket from its declaration
    pub fn new(direction: Direction, spec: &SocketSpec) -> Self {
        let label = if spec.label.is_empty() {
            spec.id.to_string()
        } else {
            spec.label.clone()
        };
        Self {
            id: spec.id.clone(),
            label,
            data_type: spec.data_type,
            direction,
            connections: Vec::new(),
            value: None,
        }
    }

    /// Create an input socket
    pub fn input(id: impl Into<SocketId>, label: impl Into<String>, data_type: DataType) -> Self {
        Self::new(Direction::Input, &SocketSpec::new(id, label, data_type))
    }

    /// Create an output socket
    pub fn output(id: impl Into<SocketId>, label: impl Into<String>, data_type: DataType) -> Self {
        Self::new(Direction::Output, &SocketSpec::new(id, label, data_type))
    }

    /// Declaration of this socket
    pub fn spec(&self) -> SocketSpec {
        SocketSpec::new(self.id.clone(), self.label.clone(), self.data_type)
    }

    /// Edges attached to this socket
    pub fn connections(&self) -> &[EdgeId] {
        &self.connections
    }

    /// Whether any edge is attached
    pub fn is_connected(&self) -> bool {
        !self.connections.is_empty()
    }

    /// Value produced in the last execution pass, if any
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    pub(crate) fn set_value(&mut self, value: Value) {
        self.value = Some(value);
    }

    pub(crate) fn clear_value(&mut self) {
        self.value = None;
    }

    pub(crate) fn add_connection(&mut self, edge: EdgeId) {
        if !self.connections.contains(&edge) {
            self.connections.push(edge);
        }
    }

    pub(crate) fn remove_connection(&mut self, edge: EdgeId) {
        self.connections.retain(|e| *e != edge);
    }
}

/// Address of a socket inside a graph
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SocketRef {
    /// Owning node
    pub node: NodeId,
    /// Which socket list the ID refers to
    pub direction: Direction,
    /// Socket ID
    pub socket: SocketId,
}

impl SocketRef {
    /// Address an input socket
    pub fn input(node: NodeId, socket: impl Into<SocketId>) -> Self {
        Self {
            node,
            direction: Direction::Input,
            socket: socket.into(),
        }
    }

    /// Address an output socket
    pub fn output(node: NodeId, socket: impl Into<SocketId>) -> Self {
        Self {
            node,
            direction: Direction::Output,
            socket: socket.into(),
        }
    }
}

impl fmt::Display for SocketRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dir = match self.direction {
            Direction::Input => "in",
            Direction::Output => "out",
        };
        write!(f, "{}/{}:{}", self.node, dir, self.socket)
    }
}
