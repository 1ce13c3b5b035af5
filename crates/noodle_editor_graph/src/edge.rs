// SPDX-License-Identifier: MIT OR Apache-2.0
//! Edge (noodle) definitions for the graph.

use crate::node::NodeId;
use crate::socket::{Direction, SocketRef};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeId(pub Uuid);

impl EdgeId {
    /// Create a new random edge ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EdgeId {
    fn default() -> Self {
        Self::new()
    }
}

/// A committed edge from an output socket to an input socket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    /// Unique edge ID
    pub id: EdgeId,
    /// Source (output) socket
    pub from: SocketRef,
    /// Target (input) socket
    pub to: SocketRef,
}

impl Edge {
    pub(crate) fn new(from: SocketRef, to: SocketRef) -> Self {
        Self {
            id: EdgeId::new(),
            from,
            to,
        }
    }

    /// Check if this edge touches a specific node
    pub fn involves_node(&self, node: &NodeId) -> bool {
        self.from.node == *node || self.to.node == *node
    }

    /// Whether both ends sit on the same node
    pub fn is_self_loop(&self) -> bool {
        self.from.node == self.to.node
    }
}

/// Half-connected edge that exists only while the user drags a noodle.
///
/// Exactly one end is known; the other follows the pointer. Pending edges are
/// never stored in the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEdge {
    anchor: SocketRef,
}

impl PendingEdge {
    /// Start a pending edge at a socket
    pub fn new(anchor: SocketRef) -> Self {
        Self { anchor }
    }

    /// The fixed end
    pub fn anchor(&self) -> &SocketRef {
        &self.anchor
    }

    /// Source end, when the anchor is an output
    pub fn from(&self) -> Option<&SocketRef> {
        (self.anchor.direction == Direction::Output).then_some(&self.anchor)
    }

    /// Target end, when the anchor is an input
    pub fn to(&self) -> Option<&SocketRef> {
        (self.anchor.direction == Direction::Input).then_some(&self.anchor)
    }

    /// Direction a socket must have to complete this edge
    pub fn wanted_direction(&self) -> Direction {
        self.anchor.direction.opposite()
    }

    /// Order `(output, input)` for completing the edge at `target`
    pub fn complete_with(&self, target: SocketRef) -> (SocketRef, SocketRef) {
        match self.anchor.direction {
            Direction::Output => (self.anchor.clone(), target),
            Direction::Input => (target, self.anchor.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_edge_ends() {
        let node = NodeId::from("a");
        let pending = PendingEdge::new(SocketRef::input(node.clone(), "in"));
        assert!(pending.from().is_none());
        assert_eq!(pending.to(), Some(&SocketRef::input(node.clone(), "in")));
        assert_eq!(pending.wanted_direction(), Direction::Output);

        let target = SocketRef::output(NodeId::from("b"), "out");
        let (from, to) = pending.complete_with(target.clone());
        assert_eq!(from, target);
        assert_eq!(to, SocketRef::input(node, "in"));
    }

    #[test]
    fn test_self_loop() {
        let a = NodeId::from("a");
        let edge = Edge::new(SocketRef::output(a.clone(), "out"), SocketRef::input(a.clone(), "in"));
        assert!(edge.is_self_loop());
        assert!(edge.involves_node(&a));
    }
}
