// SPDX-License-Identifier: MIT OR Apache-2.0
//! Error types for graph mutation, loading and execution.

use crate::node::NodeId;
use crate::socket::{DataType, SocketRef};
use thiserror::Error;

/// Errors raised by the graph engine
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphError {
    /// Connect attempt between mismatched types; nothing was mutated
    #[error("Incompatible socket types: {from} -> {to}")]
    IncompatibleTypes {
        /// Type of the source end
        from: DataType,
        /// Type of the target end
        to: DataType,
    },

    /// Connect attempt whose ends are not an output and an input, in that order
    #[error("Cannot connect {from} to {to}: expected output -> input")]
    WrongDirection {
        /// Intended source end
        from: SocketRef,
        /// Intended target end
        to: SocketRef,
    },

    /// Execution order cannot be computed
    #[error("Graph contains a cycle")]
    CyclicGraph,

    /// A document entity refers to something that does not exist
    #[error("Dangling reference: {0}")]
    DanglingReference(String),

    /// Node not found
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Socket not found
    #[error("Socket not found: {0}")]
    SocketNotFound(SocketRef),
}
