// SPDX-License-Identifier: MIT OR Apache-2.0
//! Dataflow node graph engine for Noodle Editor.
//!
//! This crate provides the pieces of a visual dataflow editor:
//! - Typed sockets and type compatibility
//! - A graph model with edges ("noodles") and output retyping
//! - Dependency-ordered execution with asynchronous after-execute hooks
//! - An interaction state machine for pointer and keyboard editing
//! - Serialization, clipboard and debounced persistence
//!
//! ## Architecture
//!
//! Node behaviour lives outside the engine in a [`NodeTypeRegistry`]; the
//! built-in catalogue is in [`nodes`]. The [`Graph`] owns nodes and edges in
//! id-indexed tables, the [`InteractionController`] owns everything transient
//! (selection, gestures, viewport, clipboard, autosave timer), and
//! [`GraphCanvas`] renders both with egui.

pub mod canvas;
pub mod clipboard;
pub mod compat;
pub mod document;
pub mod edge;
pub mod error;
pub mod evaluation;
pub mod graph;
pub mod interaction;
pub mod log_sink;
pub mod node;
pub mod noodle;
pub mod nodes;
pub mod persistence;
pub mod registry;
pub mod settings;
pub mod socket;
pub mod topology;
pub mod viewport;

pub use canvas::{CanvasResponse, GraphCanvas};
pub use clipboard::Clipboard;
pub use compat::{can_connect, types_compatible};
pub use document::{Document, EdgeRecord, LoadReport, NodeRecord};
pub use edge::{Edge, EdgeId, PendingEdge};
pub use error::GraphError;
pub use evaluation::ExecutionReport;
pub use graph::{Graph, NodeSpec};
pub use interaction::{EditorCommand, InteractionController, InteractionState};
pub use log_sink::{LogEvent, LogLevel, LogSinkLayer};
pub use node::{HeightMode, Node, NodeId, NodeState};
pub use noodle::NoodleStyle;
pub use persistence::{Autosave, GraphStore, JsonFileStore, MemoryStore, StoreError};
pub use registry::{HookError, NodeTypeDef, NodeTypeRegistry, SocketValues, WidgetEvent};
pub use settings::{EditorSettings, SettingsError};
pub use socket::{DataType, Direction, Socket, SocketId, SocketRef, SocketSpec, Value};
pub use viewport::Viewport;
