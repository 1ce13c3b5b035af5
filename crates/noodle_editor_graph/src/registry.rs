// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node type definitions and the registry that supplies them.
//!
//! The engine has no built-in knowledge of node behaviour: every node resolves
//! its compute function, optional widget and optional after-execute hook from a
//! [`NodeTypeDef`] once, when it is created.

use crate::node::{HeightMode, Node, NodeId, NodeState};
use crate::socket::{DataType, SocketId, SocketSpec, Value};
use futures::future::BoxFuture;
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// Values keyed by socket ID, in socket declaration order
pub type SocketValues = IndexMap<SocketId, Value>;

/// Synchronous compute function: input values and the node instance in,
/// output values out
pub type ComputeFn = Arc<dyn Fn(&SocketValues, &Node) -> SocketValues + Send + Sync>;

/// Future returned by an after-execute hook; resolves to new display text
pub type HookFuture = BoxFuture<'static, Result<Option<String>, HookError>>;

/// Asynchronous hook run after a whole execution pass
pub type AfterExecuteFn = Arc<dyn Fn(HookInput) -> HookFuture + Send + Sync>;

/// Widget drawn inside a node body; edits the node's instance state
pub type WidgetFn = Arc<dyn Fn(&mut egui::Ui, &mut NodeState) -> WidgetEvent + Send + Sync>;

/// Snapshot handed to an after-execute hook
#[derive(Debug, Clone)]
pub struct HookInput {
    /// Node the hook belongs to
    pub node: NodeId,
    /// Node type ID
    pub type_id: Option<String>,
    /// Instance state at the end of the pass
    pub state: NodeState,
    /// Values received on the input sockets
    pub inputs: SocketValues,
    /// Values stored on the output sockets
    pub outputs: SocketValues,
}

/// What a widget did this frame
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum WidgetEvent {
    /// Nothing changed
    #[default]
    None,
    /// Instance state was edited
    Changed,
    /// Instance state was edited and an output socket must switch type
    OutputTypeChanged {
        /// Output socket to retype
        socket: SocketId,
        /// New data type
        data_type: DataType,
    },
}

/// Error raised by an after-execute hook
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    /// The hook could not finish
    #[error("{0}")]
    Failed(String),
}

/// Behaviour bound to a node instance
#[derive(Clone)]
pub struct NodeBehavior {
    /// Compute function
    pub compute: ComputeFn,
    /// Optional hook run after the pass
    pub after_execute: Option<AfterExecuteFn>,
    /// Optional body widget
    pub widget: Option<WidgetFn>,
}

impl NodeBehavior {
    /// Behaviour of a generic node: the first present input flows to every output
    pub fn generic() -> Self {
        Self::from_compute(Arc::new(pass_through_first))
    }

    /// Behaviour with only a compute function
    pub fn from_compute(compute: ComputeFn) -> Self {
        Self {
            compute,
            after_execute: None,
            widget: None,
        }
    }
}

impl fmt::Debug for NodeBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeBehavior")
            .field("after_execute", &self.after_execute.is_some())
            .field("widget", &self.widget.is_some())
            .finish_non_exhaustive()
    }
}

/// Compute used by generic nodes
pub fn pass_through_first(inputs: &SocketValues, node: &Node) -> SocketValues {
    let Some(first) = inputs.values().next() else {
        return SocketValues::new();
    };
    node.outputs
        .iter()
        .map(|s| (s.id.clone(), first.clone()))
        .collect()
}

/// Node type definition
#[derive(Clone)]
pub struct NodeTypeDef {
    /// Unique type identifier
    pub id: String,
    /// Default title
    pub title: String,
    /// Default input sockets
    pub inputs: Vec<SocketSpec>,
    /// Default output sockets
    pub outputs: Vec<SocketSpec>,
    /// Whether users may resize the width
    pub resizable_width: bool,
    /// How the height is determined
    pub height_mode: HeightMode,
    /// Initial height for fixed or resizable nodes
    pub default_height: Option<f32>,
    /// Compute function
    pub compute: ComputeFn,
    /// Optional body widget
    pub widget: Option<WidgetFn>,
    /// Optional after-execute hook
    pub after_execute: Option<AfterExecuteFn>,
}

impl NodeTypeDef {
    /// Create a type with no sockets
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        compute: impl Fn(&SocketValues, &Node) -> SocketValues + Send + Sync + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            resizable_width: true,
            height_mode: HeightMode::Auto,
            default_height: None,
            compute: Arc::new(compute),
            widget: None,
            after_execute: None,
        }
    }

    /// Set the input sockets
    pub fn with_inputs(mut self, inputs: Vec<SocketSpec>) -> Self {
        self.inputs = inputs;
        self
    }

    /// Set the output sockets
    pub fn with_outputs(mut self, outputs: Vec<SocketSpec>) -> Self {
        self.outputs = outputs;
        self
    }

    /// Set the sizing policy
    pub fn with_sizing(mut self, resizable_width: bool, height_mode: HeightMode) -> Self {
        self.resizable_width = resizable_width;
        self.height_mode = height_mode;
        self
    }

    /// Set the initial height
    pub fn with_default_height(mut self, height: f32) -> Self {
        self.default_height = Some(height);
        self
    }

    /// Attach a body widget
    pub fn with_widget(
        mut self,
        widget: impl Fn(&mut egui::Ui, &mut NodeState) -> WidgetEvent + Send + Sync + 'static,
    ) -> Self {
        self.widget = Some(Arc::new(widget));
        self
    }

    /// Attach an after-execute hook
    pub fn with_after_execute(
        mut self,
        hook: impl Fn(HookInput) -> HookFuture + Send + Sync + 'static,
    ) -> Self {
        self.after_execute = Some(Arc::new(hook));
        self
    }

    /// Behaviour bound to nodes of this type
    pub fn behavior(&self) -> NodeBehavior {
        NodeBehavior {
            compute: self.compute.clone(),
            after_execute: self.after_execute.clone(),
            widget: self.widget.clone(),
        }
    }
}

impl fmt::Debug for NodeTypeDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeTypeDef")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .finish_non_exhaustive()
    }
}

/// Registry of available node types
#[derive(Debug, Clone, Default)]
pub struct NodeTypeRegistry {
    types: IndexMap<String, NodeTypeDef>,
}

impl NodeTypeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node type, replacing any type with the same ID
    pub fn register(&mut self, node_type: NodeTypeDef) {
        self.types.insert(node_type.id.clone(), node_type);
    }

    /// Get a node type by ID
    pub fn get(&self, id: &str) -> Option<&NodeTypeDef> {
        self.types.get(id)
    }

    /// Get all registered types, in registration order
    pub fn types(&self) -> impl Iterator<Item = &NodeTypeDef> {
        self.types.values()
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
