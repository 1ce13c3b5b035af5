// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pointer and keyboard state machine layered on a [`Graph`].
//!
//! The controller owns everything the user is doing with the graph but that
//! is not part of the graph itself: selection, the active gesture, the
//! clipboard, the viewport and the autosave timer. Hosts feed it canvas-local
//! pointer positions; the controller converts them to graph space.

use crate::clipboard::Clipboard;
use crate::compat::{noodle_coloring, types_compatible, NoodleColoring};
use crate::edge::PendingEdge;
use crate::graph::{Graph, NodeSpec};
use crate::noodle::Endpoint;
use crate::node::{NodeId, SOCKET_RADIUS};
use crate::persistence::{Autosave, GraphStore, StoreError};
use crate::settings::EditorSettings;
use crate::socket::{Direction, SocketRef};
use crate::viewport::Viewport;
use egui::{Key, Modifiers, PointerButton, Pos2, Rect, Vec2};
use indexmap::IndexSet;
use std::time::Instant;

/// Radius in graph units that counts as pressing a socket directly
pub const SOCKET_HIT_RADIUS: f32 = SOCKET_RADIUS * 1.5;

/// How a finished box selection combines with the current selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    /// Replace the selection
    Replace,
    /// Add to the selection (Shift)
    Add,
    /// Remove from the selection (Ctrl/Cmd)
    Subtract,
}

impl SelectionMode {
    /// Mode implied by the modifiers held at press time
    pub fn from_modifiers(modifiers: Modifiers) -> Self {
        if modifiers.command || modifiers.ctrl {
            Self::Subtract
        } else if modifiers.shift {
            Self::Add
        } else {
            Self::Replace
        }
    }
}

/// Rubber-band rectangle in graph space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxSelection {
    /// Press point
    pub start: Pos2,
    /// Current pointer
    pub current: Pos2,
    /// Combination rule
    pub mode: SelectionMode,
}

impl BoxSelection {
    /// Normalised rectangle
    pub fn rect(&self) -> Rect {
        Rect::from_two_pos(self.start, self.current)
    }
}

/// Noodle being dragged
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeDrag {
    /// Known end
    pub pending: PendingEdge,
    /// Pointer in graph space
    pub pointer: Pos2,
    /// Socket the free end would snap to
    pub snap: Option<SocketRef>,
}

/// Active gesture
#[derive(Debug, Clone, PartialEq, Default)]
pub enum InteractionState {
    /// Nothing in progress
    #[default]
    Idle,
    /// Selected nodes follow the pointer
    DraggingNodes {
        /// Pointer at press time, in graph space
        grab: Pos2,
        /// Positions of the dragged nodes at press time
        start_positions: Vec<(NodeId, Pos2)>,
    },
    /// One node's size follows the pointer
    ResizingNode {
        /// Node being resized
        node: NodeId,
        /// Pointer at press time, in graph space
        start_pointer: Pos2,
        /// Node size at press time
        start_size: Vec2,
    },
    /// A pending edge follows the pointer
    DraggingEdge(EdgeDrag),
    /// A selection rectangle follows the pointer
    BoxSelecting(BoxSelection),
    /// The view follows the pointer
    Panning {
        /// Pointer at press time, in screen space
        start_pointer: Pos2,
        /// Pan at press time
        start_pan: Vec2,
    },
}

/// What lies under a graph-space point
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Hit {
    /// A socket circle
    Socket(SocketRef),
    /// A node's resize grip
    ResizeHandle(NodeId),
    /// A node's widget area; the widget handles the pointer itself
    Widget(NodeId),
    /// A node's header or body
    Node(NodeId),
    /// Empty canvas
    Canvas,
}

/// Keyboard commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorCommand {
    /// Copy the selection to the clipboard
    Copy,
    /// Paste the clipboard at the pointer
    Paste,
    /// Remove the selected nodes
    DeleteSelection,
    /// Centre the view on all nodes
    CenterView,
}

impl EditorCommand {
    /// Command bound to a key press, if any
    pub fn from_key(key: Key, modifiers: Modifiers) -> Option<Self> {
        let command = modifiers.command || modifiers.ctrl;
        match key {
            Key::C if command => Some(Self::Copy),
            Key::V if command => Some(Self::Paste),
            Key::Delete | Key::Backspace | Key::X if !command && !modifiers.alt => {
                Some(Self::DeleteSelection)
            }
            Key::Period if !command && !modifiers.alt => Some(Self::CenterView),
            _ => None,
        }
    }
}

/// Interaction state machine for one graph view
#[derive(Debug, Clone)]
pub struct InteractionController {
    settings: EditorSettings,
    viewport: Viewport,
    selection: IndexSet<NodeId>,
    state: InteractionState,
    clipboard: Clipboard,
    last_pointer: Option<Pos2>,
    autosave: Autosave,
    gesture_changed: bool,
    graph_changed: bool,
}

impl Default for InteractionController {
    fn default() -> Self {
        Self::new(EditorSettings::default())
    }
}

impl InteractionController {
    /// Create a controller
    pub fn new(settings: EditorSettings) -> Self {
        Self {
            autosave: Autosave::new(settings.autosave_delay()),
            settings,
            viewport: Viewport::default(),
            selection: IndexSet::new(),
            state: InteractionState::Idle,
            clipboard: Clipboard::default(),
            last_pointer: None,
            gesture_changed: false,
            graph_changed: false,
        }
    }

    /// Active settings
    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    /// Replace the settings
    pub fn set_settings(&mut self, settings: EditorSettings) {
        self.autosave = Autosave::new(settings.autosave_delay());
        self.settings = settings;
    }

    /// Current pan/zoom
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Mutable pan/zoom
    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    /// Active gesture
    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    /// Selected nodes, in selection order
    pub fn selection(&self) -> &IndexSet<NodeId> {
        &self.selection
    }

    /// Whether a node is selected
    pub fn is_selected(&self, node: &NodeId) -> bool {
        self.selection.contains(node)
    }

    /// Select exactly one node
    pub fn select_only(&mut self, node: NodeId) {
        self.selection.clear();
        self.selection.insert(node);
    }

    /// Deselect everything
    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Clipboard contents
    pub fn clipboard(&self) -> &Clipboard {
        &self.clipboard
    }

    /// Last pointer position seen over the canvas, in graph space
    pub fn last_pointer(&self) -> Option<Pos2> {
        self.last_pointer
    }

    /// Whether an autosave is scheduled
    pub fn save_pending(&self) -> bool {
        self.autosave.is_pending()
    }

    /// Classify a graph-space point
    pub fn hit_test(&self, graph: &Graph, pos: Pos2) -> Hit {
        if let Some(socket) = graph.socket_at(pos, SOCKET_HIT_RADIUS) {
            return Hit::Socket(socket);
        }
        let Some(node_id) = graph.node_at(pos) else {
            return Hit::Canvas;
        };
        let Some(node) = graph.node(&node_id) else {
            return Hit::Canvas;
        };
        if node.resize_handle_rect().is_some_and(|r| r.contains(pos)) {
            return Hit::ResizeHandle(node_id);
        }
        if node.behavior().widget.is_some() && node.content_rect().contains(pos) {
            return Hit::Widget(node_id);
        }
        Hit::Node(node_id)
    }

    /// Handle a button press at a canvas-local position
    pub fn pointer_pressed(
        &mut self,
        graph: &mut Graph,
        screen: Pos2,
        button: PointerButton,
        modifiers: Modifiers,
    ) {
        let pos = self.viewport.screen_to_graph(screen);
        self.last_pointer = Some(pos);

        // One gesture at a time; a pan never interrupts a drag in progress
        if button == PointerButton::Middle && self.state == InteractionState::Idle {
            self.state = InteractionState::Panning {
                start_pointer: screen,
                start_pan: self.viewport.pan,
            };
            return;
        }
        if button != PointerButton::Primary || self.state != InteractionState::Idle {
            return;
        }

        self.gesture_changed = false;
        self.state = match self.hit_test(graph, pos) {
            Hit::Socket(socket) => self.begin_edge_drag(graph, socket, pos),
            Hit::ResizeHandle(node) => match graph.node(&node) {
                Some(n) => InteractionState::ResizingNode {
                    start_size: n.size,
                    node,
                    start_pointer: pos,
                },
                None => InteractionState::Idle,
            },
            Hit::Widget(_) => InteractionState::Idle,
            Hit::Node(node) => {
                if !self.selection.contains(&node) {
                    self.select_only(node);
                }
                let start_positions = self
                    .selection
                    .iter()
                    .filter_map(|id| graph.node(id).map(|n| (id.clone(), n.position)))
                    .collect();
                InteractionState::DraggingNodes {
                    grab: pos,
                    start_positions,
                }
            }
            Hit::Canvas => InteractionState::BoxSelecting(BoxSelection {
                start: pos,
                current: pos,
                mode: SelectionMode::from_modifiers(modifiers),
            }),
        };
    }

    fn begin_edge_drag(&mut self, graph: &mut Graph, socket: SocketRef, pos: Pos2) -> InteractionState {
        let anchor = match socket.direction {
            // Pick up the edge already feeding this input and rewire it
            Direction::Input => match graph.incoming_edge(&socket).map(|e| e.id) {
                Some(edge_id) => match graph.disconnect(edge_id) {
                    Some(edge) => {
                        self.gesture_changed = true;
                        edge.from
                    }
                    None => socket,
                },
                None => socket,
            },
            Direction::Output => socket,
        };
        let pending = PendingEdge::new(anchor);
        let snap = graph.nearest_compatible_socket(pending.anchor(), pos, self.settings.snap_distance);
        InteractionState::DraggingEdge(EdgeDrag {
            pending,
            pointer: pos,
            snap,
        })
    }

    /// Handle pointer movement to a canvas-local position
    pub fn pointer_moved(&mut self, graph: &mut Graph, screen: Pos2) {
        let pos = self.viewport.screen_to_graph(screen);
        self.last_pointer = Some(pos);

        match &mut self.state {
            InteractionState::Idle => {}
            InteractionState::Panning {
                start_pointer,
                start_pan,
            } => {
                self.viewport.pan = *start_pan + (screen - *start_pointer);
            }
            InteractionState::DraggingNodes {
                grab,
                start_positions,
            } => {
                let delta = pos - *grab;
                for (id, start) in start_positions.iter() {
                    if let Some(node) = graph.node_mut(id) {
                        let target = *start + delta;
                        if node.position != target {
                            node.position = target;
                            self.gesture_changed = true;
                        }
                    }
                }
            }
            InteractionState::ResizingNode {
                node,
                start_pointer,
                start_size,
            } => {
                if let Some(node) = graph.node_mut(node) {
                    let before = node.size;
                    node.set_size(*start_size + (pos - *start_pointer));
                    if node.size != before {
                        self.gesture_changed = true;
                    }
                }
            }
            InteractionState::DraggingEdge(drag) => {
                drag.pointer = pos;
                drag.snap =
                    graph.nearest_compatible_socket(drag.pending.anchor(), pos, self.settings.snap_distance);
            }
            InteractionState::BoxSelecting(selection) => {
                selection.current = pos;
            }
        }
    }

    /// Handle a button release at a canvas-local position
    pub fn pointer_released(&mut self, graph: &mut Graph, screen: Pos2, button: PointerButton, now: Instant) {
        self.pointer_moved(graph, screen);

        let panning = matches!(self.state, InteractionState::Panning { .. });
        match button {
            PointerButton::Middle if panning => {
                self.state = InteractionState::Idle;
                return;
            }
            PointerButton::Primary if !panning => {}
            _ => return,
        }

        match std::mem::take(&mut self.state) {
            InteractionState::BoxSelecting(selection) => self.finish_box_selection(graph, selection),
            InteractionState::DraggingEdge(drag) => self.finish_edge_drag(graph, drag),
            InteractionState::Idle
            | InteractionState::DraggingNodes { .. }
            | InteractionState::ResizingNode { .. }
            | InteractionState::Panning { .. } => {}
        }

        if std::mem::take(&mut self.gesture_changed) {
            self.notify_graph_changed(now);
            self.autosave.expedite(now);
        }
    }

    fn finish_box_selection(&mut self, graph: &Graph, selection: BoxSelection) {
        let size = selection.rect().size() * self.viewport.zoom;
        let threshold = self.settings.box_select_threshold;
        if size.x <= threshold && size.y <= threshold {
            self.selection.clear();
            return;
        }
        let inside = graph.nodes_in_rect(selection.rect());
        match selection.mode {
            SelectionMode::Replace => self.selection = inside.into_iter().collect(),
            SelectionMode::Add => self.selection.extend(inside),
            SelectionMode::Subtract => {
                for id in &inside {
                    self.selection.shift_remove(id);
                }
            }
        }
    }

    fn finish_edge_drag(&mut self, graph: &mut Graph, drag: EdgeDrag) {
        let anchor = drag.pending.anchor();
        let direct = graph.socket_at(drag.pointer, SOCKET_HIT_RADIUS).filter(|s| {
            s != anchor
                && s.direction == drag.pending.wanted_direction()
                && match (graph.socket(anchor), graph.socket(s)) {
                    (Some(a), Some(b)) => types_compatible(a.data_type, b.data_type),
                    _ => false,
                }
        });
        let target = direct.or_else(|| {
            graph.nearest_compatible_socket(anchor, drag.pointer, self.settings.snap_distance)
        });

        let Some(target) = target else {
            tracing::debug!("Discarded pending edge from {}", anchor);
            return;
        };
        let (from, to) = drag.pending.complete_with(target);
        match graph.connect(&from, &to) {
            Ok(_) => self.gesture_changed = true,
            Err(err) => tracing::debug!("Discarded pending edge: {}", err),
        }
    }

    /// Handle a wheel step at a canvas-local position; positive deltas zoom out
    pub fn wheel(&mut self, screen: Pos2, delta_y: f32) {
        if delta_y == 0.0 {
            return;
        }
        let factor = self.settings.wheel_zoom_factor(delta_y);
        self.viewport
            .zoom_at(screen, factor, self.settings.zoom_min, self.settings.zoom_max);
    }

    /// Handle a key press; returns true when it triggered a command
    pub fn key_pressed(&mut self, graph: &mut Graph, key: Key, modifiers: Modifiers, now: Instant) -> bool {
        match EditorCommand::from_key(key, modifiers) {
            Some(command) => {
                self.command(graph, command, now);
                true
            }
            None => false,
        }
    }

    /// Run a keyboard command
    pub fn command(&mut self, graph: &mut Graph, command: EditorCommand, now: Instant) {
        match command {
            EditorCommand::Copy => self.copy_selection(graph),
            EditorCommand::Paste => {
                self.paste(graph, now);
            }
            EditorCommand::DeleteSelection => self.delete_selection(graph, now),
            EditorCommand::CenterView => self.center_view(graph),
        }
    }

    /// Copy the selected nodes
    pub fn copy_selection(&mut self, graph: &Graph) {
        if self.selection.is_empty() {
            return;
        }
        self.clipboard = Clipboard::copy(graph, &self.selection);
    }

    /// Paste at the last pointer position, or the view centre; selects the new nodes
    pub fn paste(&mut self, graph: &mut Graph, now: Instant) -> Vec<NodeId> {
        if self.clipboard.is_empty() {
            return Vec::new();
        }
        let at = self
            .last_pointer
            .unwrap_or_else(|| self.viewport.view_center_graph());
        let pasted = self.clipboard.paste(graph, at);
        self.selection = pasted.iter().cloned().collect();
        self.notify_graph_changed(now);
        pasted
    }

    /// Remove every selected node
    pub fn delete_selection(&mut self, graph: &mut Graph, now: Instant) {
        if self.selection.is_empty() {
            return;
        }
        for id in std::mem::take(&mut self.selection) {
            graph.remove_node(&id);
        }
        self.notify_graph_changed(now);
    }

    /// Centre the view on the bounding box of all nodes
    pub fn center_view(&mut self, graph: &Graph) {
        if let Some(bounds) = graph.bounds() {
            self.viewport.center_on(bounds);
        }
    }

    /// Create a node at a canvas-local position (context-menu creation)
    pub fn add_node_at(&mut self, graph: &mut Graph, type_id: Option<&str>, screen: Pos2, now: Instant) -> NodeId {
        let pos = self.viewport.screen_to_graph(screen);
        let (title, spec) = match type_id {
            Some(type_id) => {
                let title = graph
                    .registry()
                    .get(type_id)
                    .map_or_else(|| type_id.to_string(), |d| d.title.clone());
                (title, NodeSpec::of_type(type_id))
            }
            None => ("Node".to_string(), NodeSpec::generic()),
        };
        let spec = NodeSpec {
            width: Some(self.settings.default_node_width),
            ..spec
        };
        let id = graph.add_node(title, pos, spec);
        self.select_only(id.clone());
        self.notify_graph_changed(now);
        id
    }

    /// Forget selected nodes that no longer exist
    pub fn sync_selection(&mut self, graph: &Graph) {
        self.selection.retain(|id| graph.contains_node(id));
    }

    /// Schedule a debounced save
    pub fn notify_graph_changed(&mut self, now: Instant) {
        self.graph_changed = true;
        self.autosave.request(now);
    }

    /// Whether the graph changed since the last call
    pub fn take_graph_changed(&mut self) -> bool {
        std::mem::take(&mut self.graph_changed)
    }

    /// Write the graph if the debounce deadline has passed; returns true on write
    pub fn tick(&mut self, graph: &Graph, now: Instant, store: &mut dyn GraphStore) -> Result<bool, StoreError> {
        if !self.autosave.poll(now) {
            return Ok(false);
        }
        store.save(&graph.serialize())?;
        tracing::debug!("Autosaved {} nodes", graph.node_count());
        Ok(true)
    }

    /// Geometry and colouring of the noodle being dragged, in graph space.
    ///
    /// Returns `(from, to, coloring)`; a snapped end still routes as the cursor.
    pub fn pending_noodle(&self, graph: &Graph) -> Option<(Endpoint, Endpoint, NoodleColoring)> {
        let InteractionState::DraggingEdge(drag) = &self.state else {
            return None;
        };
        let anchor = drag.pending.anchor();
        let node = graph.node(&anchor.node)?;
        let anchor_pos = node.socket_center(anchor.direction, &anchor.socket)?;
        let anchor_type = graph.socket(anchor)?.data_type;
        let free_pos = drag
            .snap
            .as_ref()
            .and_then(|s| graph.node(&s.node)?.socket_center(s.direction, &s.socket))
            .unwrap_or(drag.pointer);

        let anchor_end = Endpoint::socket(anchor_pos, anchor.direction);
        let free_end = Endpoint::cursor(free_pos);
        Some(match anchor.direction {
            Direction::Output => (anchor_end, free_end, noodle_coloring(Some(anchor_type), None)),
            Direction::Input => (free_end, anchor_end, noodle_coloring(None, Some(anchor_type))),
        })
    }

    /// Active box selection rectangle in graph space
    pub fn selection_rect(&self) -> Option<Rect> {
        match &self.state {
            InteractionState::BoxSelecting(selection) => Some(selection.rect()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::HEADER_HEIGHT;
    use crate::persistence::MemoryStore;
    use crate::socket::{DataType, SocketSpec};
    use std::time::Duration;

    fn typed_node(graph: &mut Graph, title: &str, at: Pos2, ty: DataType) -> NodeId {
        graph.add_node(
            title,
            at,
            NodeSpec::generic()
                .with_inputs(vec![SocketSpec::new("in", "", ty)])
                .with_outputs(vec![SocketSpec::new("out", "", ty)]),
        )
    }

    fn center(graph: &Graph, socket: &SocketRef) -> Pos2 {
        graph
            .node(&socket.node)
            .unwrap()
            .socket_center(socket.direction, &socket.socket)
            .unwrap()
    }

    fn press(ctrl: &mut InteractionController, graph: &mut Graph, at: Pos2) {
        ctrl.pointer_pressed(graph, at, PointerButton::Primary, Modifiers::NONE);
    }

    fn release(ctrl: &mut InteractionController, graph: &mut Graph, at: Pos2, now: Instant) {
        ctrl.pointer_released(graph, at, PointerButton::Primary, now);
    }

    #[test]
    fn test_drag_from_output_connects_with_snap() {
        let mut graph = Graph::default();
        let a = typed_node(&mut graph, "A", Pos2::new(0.0, 0.0), DataType::Integer);
        let b = typed_node(&mut graph, "B", Pos2::new(400.0, 0.0), DataType::Integer);
        let mut ctrl = InteractionController::default();
        let now = Instant::now();

        let out = SocketRef::output(a, "out");
        let input = SocketRef::input(b, "in");
        let start = center(&graph, &out);
        press(&mut ctrl, &mut graph, start);
        assert!(matches!(ctrl.state(), InteractionState::DraggingEdge(_)));

        // Within snap distance but outside the direct hit radius
        let near = center(&graph, &input) + Vec2::new(-15.0, 0.0);
        ctrl.pointer_moved(&mut graph, near);
        match ctrl.state() {
            InteractionState::DraggingEdge(drag) => assert_eq!(drag.snap.as_ref(), Some(&input)),
            other => panic!("unexpected state {other:?}"),
        }
        release(&mut ctrl, &mut graph, near, now);

        assert_eq!(ctrl.state(), &InteractionState::Idle);
        assert_eq!(graph.edge_count(), 1);
        assert!(ctrl.save_pending());
        assert!(ctrl.take_graph_changed());
        assert!(!ctrl.take_graph_changed());
    }

    #[test]
    fn test_drag_to_nothing_discards_pending_edge() {
        let mut graph = Graph::default();
        let a = typed_node(&mut graph, "A", Pos2::new(0.0, 0.0), DataType::Integer);
        let mut ctrl = InteractionController::default();
        let start = center(&graph, &SocketRef::output(a, "out"));
        press(&mut ctrl, &mut graph, start);
        release(&mut ctrl, &mut graph, Pos2::new(600.0, 600.0), Instant::now());
        assert_eq!(graph.edge_count(), 0);
        assert!(!ctrl.save_pending());
    }

    #[test]
    fn test_incompatible_target_is_rejected() {
        let mut graph = Graph::default();
        let a = typed_node(&mut graph, "A", Pos2::new(0.0, 0.0), DataType::Integer);
        let b = typed_node(&mut graph, "B", Pos2::new(400.0, 0.0), DataType::String);
        let mut ctrl = InteractionController::default();
        let start = center(&graph, &SocketRef::output(a, "out"));
        press(&mut ctrl, &mut graph, start);
        let target = center(&graph, &SocketRef::input(b, "in"));
        release(&mut ctrl, &mut graph, target, Instant::now());
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_pressing_connected_input_picks_up_edge() {
        let mut graph = Graph::default();
        let a = typed_node(&mut graph, "A", Pos2::new(0.0, 0.0), DataType::Float);
        let b = typed_node(&mut graph, "B", Pos2::new(400.0, 0.0), DataType::Float);
        let c = typed_node(&mut graph, "C", Pos2::new(400.0, 300.0), DataType::Float);
        let out = SocketRef::output(a, "out");
        let b_in = SocketRef::input(b, "in");
        let c_in = SocketRef::input(c, "in");
        graph.connect(&out, &b_in).unwrap();

        let mut ctrl = InteractionController::default();
        let start = center(&graph, &b_in);
        press(&mut ctrl, &mut graph, start);
        assert_eq!(graph.edge_count(), 0);
        match ctrl.state() {
            InteractionState::DraggingEdge(drag) => assert_eq!(drag.pending.anchor(), &out),
            other => panic!("unexpected state {other:?}"),
        }

        let drop_at = center(&graph, &c_in);
        release(&mut ctrl, &mut graph, drop_at, Instant::now());
        let edge = graph.edges().next().unwrap();
        assert_eq!((&edge.from, &edge.to), (&out, &c_in));
    }

    #[test]
    fn test_drag_from_input_connects_backwards() {
        let mut graph = Graph::default();
        let a = typed_node(&mut graph, "A", Pos2::new(0.0, 0.0), DataType::Bool);
        let b = typed_node(&mut graph, "B", Pos2::new(400.0, 0.0), DataType::Bool);
        let mut ctrl = InteractionController::default();
        let b_in = SocketRef::input(b, "in");
        let a_out = SocketRef::output(a, "out");
        let start = center(&graph, &b_in);
        press(&mut ctrl, &mut graph, start);
        let (from, to, _) = ctrl.pending_noodle(&graph).unwrap();
        assert!(from.socket.is_none());
        assert_eq!(to.socket, Some(Direction::Input));

        let drop_at = center(&graph, &a_out);
        release(&mut ctrl, &mut graph, drop_at, Instant::now());
        let edge = graph.edges().next().unwrap();
        assert_eq!((&edge.from, &edge.to), (&a_out, &b_in));
    }

    #[test]
    fn test_node_drag_moves_whole_selection() {
        let mut graph = Graph::default();
        let a = typed_node(&mut graph, "A", Pos2::new(0.0, 0.0), DataType::Float);
        let b = typed_node(&mut graph, "B", Pos2::new(400.0, 0.0), DataType::Float);
        let mut ctrl = InteractionController::default();
        ctrl.selection.extend([a.clone(), b.clone()]);

        let grab = Pos2::new(60.0, HEADER_HEIGHT / 2.0);
        press(&mut ctrl, &mut graph, grab);
        ctrl.pointer_moved(&mut graph, grab + Vec2::new(30.0, 40.0));
        release(&mut ctrl, &mut graph, grab + Vec2::new(30.0, 40.0), Instant::now());

        assert_eq!(graph.node(&a).unwrap().position, Pos2::new(30.0, 40.0));
        assert_eq!(graph.node(&b).unwrap().position, Pos2::new(430.0, 40.0));
        assert!(ctrl.save_pending());
    }

    #[test]
    fn test_pressing_unselected_node_resets_selection() {
        let mut graph = Graph::default();
        let a = typed_node(&mut graph, "A", Pos2::new(0.0, 0.0), DataType::Float);
        let b = typed_node(&mut graph, "B", Pos2::new(400.0, 0.0), DataType::Float);
        let mut ctrl = InteractionController::default();
        ctrl.select_only(a);
        press(&mut ctrl, &mut graph, Pos2::new(460.0, HEADER_HEIGHT / 2.0));
        release(&mut ctrl, &mut graph, Pos2::new(460.0, HEADER_HEIGHT / 2.0), Instant::now());
        assert_eq!(ctrl.selection().iter().collect::<Vec<_>>(), vec![&b]);
        assert!(!ctrl.save_pending());
    }

    #[test]
    fn test_resize_is_clamped() {
        let mut graph = Graph::default();
        let a = typed_node(&mut graph, "A", Pos2::new(0.0, 0.0), DataType::Float);
        graph.node_mut(&a).unwrap().height_mode = crate::node::HeightMode::Resizable;
        let mut ctrl = InteractionController::default();
        let handle = graph.node(&a).unwrap().resize_handle_rect().unwrap().center();
        assert_eq!(ctrl.hit_test(&graph, handle), Hit::ResizeHandle(a.clone()));

        press(&mut ctrl, &mut graph, handle);
        ctrl.pointer_moved(&mut graph, handle + Vec2::new(50.0, 70.0));
        let grown = graph.node(&a).unwrap().size;
        ctrl.pointer_moved(&mut graph, handle - Vec2::new(500.0, 500.0));
        release(&mut ctrl, &mut graph, handle - Vec2::new(500.0, 500.0), Instant::now());

        let node = graph.node(&a).unwrap();
        assert_eq!(grown.x, crate::node::DEFAULT_NODE_WIDTH + 50.0);
        assert_eq!(node.size, node.min_size());
    }

    #[test]
    fn test_box_selection_modes() {
        let mut graph = Graph::default();
        let a = typed_node(&mut graph, "A", Pos2::new(0.0, 0.0), DataType::Float);
        let b = typed_node(&mut graph, "B", Pos2::new(400.0, 0.0), DataType::Float);
        let mut ctrl = InteractionController::default();
        let now = Instant::now();

        // Replace: box around A only
        press(&mut ctrl, &mut graph, Pos2::new(-50.0, -50.0));
        release(&mut ctrl, &mut graph, Pos2::new(50.0, 50.0), now);
        assert_eq!(ctrl.selection().iter().collect::<Vec<_>>(), vec![&a]);

        // Shift adds B
        ctrl.pointer_pressed(&mut graph, Pos2::new(350.0, -50.0), PointerButton::Primary, Modifiers::SHIFT);
        release(&mut ctrl, &mut graph, Pos2::new(450.0, 50.0), now);
        assert_eq!(ctrl.selection().len(), 2);

        // Ctrl subtracts A
        ctrl.pointer_pressed(&mut graph, Pos2::new(-50.0, -50.0), PointerButton::Primary, Modifiers::CTRL);
        release(&mut ctrl, &mut graph, Pos2::new(50.0, 50.0), now);
        assert_eq!(ctrl.selection().iter().collect::<Vec<_>>(), vec![&b]);

        // A tiny box clears
        press(&mut ctrl, &mut graph, Pos2::new(-50.0, -50.0));
        release(&mut ctrl, &mut graph, Pos2::new(-48.0, -47.0), now);
        assert!(ctrl.selection().is_empty());
    }

    #[test]
    fn test_middle_button_pans() {
        let mut graph = Graph::default();
        let mut ctrl = InteractionController::default();
        ctrl.pointer_pressed(&mut graph, Pos2::new(10.0, 10.0), PointerButton::Middle, Modifiers::NONE);
        ctrl.pointer_moved(&mut graph, Pos2::new(40.0, 30.0));
        ctrl.pointer_released(&mut graph, Pos2::new(40.0, 30.0), PointerButton::Middle, Instant::now());
        assert_eq!(ctrl.viewport().pan, Vec2::new(30.0, 20.0));
        assert_eq!(ctrl.state(), &InteractionState::Idle);
    }

    #[test]
    fn test_middle_click_does_not_drop_picked_up_edge() {
        let mut graph = Graph::default();
        let a = typed_node(&mut graph, "A", Pos2::new(0.0, 0.0), DataType::Float);
        let b = typed_node(&mut graph, "B", Pos2::new(400.0, 0.0), DataType::Float);
        let c = typed_node(&mut graph, "C", Pos2::new(400.0, 300.0), DataType::Float);
        let out = SocketRef::output(a, "out");
        let b_in = SocketRef::input(b, "in");
        let c_in = SocketRef::input(c, "in");
        graph.connect(&out, &b_in).unwrap();

        let mut ctrl = InteractionController::default();
        let now = Instant::now();
        let start = center(&graph, &b_in);
        press(&mut ctrl, &mut graph, start);

        ctrl.pointer_pressed(&mut graph, start, PointerButton::Middle, Modifiers::NONE);
        ctrl.pointer_released(&mut graph, start, PointerButton::Middle, now);
        assert!(matches!(ctrl.state(), InteractionState::DraggingEdge(_)));
        assert_eq!(ctrl.viewport().pan, Vec2::ZERO);

        let drop_at = center(&graph, &c_in);
        release(&mut ctrl, &mut graph, drop_at, now);
        assert_eq!(graph.edge_count(), 1);
        let edge = graph.edges().next().unwrap();
        assert_eq!((&edge.from, &edge.to), (&out, &c_in));
        assert!(ctrl.save_pending());
    }

    #[test]
    fn test_wheel_zoom_is_clamped_and_anchored() {
        let mut ctrl = InteractionController::default();
        let pointer = Pos2::new(300.0, 200.0);
        let anchor = ctrl.viewport().screen_to_graph(pointer);
        ctrl.wheel(pointer, -120.0);
        assert!((ctrl.viewport().zoom - 1.1).abs() < 1e-6);
        for _ in 0..50 {
            ctrl.wheel(pointer, -120.0);
        }
        assert_eq!(ctrl.viewport().zoom, 3.0);
        assert!((ctrl.viewport().screen_to_graph(pointer) - anchor).length() < 1e-2);
    }

    #[test]
    fn test_copy_paste_at_pointer_selects_new_nodes() {
        let mut graph = Graph::default();
        let a = typed_node(&mut graph, "A", Pos2::new(0.0, 0.0), DataType::Float);
        let mut ctrl = InteractionController::default();
        let now = Instant::now();
        ctrl.select_only(a.clone());

        assert!(ctrl.key_pressed(&mut graph, Key::C, Modifiers::CTRL, now));
        ctrl.pointer_moved(&mut graph, Pos2::new(500.0, 500.0));
        assert!(ctrl.key_pressed(&mut graph, Key::V, Modifiers::CTRL, now));

        assert_eq!(graph.node_count(), 2);
        assert_eq!(ctrl.selection().len(), 1);
        let pasted = ctrl.selection()[0].clone();
        assert_ne!(pasted, a);
        assert_eq!(graph.node(&pasted).unwrap().rect().center().x, 500.0);
    }

    #[test]
    fn test_delete_and_center_commands() {
        let mut graph = Graph::default();
        let a = typed_node(&mut graph, "A", Pos2::new(1000.0, 1000.0), DataType::Float);
        let mut ctrl = InteractionController::default();
        let now = Instant::now();

        assert!(ctrl.key_pressed(&mut graph, Key::Period, Modifiers::NONE, now));
        let bounds = graph.bounds().unwrap();
        assert!((ctrl.viewport().view_center_graph() - bounds.center()).length() < 1e-3);

        ctrl.select_only(a);
        assert!(ctrl.key_pressed(&mut graph, Key::X, Modifiers::NONE, now));
        assert_eq!(graph.node_count(), 0);
        assert!(ctrl.selection().is_empty());
        assert!(!ctrl.key_pressed(&mut graph, Key::A, Modifiers::NONE, now));
    }

    #[test]
    fn test_tick_writes_once_after_debounce() {
        let mut graph = Graph::default();
        let mut ctrl = InteractionController::default();
        let mut store = MemoryStore::new();
        let start = Instant::now();

        ctrl.add_node_at(&mut graph, None, Pos2::new(10.0, 10.0), start);
        ctrl.add_node_at(&mut graph, None, Pos2::new(300.0, 10.0), start + Duration::from_millis(50));
        assert!(!ctrl.tick(&graph, start + Duration::from_millis(100), &mut store).unwrap());
        assert!(ctrl.tick(&graph, start + Duration::from_millis(150), &mut store).unwrap());
        assert!(!ctrl.tick(&graph, start + Duration::from_millis(400), &mut store).unwrap());
        assert_eq!(store.save_count(), 1);
        assert_eq!(store.last().unwrap().nodes.len(), 2);
    }
}
