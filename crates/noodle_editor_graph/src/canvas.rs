// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph canvas widget for egui.
//!
//! Features:
//! - Grid, nodes, sockets and noodles drawn through the current viewport
//! - Node widgets hosted inside node bodies, with auto-fit heights
//! - Raw egui events forwarded to the [`InteractionController`]
//! - Context menus for node creation and deletion
//! - Status line with graph counters and the latest log event
//! - Debounced autosave into an attached [`GraphStore`]

use crate::compat::{noodle_coloring, NoodleColoring};
use crate::graph::Graph;
use crate::interaction::{Hit, InteractionController, InteractionState};
use crate::log_sink::LogEvent;
use crate::node::{Node, NodeId, RESIZE_HANDLE_SIZE, SOCKET_RADIUS};
use crate::noodle::{route, Endpoint};
use crate::persistence::GraphStore;
use crate::registry::WidgetEvent;
use crate::settings::{EditorSettings, SettingsError};
use crate::socket::{Direction, SocketRef};
use egui::{Color32, Pos2, Rect, Stroke, Vec2};
use std::fmt;
use std::path::Path;
use std::sync::mpsc;
use std::time::Instant;

const NODE_ROUNDING: f32 = 6.0;
const NODE_SHADOW_OFFSET: f32 = 3.0;
const NOODLE_THICKNESS: f32 = 2.5;
const NOODLE_SEGMENTS: usize = 32;
const GRID_SPACING: f32 = 20.0;
const SOCKET_LABEL_PADDING: f32 = 12.0;
const DISPLAY_LINE_HEIGHT: f32 = 14.0;
/// Below this zoom node widgets are hidden and heights are left alone
const MIN_WIDGET_ZOOM: f32 = 0.5;

/// What happened during one frame of the canvas
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CanvasResponse {
    /// The graph was edited; hosts typically re-execute
    pub changed: bool,
}

/// Interactive graph view
pub struct GraphCanvas {
    controller: InteractionController,
    /// Draw the background grid
    pub show_grid: bool,
    store: Option<Box<dyn GraphStore>>,
    log_receiver: Option<mpsc::Receiver<LogEvent>>,
    last_log: Option<LogEvent>,
    menu_origin: Option<Pos2>,
}

impl fmt::Debug for GraphCanvas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphCanvas")
            .field("controller", &self.controller)
            .field("show_grid", &self.show_grid)
            .field("store", &self.store.is_some())
            .field("last_log", &self.last_log)
            .finish_non_exhaustive()
    }
}

impl Default for GraphCanvas {
    fn default() -> Self {
        Self::new(InteractionController::default())
    }
}

impl GraphCanvas {
    /// Create a canvas driven by a controller
    pub fn new(controller: InteractionController) -> Self {
        Self {
            controller,
            show_grid: true,
            store: None,
            log_receiver: None,
            last_log: None,
            menu_origin: None,
        }
    }

    /// Persist edits into `store` once the autosave delay has passed
    pub fn with_store(mut self, store: impl GraphStore + 'static) -> Self {
        self.store = Some(Box::new(store));
        self
    }

    /// Apply settings from a RON file; a missing file means defaults
    pub fn load_settings(&mut self, path: &Path) -> Result<(), SettingsError> {
        let settings = EditorSettings::load(path)?;
        tracing::info!("Loaded editor settings from {}", path.display());
        self.controller.set_settings(settings);
        Ok(())
    }

    /// Write the active settings as RON
    pub fn save_settings(&self, path: &Path) -> Result<(), SettingsError> {
        self.controller.settings().save(path)
    }

    /// Show the newest event from a [`crate::log_sink::LogSinkLayer`] in the status line
    pub fn with_log_receiver(mut self, receiver: mpsc::Receiver<LogEvent>) -> Self {
        self.log_receiver = Some(receiver);
        self
    }

    /// Interaction state
    pub fn controller(&self) -> &InteractionController {
        &self.controller
    }

    /// Mutable interaction state
    pub fn controller_mut(&mut self) -> &mut InteractionController {
        &mut self.controller
    }

    /// Render the canvas into the remaining space of `ui`
    pub fn show(&mut self, ui: &mut egui::Ui, graph: &mut Graph) -> CanvasResponse {
        let now = Instant::now();
        let rect = ui.available_rect_before_wrap();
        let response = ui.allocate_rect(rect, egui::Sense::click_and_drag());
        let painter = ui.painter_at(rect);
        self.controller.viewport_mut().canvas_size = rect.size();
        self.controller.sync_selection(graph);

        if let Some(receiver) = &self.log_receiver {
            if let Some(event) = receiver.try_iter().last() {
                self.last_log = Some(event);
            }
        }

        if self.show_grid {
            self.draw_grid(&painter, rect);
        }

        self.handle_input(ui, rect, graph, now);
        self.handle_context_menu(&response, rect, graph, now);

        self.draw_edges(&painter, rect, graph);
        self.draw_pending_edge(&painter, rect, graph);
        self.draw_nodes(ui, &painter, rect, graph, now);

        if let Some(selection) = self.controller.selection_rect() {
            let screen = self.rect_to_screen(rect, selection);
            painter.rect_filled(screen, 0.0, Color32::from_rgba_unmultiplied(100, 150, 255, 30));
            painter.rect_stroke(screen, 0.0, Stroke::new(1.0, Color32::from_rgb(100, 150, 255)));
        }

        self.draw_status_bar(&painter, rect, graph);

        if let Some(store) = self.store.as_deref_mut() {
            if let Err(err) = self.controller.tick(graph, now, store) {
                tracing::warn!("Autosave failed: {}", err);
            }
        }
        if self.controller.save_pending() {
            ui.ctx().request_repaint_after(self.controller.settings().autosave_delay());
        }
        CanvasResponse {
            changed: self.controller.take_graph_changed(),
        }
    }

    fn to_screen(&self, rect: Rect, pos: Pos2) -> Pos2 {
        rect.min + self.controller.viewport().graph_to_screen(pos).to_vec2()
    }

    fn rect_to_screen(&self, rect: Rect, graph_rect: Rect) -> Rect {
        self.controller
            .viewport()
            .graph_rect_to_screen(graph_rect)
            .translate(rect.min.to_vec2())
    }

    fn to_local(rect: Rect, pos: Pos2) -> Pos2 {
        (pos - rect.min).to_pos2()
    }

    fn handle_input(&mut self, ui: &egui::Ui, rect: Rect, graph: &mut Graph, now: Instant) {
        let events = ui.input(|i| i.events.clone());
        let hover = ui.input(|i| i.pointer.hover_pos());
        let keyboard_free = !ui.ctx().wants_keyboard_input();
        let over_popup = ui.ctx().is_pointer_over_area();

        for event in events {
            match event {
                egui::Event::PointerMoved(pos) => {
                    if rect.contains(pos) || *self.controller.state() != InteractionState::Idle {
                        self.controller.pointer_moved(graph, Self::to_local(rect, pos));
                    }
                }
                egui::Event::PointerButton {
                    pos,
                    button,
                    pressed: true,
                    modifiers,
                } => {
                    if rect.contains(pos) && !over_popup {
                        self.controller
                            .pointer_pressed(graph, Self::to_local(rect, pos), button, modifiers);
                    }
                }
                egui::Event::PointerButton {
                    pos,
                    button,
                    pressed: false,
                    ..
                } => {
                    self.controller
                        .pointer_released(graph, Self::to_local(rect, pos), button, now);
                }
                egui::Event::MouseWheel { delta, .. } => {
                    if let Some(pos) = hover.filter(|p| rect.contains(*p) && !over_popup) {
                        // egui reports wheel-up as positive; the controller expects the DOM sign
                        self.controller.wheel(Self::to_local(rect, pos), -delta.y);
                    }
                }
                egui::Event::Key {
                    key,
                    pressed: true,
                    modifiers,
                    ..
                } if keyboard_free => {
                    self.controller.key_pressed(graph, key, modifiers, now);
                }
                _ => {}
            }
        }
    }

    fn handle_context_menu(&mut self, response: &egui::Response, rect: Rect, graph: &mut Graph, now: Instant) {
        if response.secondary_clicked() {
            if let Some(pos) = response.interact_pointer_pos() {
                let local = Self::to_local(rect, pos);
                let at = self.controller.viewport().screen_to_graph(local);
                if let Some(node) = node_of_hit(self.controller.hit_test(graph, at)) {
                    if !self.controller.is_selected(&node) {
                        self.controller.select_only(node);
                    }
                }
                self.menu_origin = Some(local);
            }
        }

        response.context_menu(|ui| self.context_menu_ui(ui, graph, now));
    }

    fn context_menu_ui(&mut self, ui: &mut egui::Ui, graph: &mut Graph, now: Instant) {
        let Some(origin) = self.menu_origin else {
            ui.close_menu();
            return;
        };
        let at = self.controller.viewport().screen_to_graph(origin);

        if node_of_hit(self.controller.hit_test(graph, at)).is_some() {
            if ui.button("Delete").clicked() {
                self.controller.delete_selection(graph, now);
                ui.close_menu();
            }
            return;
        }

        ui.label("Add node");
        ui.separator();
        let registry = graph.registry().clone();
        for node_type in registry.types() {
            if ui.button(&node_type.title).clicked() {
                self.controller.add_node_at(graph, Some(&node_type.id), origin, now);
                ui.close_menu();
            }
        }
        if ui.button("Generic Node").clicked() {
            self.controller.add_node_at(graph, None, origin, now);
            ui.close_menu();
        }
    }

    fn draw_grid(&self, painter: &egui::Painter, rect: Rect) {
        let viewport = self.controller.viewport();
        let spacing = GRID_SPACING * viewport.zoom;
        if spacing < 4.0 {
            return;
        }

        let minor = Stroke::new(1.0, Color32::from_rgba_unmultiplied(60, 60, 60, 100));
        let major = Stroke::new(1.0, Color32::from_rgba_unmultiplied(80, 80, 80, 150));
        let origin = rect.min + viewport.pan;

        // Every fifth line is a major line
        let mut x = rect.left() + (origin.x - rect.left()).rem_euclid(spacing);
        while x < rect.right() {
            let index = ((x - origin.x) / spacing).round() as i64;
            let stroke = if index % 5 == 0 { major } else { minor };
            painter.line_segment([Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())], stroke);
            x += spacing;
        }

        let mut y = rect.top() + (origin.y - rect.top()).rem_euclid(spacing);
        while y < rect.bottom() {
            let index = ((y - origin.y) / spacing).round() as i64;
            let stroke = if index % 5 == 0 { major } else { minor };
            painter.line_segment([Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)], stroke);
            y += spacing;
        }
    }

    fn draw_edges(&self, painter: &egui::Painter, rect: Rect, graph: &Graph) {
        for edge in graph.edges() {
            let (Some(from), Some(to)) = (socket_endpoint(graph, &edge.from), socket_endpoint(graph, &edge.to)) else {
                continue;
            };
            let coloring = noodle_coloring(
                graph.socket(&edge.from).map(|s| s.data_type),
                graph.socket(&edge.to).map(|s| s.data_type),
            );
            self.draw_noodle(painter, rect, from, to, coloring);
        }
    }

    fn draw_pending_edge(&self, painter: &egui::Painter, rect: Rect, graph: &Graph) {
        if let Some((from, to, coloring)) = self.controller.pending_noodle(graph) {
            self.draw_noodle(painter, rect, from, to, coloring);
        }
    }

    fn draw_noodle(&self, painter: &egui::Painter, rect: Rect, from: Endpoint, to: Endpoint, coloring: NoodleColoring) {
        let path = route(from, to, self.controller.settings().noodle_style);
        let points: Vec<Pos2> = path
            .sample(NOODLE_SEGMENTS)
            .into_iter()
            .map(|p| self.to_screen(rect, p))
            .collect();
        let width = NOODLE_THICKNESS * self.controller.viewport().zoom;

        match coloring {
            NoodleColoring::Flat(color) => {
                painter.add(egui::Shape::line(points, Stroke::new(width, rgb(color))));
            }
            NoodleColoring::Gradient(start, end) => {
                let segments = points.len().saturating_sub(1).max(1) as f32;
                for (i, pair) in points.windows(2).enumerate() {
                    let t = (i as f32 + 0.5) / segments;
                    painter.line_segment([pair[0], pair[1]], Stroke::new(width, mix(start, end, t)));
                }
            }
        }
    }

    fn draw_nodes(&mut self, ui: &mut egui::Ui, painter: &egui::Painter, rect: Rect, graph: &mut Graph, now: Instant) {
        let hover = ui.input(|i| i.pointer.hover_pos());
        let ids: Vec<NodeId> = graph.node_ids().cloned().collect();

        for id in ids {
            let Some(node) = graph.node(&id) else {
                continue;
            };
            let node_rect = node.rect();
            let screen_rect = self.rect_to_screen(rect, node_rect);
            if !screen_rect.intersects(rect) {
                continue;
            }

            self.draw_node_frame(painter, node, screen_rect);
            self.draw_sockets(painter, rect, node, hover);

            let widget_height = self.show_node_widget(ui, rect, graph, &id, now);
            let Some(node) = graph.node_mut(&id) else {
                continue;
            };
            let display_height = node
                .display()
                .map_or(0.0, |text| text.lines().count().max(1) as f32 * DISPLAY_LINE_HEIGHT);
            if let Some(widget_height) = widget_height {
                node.fit_to_content(widget_height + display_height);
            }
            if let Some(text) = node.display() {
                let zoom = self.controller.viewport().zoom;
                let top = node.content_rect().left_top() + Vec2::new(0.0, widget_height.unwrap_or(0.0));
                painter.text(
                    self.to_screen(rect, top),
                    egui::Align2::LEFT_TOP,
                    text,
                    egui::FontId::monospace(11.0 * zoom),
                    Color32::from_gray(210),
                );
            }
        }
    }

    fn draw_node_frame(&self, painter: &egui::Painter, node: &Node, screen_rect: Rect) {
        let zoom = self.controller.viewport().zoom;
        let selected = self.controller.is_selected(&node.id);

        let shadow_rect = screen_rect.translate(Vec2::splat(NODE_SHADOW_OFFSET));
        painter.rect_filled(shadow_rect, NODE_ROUNDING * zoom, Color32::from_rgba_unmultiplied(0, 0, 0, 60));

        let background = if selected {
            Color32::from_rgb(60, 70, 90)
        } else {
            Color32::from_rgb(45, 45, 48)
        };
        painter.rect_filled(screen_rect, NODE_ROUNDING * zoom, background);

        let header_rect = Rect::from_min_size(screen_rect.min, Vec2::new(screen_rect.width(), node.header_rect().height() * zoom));
        painter.rect_filled(
            header_rect,
            egui::Rounding {
                nw: NODE_ROUNDING * zoom,
                ne: NODE_ROUNDING * zoom,
                sw: 0.0,
                se: 0.0,
            },
            Color32::from_rgb(70, 100, 130),
        );
        painter.text(
            header_rect.center(),
            egui::Align2::CENTER_CENTER,
            &node.title,
            egui::FontId::proportional(12.0 * zoom),
            Color32::WHITE,
        );

        if node.is_resizable() {
            let grip = Rect::from_min_max(screen_rect.max - Vec2::splat(RESIZE_HANDLE_SIZE * zoom), screen_rect.max);
            let stroke = Stroke::new(1.0, Color32::from_gray(120));
            painter.line_segment([grip.left_bottom(), grip.right_top()], stroke);
            painter.line_segment([grip.center_bottom(), grip.right_center()], stroke);
        }

        if selected {
            painter.rect_stroke(screen_rect, NODE_ROUNDING * zoom, Stroke::new(2.0, Color32::from_rgb(100, 150, 255)));
        }
    }

    fn draw_sockets(&self, painter: &egui::Painter, rect: Rect, node: &Node, hover: Option<Pos2>) {
        let zoom = self.controller.viewport().zoom;
        let radius = SOCKET_RADIUS * zoom;
        let snap = match self.controller.state() {
            InteractionState::DraggingEdge(drag) => drag.snap.as_ref(),
            _ => None,
        };

        for direction in [Direction::Input, Direction::Output] {
            for socket in node.sockets(direction) {
                let Some(center) = node.socket_center(direction, &socket.id) else {
                    continue;
                };
                let center = self.to_screen(rect, center);
                let color = rgb(socket.data_type.color());
                let hovered = hover.is_some_and(|p| p.distance(center) < radius * 1.5);
                painter.circle_filled(center, if hovered { radius * 1.3 } else { radius }, color);
                painter.circle_stroke(center, radius, Stroke::new(1.0, Color32::from_gray(30)));

                let is_snap_target = snap.is_some_and(|s| {
                    s.node == node.id && s.direction == direction && s.socket == socket.id
                });
                if is_snap_target {
                    painter.circle_stroke(center, radius * 1.8, Stroke::new(2.0, Color32::WHITE));
                }

                let label = if socket.label.is_empty() {
                    socket.id.as_str()
                } else {
                    socket.label.as_str()
                };
                let (offset, align) = match direction {
                    Direction::Input => (SOCKET_LABEL_PADDING * zoom, egui::Align2::LEFT_CENTER),
                    Direction::Output => (-SOCKET_LABEL_PADDING * zoom, egui::Align2::RIGHT_CENTER),
                };
                painter.text(
                    center + Vec2::new(offset, 0.0),
                    align,
                    label,
                    egui::FontId::proportional(10.0 * zoom),
                    Color32::from_gray(200),
                );
            }
        }
    }

    /// Run a node's widget; returns its height in graph units when it was shown
    fn show_node_widget(&mut self, ui: &mut egui::Ui, rect: Rect, graph: &mut Graph, id: &NodeId, now: Instant) -> Option<f32> {
        let zoom = self.controller.viewport().zoom;
        let node = graph.node(id)?;
        let Some(widget) = node.behavior().widget.clone() else {
            return Some(0.0);
        };
        if zoom < MIN_WIDGET_ZOOM {
            return None;
        }

        let content = node.content_rect();
        let top_left = self.to_screen(rect, content.min);
        let max_rect = Rect::from_min_size(top_left, Vec2::new(content.width() * zoom, rect.height()));
        let clip = rect.intersect(self.rect_to_screen(rect, node.rect()));

        let node = graph.node_mut(id)?;
        let mut child = ui.new_child(egui::UiBuilder::new().id_salt(id.as_str()).max_rect(max_rect));
        child.set_clip_rect(clip);
        let event = widget(&mut child, &mut node.state);
        let height = child.min_rect().height() / zoom;

        match event {
            WidgetEvent::None => {}
            WidgetEvent::Changed => self.controller.notify_graph_changed(now),
            WidgetEvent::OutputTypeChanged { socket, data_type } => {
                let output = SocketRef::output(id.clone(), socket);
                if let Err(err) = graph.set_output_type(&output, data_type) {
                    tracing::warn!("Could not retype {}: {}", output, err);
                }
                self.controller.notify_graph_changed(now);
            }
        }
        Some(height)
    }

    fn draw_status_bar(&self, painter: &egui::Painter, rect: Rect, graph: &Graph) {
        let left = Pos2::new(rect.left() + 5.0, rect.bottom() - 11.0);
        painter.text(
            left,
            egui::Align2::LEFT_CENTER,
            format!(
                "Nodes: {} | Edges: {} | Zoom: {:.0}% | Selected: {}",
                graph.node_count(),
                graph.edge_count(),
                self.controller.viewport().zoom * 100.0,
                self.controller.selection().len(),
            ),
            egui::FontId::proportional(11.0),
            Color32::from_gray(150),
        );

        if let Some(event) = &self.last_log {
            painter.text(
                Pos2::new(rect.right() - 5.0, rect.bottom() - 11.0),
                egui::Align2::RIGHT_CENTER,
                event.format_line(),
                egui::FontId::monospace(11.0),
                event.level.color(),
            );
        }
    }
}

fn node_of_hit(hit: Hit) -> Option<NodeId> {
    match hit {
        Hit::Canvas => None,
        Hit::Socket(socket) => Some(socket.node),
        Hit::ResizeHandle(node) | Hit::Widget(node) | Hit::Node(node) => Some(node),
    }
}

fn socket_endpoint(graph: &Graph, socket: &SocketRef) -> Option<Endpoint> {
    let center = graph.node(&socket.node)?.socket_center(socket.direction, &socket.socket)?;
    Some(Endpoint::socket(center, socket.direction))
}

fn rgb([r, g, b]: [u8; 3]) -> Color32 {
    Color32::from_rgb(r, g, b)
}

fn mix(from: [u8; 3], to: [u8; 3], t: f32) -> Color32 {
    let channel = |a: u8, b: u8| (f32::from(a) + (f32::from(b) - f32::from(a)) * t).round() as u8;
    Color32::from_rgb(channel(from[0], to[0]), channel(from[1], to[1]), channel(from[2], to[2]))
}
