// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pan/zoom transform between canvas-local screen space and graph space.

use egui::{Pos2, Rect, Vec2};

/// Pan and zoom of the canvas.
///
/// Screen positions are relative to the canvas' top-left corner:
/// `screen = graph * zoom + pan`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Screen offset of the graph origin
    pub pan: Vec2,
    /// Scale factor
    pub zoom: f32,
    /// Size of the visible canvas
    pub canvas_size: Vec2,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            pan: Vec2::ZERO,
            zoom: 1.0,
            canvas_size: Vec2::new(800.0, 600.0),
        }
    }
}

impl Viewport {
    /// Convert a canvas-local position into graph space
    pub fn screen_to_graph(&self, screen: Pos2) -> Pos2 {
        ((screen.to_vec2() - self.pan) / self.zoom).to_pos2()
    }

    /// Convert a graph position into canvas-local space
    pub fn graph_to_screen(&self, graph: Pos2) -> Pos2 {
        (graph.to_vec2() * self.zoom + self.pan).to_pos2()
    }

    /// Convert a graph rectangle into canvas-local space
    pub fn graph_rect_to_screen(&self, rect: Rect) -> Rect {
        Rect::from_min_max(self.graph_to_screen(rect.min), self.graph_to_screen(rect.max))
    }

    /// Scale by `factor` while keeping the graph point under `screen` fixed
    pub fn zoom_at(&mut self, screen: Pos2, factor: f32, min: f32, max: f32) {
        let anchor = self.screen_to_graph(screen);
        let zoom = (self.zoom * factor).clamp(min, max);
        self.pan = screen.to_vec2() - anchor.to_vec2() * zoom;
        self.zoom = zoom;
    }

    /// Pan so the centre of `rect` sits in the middle of the canvas
    pub fn center_on(&mut self, rect: Rect) {
        self.pan = self.canvas_size / 2.0 - rect.center().to_vec2() * self.zoom;
    }

    /// Graph position shown at the middle of the canvas
    pub fn view_center_graph(&self) -> Pos2 {
        self.screen_to_graph((self.canvas_size / 2.0).to_pos2())
    }
}
