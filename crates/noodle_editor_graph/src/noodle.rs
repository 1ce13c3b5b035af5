// SPDX-License-Identifier: MIT OR Apache-2.0
//! Noodle routing: the path an edge takes between two points.
//!
//! Both committed and pending edges are routed here. An end that is attached
//! to a socket knows its direction; the free end of a pending edge follows the
//! cursor and has none. All coordinates are in graph space.

use crate::socket::Direction;
use egui::{Pos2, Rect, Vec2};
use serde::{Deserialize, Serialize};

/// Length of the straight stubs leaving a socket in linear style
const FLAT_STUB: f32 = 20.0;
/// Upper bound of the horizontal control-point offset in smooth style
const MAX_CURVE_OFFSET: f32 = 80.0;
/// Lower bound of the horizontal control-point offset in smooth style
const MIN_CURVE_OFFSET: f32 = 12.0;
/// Margin added around a noodle's bounding box
const BOUNDS_PADDING: f32 = 20.0;

/// How noodles are drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NoodleStyle {
    /// Cubic curve with horizontal tangents at the sockets
    #[default]
    Smooth,
    /// Straight segments with short flat stubs at the sockets
    Linear,
}

/// One end of a noodle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Endpoint {
    /// Position in graph space
    pub pos: Pos2,
    /// Direction of the attached socket; `None` for the cursor end
    pub socket: Option<Direction>,
}

impl Endpoint {
    /// End attached to a socket
    pub fn socket(pos: Pos2, direction: Direction) -> Self {
        Self {
            pos,
            socket: Some(direction),
        }
    }

    /// Free end following the cursor
    pub fn cursor(pos: Pos2) -> Self {
        Self { pos, socket: None }
    }

    fn is(&self, direction: Direction) -> bool {
        self.socket == Some(direction)
    }
}

/// Routed noodle geometry
#[derive(Debug, Clone, PartialEq)]
pub enum NoodlePath {
    /// Cubic bezier
    Cubic {
        /// Start point
        from: Pos2,
        /// First control point
        ctrl1: Pos2,
        /// Second control point
        ctrl2: Pos2,
        /// End point
        to: Pos2,
    },
    /// Connected straight segments
    Polyline(Vec<Pos2>),
}

impl NoodlePath {
    /// Start and end points
    pub fn endpoints(&self) -> (Pos2, Pos2) {
        match self {
            Self::Cubic { from, to, .. } => (*from, *to),
            Self::Polyline(points) => (
                points.first().copied().unwrap_or_default(),
                points.last().copied().unwrap_or_default(),
            ),
        }
    }

    /// Points along the path; curves are flattened into `segments` pieces
    pub fn sample(&self, segments: usize) -> Vec<Pos2> {
        match self {
            Self::Cubic {
                from,
                ctrl1,
                ctrl2,
                to,
            } => bezier_points(*from, *ctrl1, *ctrl2, *to, segments.max(1)),
            Self::Polyline(points) => points.clone(),
        }
    }

    /// Box around both ends, padded so stubs and curve bulges stay inside
    pub fn bounds(&self) -> Rect {
        let (from, to) = self.endpoints();
        Rect::from_two_pos(from, to).expand(BOUNDS_PADDING)
    }
}

/// Route a noodle between two ends
pub fn route(from: Endpoint, to: Endpoint, style: NoodleStyle) -> NoodlePath {
    match style {
        NoodleStyle::Smooth => route_smooth(from, to),
        NoodleStyle::Linear => route_linear(from, to),
    }
}

fn route_smooth(from: Endpoint, to: Endpoint) -> NoodlePath {
    let dx = to.pos.x - from.pos.x;
    let dist = from.pos.distance(to.pos);
    let curve_offset = (dist * 0.5).max(MIN_CURVE_OFFSET).min(MAX_CURVE_OFFSET);
    let span = (dx.abs() * 0.5).max(FLAT_STUB);
    let offset = curve_offset.min(span);

    let signed = |positive: bool| if positive { offset } else { -offset };
    let (from_out, to_in) = if from.socket.is_none() {
        (signed(to.is(Direction::Input)), signed(!to.is(Direction::Input)))
    } else if to.socket.is_none() {
        (signed(from.is(Direction::Output)), signed(from.is(Direction::Input)))
    } else {
        (signed(from.is(Direction::Output)), signed(!to.is(Direction::Input)))
    };

    let cp1x = from.pos.x + from_out;
    let mut cp2x = to.pos.x + to_in;

    // Keep backward edges between close sockets from folding over themselves
    if from.socket.is_some() && to.socket.is_some() && dx.abs() < curve_offset * 2.0 {
        if from.is(Direction::Output) && to.is(Direction::Input) && cp2x < from.pos.x {
            cp2x = from.pos.x + span;
        } else if from.is(Direction::Input) && to.is(Direction::Output) && cp2x > from.pos.x {
            cp2x = from.pos.x - span;
        }
    }

    NoodlePath::Cubic {
        from: from.pos,
        ctrl1: Pos2::new(cp1x, from.pos.y),
        ctrl2: Pos2::new(cp2x, to.pos.y),
        to: to.pos,
    }
}

fn route_linear(from: Endpoint, to: Endpoint) -> NoodlePath {
    let dist = from.pos.distance(to.pos);
    let dragging = from.socket.is_none() || to.socket.is_none();
    let stub = if dragging {
        (dist * 0.25).max(2.0).min(FLAT_STUB)
    } else {
        FLAT_STUB
    };

    let from_out = if from.is(Direction::Output) { stub } else { -stub };
    let to_in = if to.is(Direction::Input) { -stub } else { stub };

    let mut flat_from = from.socket.map(|_| from.pos + Vec2::new(from_out, 0.0));
    let mut flat_to = to.socket.map(|_| to.pos + Vec2::new(to_in, 0.0));
    if flat_from.is_none() && to.socket.is_some() {
        let dir = direction_sign(to.pos.x - from.pos.x);
        flat_from = Some(from.pos + Vec2::new(dir * stub, 0.0));
    }
    if flat_to.is_none() && from.socket.is_some() {
        let dir = direction_sign(from.pos.x - to.pos.x);
        flat_to = Some(to.pos + Vec2::new(dir * stub, 0.0));
    }

    let mut points = vec![from.pos];
    points.extend(flat_from);
    points.extend(flat_to);
    points.push(to.pos);
    NoodlePath::Polyline(points)
}

fn direction_sign(delta: f32) -> f32 {
    if delta < 0.0 {
        -1.0
    } else {
        1.0
    }
}

/// Sample a cubic bezier into `segments + 1` points
pub fn bezier_points(p0: Pos2, p1: Pos2, p2: Pos2, p3: Pos2, segments: usize) -> Vec<Pos2> {
    let mut points = Vec::with_capacity(segments + 1);
    for i in 0..=segments {
        let t = i as f32 / segments as f32;
        let mt = 1.0 - t;
        let a = mt * mt * mt;
        let b = 3.0 * mt * mt * t;
        let c = 3.0 * mt * t * t;
        let d = t * t * t;
        points.push(Pos2::new(
            a * p0.x + b * p1.x + c * p2.x + d * p3.x,
            a * p0.y + b * p1.y + c * p2.y + d * p3.y,
        ));
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smooth_forward_edge() {
        let path = route(
            Endpoint::socket(Pos2::new(0.0, 0.0), Direction::Output),
            Endpoint::socket(Pos2::new(300.0, 0.0), Direction::Input),
            NoodleStyle::Smooth,
        );
        let NoodlePath::Cubic { ctrl1, ctrl2, .. } = path else {
            panic!("expected a curve");
        };
        assert_eq!(ctrl1, Pos2::new(80.0, 0.0));
        assert_eq!(ctrl2, Pos2::new(220.0, 0.0));
    }

    #[test]
    fn test_smooth_backward_edge_is_unfolded() {
        // Output to the right of the input it feeds, close together
        let from = Endpoint::socket(Pos2::new(100.0, 0.0), Direction::Output);
        let to = Endpoint::socket(Pos2::new(60.0, 60.0), Direction::Input);
        let NoodlePath::Cubic { ctrl2, .. } = route(from, to, NoodleStyle::Smooth) else {
            panic!("expected a curve");
        };
        assert_eq!(ctrl2.x, 100.0 + FLAT_STUB);
    }

    #[test]
    fn test_smooth_pending_from_input() {
        let from = Endpoint::cursor(Pos2::new(0.0, 0.0));
        let to = Endpoint::socket(Pos2::new(200.0, 0.0), Direction::Input);
        let NoodlePath::Cubic { ctrl1, ctrl2, .. } = route(from, to, NoodleStyle::Smooth) else {
            panic!("expected a curve");
        };
        assert!(ctrl1.x > 0.0);
        assert!(ctrl2.x < 200.0);
    }

    #[test]
    fn test_linear_committed_has_two_stubs() {
        let path = route(
            Endpoint::socket(Pos2::new(0.0, 0.0), Direction::Output),
            Endpoint::socket(Pos2::new(200.0, 50.0), Direction::Input),
            NoodleStyle::Linear,
        );
        assert_eq!(
            path,
            NoodlePath::Polyline(vec![
                Pos2::new(0.0, 0.0),
                Pos2::new(20.0, 0.0),
                Pos2::new(180.0, 50.0),
                Pos2::new(200.0, 50.0),
            ])
        );
    }

    #[test]
    fn test_linear_dragging_shortens_stubs() {
        let path = route(
            Endpoint::socket(Pos2::new(0.0, 0.0), Direction::Output),
            Endpoint::cursor(Pos2::new(20.0, 0.0)),
            NoodleStyle::Linear,
        );
        let points = path.sample(8);
        assert_eq!(points.len(), 4);
        assert_eq!(points[1], Pos2::new(5.0, 0.0));
        assert_eq!(points[2], Pos2::new(15.0, 0.0));
    }

    #[test]
    fn test_sample_hits_endpoints_and_bounds_pad() {
        let path = route(
            Endpoint::socket(Pos2::new(0.0, 0.0), Direction::Output),
            Endpoint::socket(Pos2::new(100.0, 40.0), Direction::Input),
            NoodleStyle::Smooth,
        );
        let points = path.sample(16);
        assert_eq!(points.len(), 17);
        assert_eq!(points[0], Pos2::new(0.0, 0.0));
        assert!((points[16] - Pos2::new(100.0, 40.0)).length() < 1e-3);
        assert_eq!(path.bounds(), Rect::from_min_max(Pos2::new(-20.0, -20.0), Pos2::new(120.0, 60.0)));
    }
}
