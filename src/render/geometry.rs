//! Shared geometry for marker and break path rendering
//!
//! Used both by overlay renderers working in view/display space and by the
//! tiny-skia export working in image pixels.

use serde::{Deserialize, Serialize};

use crate::domain::Point;

/// Marker geometry constants
pub mod marker {
    /// Marker circle radius in logical pixels; doubles as the touch hit radius
    pub const RADIUS: f32 = 18.0;
    /// Outline thickness in logical pixels
    pub const OUTLINE: f32 = 3.0;
}

/// Break path geometry constants
pub mod path {
    /// Default sideways bulge as a fraction of the ball-to-hole distance
    pub const BREAK_FRACTION: f32 = 0.15;
    /// Default stroke thickness in logical pixels
    pub const THICKNESS: f32 = 4.0;
    /// Shadow/outline thickness offset in logical pixels
    pub const OUTLINE: f32 = 2.0;
}

/// Quadratic curve from ball to hole through a sideways control point
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BreakPath {
    pub start: Point,
    pub control: Point,
    pub end: Point,
}

impl BreakPath {
    /// Build the curve for `ball -> hole`.
    ///
    /// The control point sits at the chord midpoint, pushed perpendicular to
    /// the chord by `fraction * |hole - ball|`. Coincident endpoints give a
    /// zero-length path with every point equal to `ball`; a chord too long
    /// to measure gets no bulge but still ends at `hole`.
    pub fn new(ball: Point, hole: Point, fraction: f32) -> Self {
        let dx = hole.x - ball.x;
        let dy = hole.y - ball.y;
        let length = dx.hypot(dy);
        if length == 0.0 || !length.is_finite() {
            // No usable chord: straight line, or a point when coincident
            return Self {
                start: ball,
                control: ball.lerp(hole, 0.5),
                end: hole,
            };
        }

        let mid = ball.lerp(hole, 0.5);
        // Unit perpendicular (dy, -dx) / len, scaled by len * fraction
        let nx = dy / length;
        let ny = -dx / length;
        let bulge = length * fraction;

        Self {
            start: ball,
            control: Point::new(mid.x + nx * bulge, mid.y + ny * bulge),
            end: hole,
        }
    }

    /// Chord length between the endpoints
    pub fn length(&self) -> f32 {
        self.start.distance(self.end)
    }

    pub fn is_degenerate(&self) -> bool {
        self.length() == 0.0
    }

    /// Displacement of the control point from the chord midpoint
    pub fn offset(&self) -> Point {
        let mid = self.start.lerp(self.end, 0.5);
        Point::new(self.control.x - mid.x, self.control.y - mid.y)
    }

    /// Evaluate the curve at `t` in `[0, 1]`
    pub fn point_at(&self, t: f32) -> Point {
        let a = self.start.lerp(self.control, t);
        let b = self.control.lerp(self.end, t);
        a.lerp(b, t)
    }

    /// Flatten into `segments + 1` points, endpoints included
    pub fn polyline(&self, segments: usize) -> Vec<Point> {
        if self.is_degenerate() || segments == 0 {
            return vec![self.start];
        }
        (0..=segments)
            .map(|i| self.point_at(i as f32 / segments as f32))
            .collect()
    }
}

/// Radius and outline of a marker at a given logical-to-pixel scale
#[inline]
pub fn marker_radius(scale: f32) -> (f32, f32) {
    (
        (marker::RADIUS * scale).max(2.0),
        (marker::OUTLINE * scale).max(1.0),
    )
}
