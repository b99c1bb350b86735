//! Coordinate spaces and the single conversion between them
//!
//! A point is only meaningful together with the space it was measured in.
//! Spaces are immutable snapshots: a resized surface yields a new
//! [`CoordinateSpace`] value, so a point recorded against the old one is
//! never silently reinterpreted.

use serde::{Deserialize, Serialize};

use crate::error::GeometryError;

/// A 2D position in pixels
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance(self, other: Point) -> f32 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// Linear interpolation, `t = 0` is `self`, `t = 1` is `other`
    pub fn lerp(self, other: Point, t: f32) -> Point {
        Point {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Which surface a coordinate space describes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpaceKind {
    /// The visible capture/preview surface
    View,
    /// Intrinsic pixels of the captured still image
    Image,
    /// Surface used to review an already-captured image
    Display,
}

/// Pixel dimensions of one surface, tagged with its kind
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CoordinateSpace {
    pub kind: SpaceKind,
    pub width: f32,
    pub height: f32,
}

impl CoordinateSpace {
    pub fn new(kind: SpaceKind, width: f32, height: f32) -> Self {
        Self {
            kind,
            width,
            height,
        }
    }

    pub fn view(width: f32, height: f32) -> Self {
        Self::new(SpaceKind::View, width, height)
    }

    pub fn image(width: f32, height: f32) -> Self {
        Self::new(SpaceKind::Image, width, height)
    }

    pub fn display(width: f32, height: f32) -> Self {
        Self::new(SpaceKind::Display, width, height)
    }

    /// Zero, negative or non-finite dimensions cannot be scaled from or to
    pub fn is_degenerate(&self) -> bool {
        !(self.width.is_finite() && self.height.is_finite())
            || self.width <= 0.0
            || self.height <= 0.0
    }

    /// Check whether a point lies inside `[0, width) x [0, height)`
    pub fn contains(&self, point: Point) -> bool {
        point.x >= 0.0 && point.x < self.width && point.y >= 0.0 && point.y < self.height
    }

    /// Per-axis scale factors that map this space onto `target`
    pub fn scale_to(&self, target: &CoordinateSpace) -> Result<(f32, f32), GeometryError> {
        if self.is_degenerate() || target.is_degenerate() {
            return Err(GeometryError::DegenerateSpace {
                from: *self,
                to: *target,
            });
        }
        Ok((target.width / self.width, target.height / self.height))
    }
}

/// Convert a point between two spaces by independent linear x/y scaling.
///
/// Results outside the target bounds are allowed. Degenerate spaces are
/// rejected rather than producing infinities; callers keep their previous
/// value in that case.
pub fn convert(
    point: Point,
    from: &CoordinateSpace,
    to: &CoordinateSpace,
) -> Result<Point, GeometryError> {
    let (sx, sy) = from.scale_to(to)?;
    Ok(Point {
        x: point.x * sx,
        y: point.y * sy,
    })
}

/// A point together with the space it is expressed in
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaggedPoint {
    pub point: Point,
    pub space: CoordinateSpace,
}

impl TaggedPoint {
    pub fn new(point: Point, space: CoordinateSpace) -> Self {
        Self { point, space }
    }

    /// Re-express this point in `target`
    pub fn to(&self, target: &CoordinateSpace) -> Result<TaggedPoint, GeometryError> {
        let point = convert(self.point, &self.space, target)?;
        Ok(TaggedPoint {
            point,
            space: *target,
        })
    }
}
