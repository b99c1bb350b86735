//! Ball and hole markers
//!
//! Markers live in exactly one authoritative space at a time. Before a still
//! frame exists each marker keeps the view space it was tapped in; capturing
//! migrates both into the image space once, and from then on every
//! placement or move is converted into image space on entry.

use serde::{Deserialize, Serialize};

use super::geometry::{CoordinateSpace, Point, TaggedPoint};
use crate::error::{GeometryError, StoreError};

/// The two semantic markers, in placement order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarkerKind {
    Ball,
    Hole,
}

impl MarkerKind {
    pub fn label(self) -> &'static str {
        match self {
            MarkerKind::Ball => "ball",
            MarkerKind::Hole => "hole",
        }
    }
}

/// Ball and hole positions, each optionally present
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarkerSet<P = Point> {
    pub ball: Option<P>,
    pub hole: Option<P>,
}

impl<P> Default for MarkerSet<P> {
    fn default() -> Self {
        Self {
            ball: None,
            hole: None,
        }
    }
}

impl<P: Copy> MarkerSet<P> {
    pub fn get(&self, kind: MarkerKind) -> Option<P> {
        match kind {
            MarkerKind::Ball => self.ball,
            MarkerKind::Hole => self.hole,
        }
    }

    fn slot(&mut self, kind: MarkerKind) -> &mut Option<P> {
        match kind {
            MarkerKind::Ball => &mut self.ball,
            MarkerKind::Hole => &mut self.hole,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ball.is_none() && self.hole.is_none()
    }

    pub fn is_complete(&self) -> bool {
        self.ball.is_some() && self.hole.is_some()
    }

    /// Both points, if both are set
    pub fn pair(&self) -> Option<(P, P)> {
        Some((self.ball?, self.hole?))
    }

    /// Iterate over the markers that are set
    pub fn iter(&self) -> impl Iterator<Item = (MarkerKind, P)> + '_ {
        [MarkerKind::Ball, MarkerKind::Hole]
            .into_iter()
            .filter_map(|kind| self.get(kind).map(|p| (kind, p)))
    }
}

/// Which representation is currently authoritative
#[derive(Clone, Copy, Debug, Default, PartialEq)]
enum Phase {
    /// Live placement: each marker keeps its own tap-time view space
    #[default]
    Live,
    /// A still frame exists; all markers are in this image space
    Image(CoordinateSpace),
}

/// Canonical storage for the two markers
#[derive(Clone, Debug, Default)]
pub struct MarkerStore {
    markers: MarkerSet<TaggedPoint>,
    phase: Phase,
    dragging: Option<MarkerKind>,
}

impl MarkerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Markers in their canonical representation
    pub fn markers(&self) -> &MarkerSet<TaggedPoint> {
        &self.markers
    }

    /// Image space once markers have been migrated
    pub fn image_space(&self) -> Option<CoordinateSpace> {
        match self.phase {
            Phase::Live => None,
            Phase::Image(space) => Some(space),
        }
    }

    pub fn dragging(&self) -> Option<MarkerKind> {
        self.dragging
    }

    pub fn is_complete(&self) -> bool {
        self.markers.is_complete()
    }

    /// Bring a point into the canonical space of the current phase
    fn canonicalize(&self, point: TaggedPoint) -> Result<TaggedPoint, GeometryError> {
        match self.phase {
            Phase::Image(image) => point.to(&image),
            Phase::Live => Ok(point),
        }
    }

    /// Place the next unset marker (ball first, then hole).
    ///
    /// Returns the marker that was set, or `None` when both already exist or
    /// a drag is in progress.
    pub fn place(&mut self, point: TaggedPoint) -> Result<Option<MarkerKind>, StoreError> {
        if let Some(kind) = self.dragging {
            log::debug!("Ignoring placement while dragging {}", kind.label());
            return Ok(None);
        }
        let kind = match (self.markers.ball, self.markers.hole) {
            (None, _) => MarkerKind::Ball,
            (Some(_), None) => MarkerKind::Hole,
            (Some(_), Some(_)) => return Ok(None),
        };
        let point = self.canonicalize(point)?;
        *self.markers.slot(kind) = Some(point);
        log::debug!(
            "Placed {} at ({:.1}, {:.1}) in {:?} space",
            kind.label(),
            point.point.x,
            point.point.y,
            point.space.kind
        );
        Ok(Some(kind))
    }

    /// Start a drag session for an existing marker
    pub fn begin_drag(&mut self, kind: MarkerKind) -> Option<TaggedPoint> {
        let origin = self.markers.get(kind)?;
        self.dragging = Some(kind);
        Some(origin)
    }

    /// Overwrite a marker's position; only valid while that marker is dragged
    pub fn move_marker(&mut self, kind: MarkerKind, point: TaggedPoint) -> Result<(), StoreError> {
        if self.dragging != Some(kind) {
            return Err(StoreError::NotDragging(kind));
        }
        let point = self.canonicalize(point)?;
        *self.markers.slot(kind) = Some(point);
        Ok(())
    }

    pub fn end_drag(&mut self) {
        self.dragging = None;
    }

    /// Abort the drag and put the marker back where it started
    pub fn cancel_drag(&mut self, origin: TaggedPoint) {
        if let Some(kind) = self.dragging.take() {
            match self.canonicalize(origin) {
                Ok(origin) => *self.markers.slot(kind) = Some(origin),
                Err(err) => log::warn!("Could not restore {}: {}", kind.label(), err),
            }
        }
    }

    /// Clear both markers at once. The phase (and image space) is kept.
    pub fn reset(&mut self) {
        self.markers = MarkerSet::default();
        self.dragging = None;
    }

    /// Drop markers and image space, returning to live placement
    pub fn discard(&mut self) {
        *self = Self::default();
    }

    /// Move every marker from its tap-time view space into `image`.
    ///
    /// Calling again with the same image space is a no-op; a different image
    /// space after migration is refused. On a degenerate space nothing is
    /// changed.
    pub fn migrate_to_image_space(&mut self, image: CoordinateSpace) -> Result<(), StoreError> {
        if let Phase::Image(current) = self.phase {
            if current == image {
                return Ok(());
            }
            return Err(StoreError::AlreadyMigrated {
                current,
                requested: image,
            });
        }
        if image.is_degenerate() {
            return Err(GeometryError::DegenerateSpace {
                from: image,
                to: image,
            }
            .into());
        }

        let mut migrated = MarkerSet::default();
        for (kind, point) in self.markers.iter() {
            *migrated.slot(kind) = Some(point.to(&image)?);
        }
        log::debug!(
            "Migrated markers into {}x{} image space",
            image.width,
            image.height
        );
        self.markers = migrated;
        self.phase = Phase::Image(image);
        Ok(())
    }

    /// A single marker projected into `target`
    pub fn project(
        &self,
        kind: MarkerKind,
        target: &CoordinateSpace,
    ) -> Option<Result<Point, GeometryError>> {
        self.markers
            .get(kind)
            .map(|p| p.to(target).map(|p| p.point))
    }

    /// All markers projected into `target`; markers that cannot be
    /// projected are left out and logged
    pub fn projected(&self, target: &CoordinateSpace) -> MarkerSet {
        let mut out = MarkerSet::default();
        for (kind, point) in self.markers.iter() {
            match point.to(target) {
                Ok(p) => *out.slot(kind) = Some(p.point),
                Err(err) => log::warn!("Cannot project {}: {}", kind.label(), err),
            }
        }
        out
    }

    /// Nearest marker within `radius` of `point`, measured in `point`'s space
    pub fn hit_test(&self, point: TaggedPoint, radius: f32) -> Option<MarkerKind> {
        self.markers
            .iter()
            .filter_map(|(kind, marker)| {
                let marker = marker.to(&point.space).ok()?;
                let distance = marker.point.distance(point.point);
                (distance <= radius).then_some((kind, distance))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(kind, _)| kind)
    }
}
