//! Magnifier loupe for precise marker placement

use image::{Rgba, RgbaImage};

use crate::config::PuttlineConfig;
use crate::domain::{CoordinateSpace, Point};

/// Magnifier radius in pixels
pub const MAGNIFIER_RADIUS: f32 = 60.0;
/// Magnifier zoom factor
pub const MAGNIFIER_ZOOM: f32 = 2.5;
/// Gap between the finger and the loupe edge
const FINGER_GAP: f32 = 20.0;
/// Minimum distance between the loupe and the surface edge
const EDGE_MARGIN: f32 = 5.0;
/// Ring drawn at the loupe edge
const BORDER_WIDTH: f32 = 3.0;
const CROSSHAIR_SIZE: f32 = 8.0;

const BACKGROUND: Rgba<u8> = Rgba([0, 0, 0, 230]);
const BORDER: Rgba<u8> = Rgba([255, 255, 255, 255]);
const CROSSHAIR: Rgba<u8> = Rgba([255, 255, 255, 204]);

/// Where to draw the loupe on the surface, and what it magnifies
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Loupe {
    /// Loupe center in surface coordinates
    pub center: Point,
    /// Magnified point in surface coordinates
    pub focus: Point,
    pub radius: f32,
    pub zoom: f32,
}

/// Tracks the active pointer and decides whether and where a loupe shows
#[derive(Clone, Debug, PartialEq)]
pub struct MagnifierController {
    enabled: bool,
    radius: f32,
    zoom: f32,
    focus: Option<Point>,
}

impl Default for MagnifierController {
    fn default() -> Self {
        Self::new(true, MAGNIFIER_RADIUS, MAGNIFIER_ZOOM)
    }
}

impl MagnifierController {
    pub fn new(enabled: bool, radius: f32, zoom: f32) -> Self {
        Self {
            enabled,
            radius: radius.max(1.0),
            zoom: zoom.max(1.0),
            focus: None,
        }
    }

    pub fn from_config(config: &PuttlineConfig) -> Self {
        Self::new(
            config.magnifier_enabled,
            config.magnifier_radius,
            config.magnifier_zoom,
        )
    }

    /// Follow the pointer of an active placement or drag
    pub fn track(&mut self, point: Point) {
        self.focus = Some(point);
    }

    /// The pointer session ended; forget everything
    pub fn end(&mut self) {
        self.focus = None;
    }

    /// Shown while a pointer is active and a marker is still missing, or
    /// while a marker is being dragged
    pub fn is_visible(&self, markers_complete: bool, dragging: bool) -> bool {
        self.enabled && self.focus.is_some() && (!markers_complete || dragging)
    }

    /// Loupe placement above the finger, clamped inside `surface`
    pub fn loupe(
        &self,
        surface: &CoordinateSpace,
        markers_complete: bool,
        dragging: bool,
    ) -> Option<Loupe> {
        if !self.is_visible(markers_complete, dragging) || surface.is_degenerate() {
            return None;
        }
        let focus = self.focus?;
        let r = self.radius;
        let offset = r + FINGER_GAP;

        let clamp = |v: f32, extent: f32| {
            let (lo, hi) = (r + EDGE_MARGIN, extent - r - EDGE_MARGIN);
            // A surface narrower than the loupe just centers it
            if lo > hi { extent / 2.0 } else { v.clamp(lo, hi) }
        };

        Some(Loupe {
            center: Point::new(
                clamp(focus.x, surface.width),
                clamp(focus.y - offset, surface.height),
            ),
            focus,
            radius: r,
            zoom: self.zoom,
        })
    }
}

/// Render a circular zoomed excerpt of `image` around `center`, given in
/// image pixel coordinates. Pixels outside the circle are transparent and
/// samples outside the image show the dark background.
pub fn render_loupe(image: &RgbaImage, center: Point, zoom: f32, radius: f32) -> RgbaImage {
    let zoom = zoom.max(1.0);
    let radius = radius.max(1.0);
    let size = (radius * 2.0).ceil() as u32;
    let (img_w, img_h) = (image.width() as i64, image.height() as i64);

    RgbaImage::from_fn(size, size, |ox, oy| {
        let dx = ox as f32 + 0.5 - radius;
        let dy = oy as f32 + 0.5 - radius;
        let dist = (dx * dx + dy * dy).sqrt();

        if dist > radius {
            return Rgba([0, 0, 0, 0]);
        }
        if dist > radius - BORDER_WIDTH {
            return BORDER;
        }
        if (dy.abs() <= 0.5 && dx.abs() <= CROSSHAIR_SIZE)
            || (dx.abs() <= 0.5 && dy.abs() <= CROSSHAIR_SIZE)
        {
            return CROSSHAIR;
        }

        let src_x = (center.x + dx / zoom).floor() as i64;
        let src_y = (center.y + dy / zoom).floor() as i64;
        if src_x >= 0 && src_x < img_w && src_y >= 0 && src_y < img_h {
            *image.get_pixel(src_x as u32, src_y as u32)
        } else {
            BACKGROUND
        }
    })
}
