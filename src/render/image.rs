//! Image rendering for markers and the break path using tiny-skia
//!
//! These functions draw onto an RgbaImage in image pixel space, for the
//! exported review image.

use std::io;
use std::path::{Path, PathBuf};

use image::RgbaImage;
use tiny_skia::{FillRule, LineCap, LineJoin, Paint, PathBuilder, Pixmap, Stroke, Transform};

use super::geometry::{self, BreakPath, path};
use crate::config::{MarkerColor, Palette};
use crate::domain::{MarkerKind, MarkerSet, Point};

/// Convert RgbaImage to Pixmap, apply drawing function, and copy back
fn with_pixmap(img: &mut RgbaImage, f: impl FnOnce(&mut Pixmap)) {
    let (w, h) = (img.width(), img.height());
    let Some(size) = tiny_skia::IntSize::from_wh(w, h) else {
        return;
    };
    let Some(mut pixmap) = Pixmap::from_vec(img.as_raw().clone(), size) else {
        return;
    };

    f(&mut pixmap);

    // Copy back
    img.copy_from_slice(pixmap.data());
}

fn paint(color: [u8; 4]) -> Paint<'static> {
    let mut paint = Paint::default();
    let [r, g, b, a] = color;
    paint.set_color_rgba8(r, g, b, a);
    paint.anti_alias = true;
    paint
}

fn round_stroke(width: f32) -> Stroke {
    Stroke {
        width,
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        ..Default::default()
    }
}

/// Build the quadratic break path
fn build_break_path(curve: &BreakPath) -> Option<tiny_skia::Path> {
    if curve.is_degenerate() {
        return None;
    }
    let mut pb = PathBuilder::new();
    pb.move_to(curve.start.x, curve.start.y);
    pb.quad_to(curve.control.x, curve.control.y, curve.end.x, curve.end.y);
    pb.finish()
}

fn build_circle(center: Point, radius: f32) -> Option<tiny_skia::Path> {
    PathBuilder::from_circle(center.x, center.y, radius)
}

/// Draw the break path with an optional dark outline underneath
pub fn draw_break_path_on_image(
    img: &mut RgbaImage,
    curve: &BreakPath,
    palette: &Palette,
    scale: f32,
) {
    let Some(curve_path) = build_break_path(curve) else {
        return;
    };

    with_pixmap(img, |pixmap| {
        let thickness = (path::THICKNESS * scale).max(1.0);
        let outline = (path::OUTLINE * scale).max(1.0);

        if palette.shadow {
            pixmap.stroke_path(
                &curve_path,
                &paint([0, 0, 0, 220]),
                &round_stroke(thickness + outline * 2.0),
                Transform::identity(),
                None,
            );
        }

        pixmap.stroke_path(
            &curve_path,
            &paint(palette.path.to_rgba_u8()),
            &round_stroke(thickness),
            Transform::identity(),
            None,
        );
    });
}

/// Draw the ball as a filled disc and the hole as a ring with a center dot
pub fn draw_markers_on_image(
    img: &mut RgbaImage,
    markers: &MarkerSet,
    palette: &Palette,
    scale: f32,
) {
    if markers.is_empty() {
        return;
    }

    with_pixmap(img, |pixmap| {
        let (radius, outline) = geometry::marker_radius(scale);

        for (kind, center) in markers.iter() {
            let Some(circle) = build_circle(center, radius) else {
                continue;
            };
            let color: MarkerColor = match kind {
                MarkerKind::Ball => palette.ball,
                MarkerKind::Hole => palette.hole,
            };

            if palette.shadow {
                pixmap.stroke_path(
                    &circle,
                    &paint([0, 0, 0, 220]),
                    &round_stroke(outline * 2.0),
                    Transform::identity(),
                    None,
                );
            }

            match kind {
                MarkerKind::Ball => {
                    pixmap.fill_path(
                        &circle,
                        &paint(color.to_rgba_u8()),
                        FillRule::Winding,
                        Transform::identity(),
                        None,
                    );
                }
                MarkerKind::Hole => {
                    pixmap.stroke_path(
                        &circle,
                        &paint(color.to_rgba_u8()),
                        &round_stroke(outline),
                        Transform::identity(),
                        None,
                    );
                    if let Some(dot) = build_circle(center, outline) {
                        pixmap.fill_path(
                            &dot,
                            &paint(color.to_rgba_u8()),
                            FillRule::Winding,
                            Transform::identity(),
                            None,
                        );
                    }
                }
            }
        }
    });
}

/// Draw the path first, then markers on top so they are never hidden
pub fn draw_review_overlay(
    img: &mut RgbaImage,
    markers: &MarkerSet,
    fraction: f32,
    palette: &Palette,
    scale: f32,
) {
    if let Some((ball, hole)) = markers.pair() {
        draw_break_path_on_image(img, &BreakPath::new(ball, hole, fraction), palette, scale);
    }
    draw_markers_on_image(img, markers, palette, scale);
}

pub fn write_png<W: io::Write>(w: W, image: &RgbaImage) -> Result<(), png::EncodingError> {
    let mut encoder = png::Encoder::new(w, image.width(), image.height());
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(image.as_raw())
}

pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, png::EncodingError> {
    let mut buffer = Vec::new();
    write_png(&mut buffer, image)?;
    Ok(buffer)
}

pub fn save_png(image: &RgbaImage, path: &Path) -> anyhow::Result<()> {
    let mut file = std::fs::File::create(path)?;
    Ok(write_png(&mut file, image)?)
}

/// Timestamped export path in the Pictures folder
pub fn export_path() -> Option<PathBuf> {
    let mut path = dirs::picture_dir().or_else(|| dirs::home_dir().map(|h| h.join("Pictures")))?;
    let name = chrono::Local::now()
        .format("Putt_%Y-%m-%d_%H-%M-%S.png")
        .to_string();
    path.push(name);
    Some(path)
}
