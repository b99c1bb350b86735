//! Marker and break path rendering module
//!
//! This module contains:
//! - Break path geometry shared between overlay and image rendering
//! - Image rendering using tiny-skia (for the exported review image)

pub mod geometry;
pub mod image;

pub use geometry::BreakPath;
