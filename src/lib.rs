//! Ball and hole marking on golf green photos
//!
//! Markers are tapped on a live camera view, carried into the pixel space of
//! the captured still, and joined by a curved break path. A capture
//! coordinator drives the whole session as a state machine.

pub mod analysis;
pub mod capture;
pub mod config;
pub mod core;
pub mod domain;
pub mod error;
pub mod haptics;
pub mod orientation;
pub mod render;
pub mod session;
pub mod widget;
