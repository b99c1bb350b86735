//! Overlay widgets drawn on top of the capture surface

pub mod magnifier;
