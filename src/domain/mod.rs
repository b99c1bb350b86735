//! Pure domain types with minimal dependencies
//!
//! Coordinate spaces, the marker store and the level indicator. Nothing in
//! here knows about the camera, the runtime or rendering.

pub mod geometry;
pub mod level;
pub mod markers;

pub use geometry::*;
pub use level::*;
pub use markers::*;
