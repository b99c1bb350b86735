//! Camera capture module
//!
//! This module contains:
//! - The camera collaborator contract (this file)
//! - Captured still image type (image.rs)
//! - A simulated camera producing synthetic green frames (simulated.rs)

pub mod image;
pub mod simulated;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::error::CaptureDeviceError;

pub use self::image::CapturedImage;
pub use simulated::SimulatedCamera;

/// Which camera to open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Facing {
    #[default]
    Back,
    Front,
}

/// Preferred preview/capture resolution; devices may pick something else
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionHint {
    pub width: u32,
    pub height: u32,
}

impl Default for ResolutionHint {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

/// Still capture quality in `(0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CaptureQuality(pub f32);

impl Default for CaptureQuality {
    fn default() -> Self {
        Self(0.8)
    }
}

impl CaptureQuality {
    pub fn clamped(self) -> f32 {
        if self.0.is_finite() {
            self.0.clamp(0.05, 1.0)
        } else {
            Self::default().0
        }
    }
}

/// Raw still frame as delivered by the device
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StillFrame {
    /// Encoded image bytes (JPEG/PNG)
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Camera collaborator.
///
/// Futures are `'static` so the runtime can spawn them while the session
/// keeps handling events; implementations clone whatever handles they need.
pub trait CaptureDevice: Send + Sync {
    /// Open the camera and start the live preview
    fn start(
        &self,
        facing: Facing,
        hint: ResolutionHint,
    ) -> BoxFuture<'static, Result<(), CaptureDeviceError>>;

    /// Stop the camera. Stopping a stopped camera is a no-op.
    fn stop(&self);

    /// Take one still frame. Completes exactly once, never with a partial frame.
    fn capture_still(
        &self,
        quality: CaptureQuality,
    ) -> BoxFuture<'static, Result<StillFrame, CaptureDeviceError>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_is_clamped() {
        assert_eq!(CaptureQuality(2.0).clamped(), 1.0);
        assert_eq!(CaptureQuality(0.0).clamped(), 0.05);
        assert_eq!(CaptureQuality(f32::NAN).clamped(), 0.8);
        assert_eq!(CaptureQuality(0.5).clamped(), 0.5);
    }
}
