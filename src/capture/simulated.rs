//! Simulated camera producing synthetic putting green frames
//!
//! Used by the demo binary and the runtime tests in place of a real device.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use image::{Rgba, RgbaImage};

use super::{CaptureDevice, CaptureQuality, Facing, ResolutionHint, StillFrame};
use crate::error::CaptureDeviceError;
use crate::render::image::encode_png;

#[derive(Debug, Default)]
struct Shared {
    running: AtomicBool,
    fail_start: AtomicBool,
    /// Number of upcoming captures that should fail
    failing_captures: AtomicU32,
    starts: AtomicU32,
    stops: AtomicU32,
}

/// A camera that renders a striped green instead of reading a sensor
#[derive(Clone, Debug)]
pub struct SimulatedCamera {
    width: u32,
    height: u32,
    delay: Duration,
    shared: Arc<Shared>,
}

impl SimulatedCamera {
    /// Camera whose stills decode to `width x height`
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            delay: Duration::ZERO,
            shared: Arc::default(),
        }
    }

    /// Delay every still capture, to exercise in-flight behavior
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Make the next `count` captures fail
    pub fn fail_next_captures(&self, count: u32) {
        self.shared.failing_captures.store(count, Ordering::SeqCst);
    }

    /// Make every start attempt fail
    pub fn fail_start(&self, fail: bool) {
        self.shared.fail_start.store(fail, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Number of start and effective stop calls so far
    pub fn lifecycle_counts(&self) -> (u32, u32) {
        (
            self.shared.starts.load(Ordering::SeqCst),
            self.shared.stops.load(Ordering::SeqCst),
        )
    }

    fn render(&self) -> RgbaImage {
        let (w, h) = (self.width.max(1), self.height.max(1));
        RgbaImage::from_fn(w, h, |x, y| {
            // Mowing stripes with a slight vertical shade
            let stripe = ((x / 16 + y / 16) % 2) as u8;
            let shade = (y * 40 / h) as u8;
            Rgba([30 + shade / 2, 110 + stripe * 25 + shade, 40, 255])
        })
    }
}

impl CaptureDevice for SimulatedCamera {
    fn start(
        &self,
        facing: Facing,
        hint: ResolutionHint,
    ) -> BoxFuture<'static, Result<(), CaptureDeviceError>> {
        let shared = self.shared.clone();
        async move {
            if shared.fail_start.load(Ordering::SeqCst) {
                return Err(CaptureDeviceError::StartFailed(
                    "simulated camera unavailable".into(),
                ));
            }
            log::info!(
                "Simulated {:?} camera started (hint {}x{})",
                facing,
                hint.width,
                hint.height
            );
            shared.starts.fetch_add(1, Ordering::SeqCst);
            shared.running.store(true, Ordering::SeqCst);
            Ok(())
        }
        .boxed()
    }

    fn stop(&self) {
        if self.shared.running.swap(false, Ordering::SeqCst) {
            self.shared.stops.fetch_add(1, Ordering::SeqCst);
            log::info!("Simulated camera stopped");
        }
    }

    fn capture_still(
        &self,
        quality: CaptureQuality,
    ) -> BoxFuture<'static, Result<StillFrame, CaptureDeviceError>> {
        let camera = self.clone();
        async move {
            if !camera.delay.is_zero() {
                tokio::time::sleep(camera.delay).await;
            }
            if !camera.is_running() {
                return Err(CaptureDeviceError::NotStarted);
            }
            let failing = &camera.shared.failing_captures;
            if failing
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(CaptureDeviceError::CaptureFailed(
                    "simulated shutter fault".into(),
                ));
            }

            log::debug!("Simulated still at quality {:.2}", quality.clamped());
            let img = camera.render();
            let bytes =
                encode_png(&img).map_err(|e| CaptureDeviceError::CaptureFailed(e.to_string()))?;
            Ok(StillFrame {
                bytes,
                width: img.width(),
                height: img.height(),
            })
        }
        .boxed()
    }
}
