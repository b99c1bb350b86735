//! Haptic feedback sinks

use crossbeam_channel::{Receiver, Sender};

use crate::domain::HapticIntensity;

/// Fire-and-forget haptic actuator
pub trait Haptics: Send + Sync {
    fn pulse(&self, intensity: HapticIntensity);
}

/// Forwards pulses to a channel, for a device thread or tests to consume
#[derive(Clone, Debug)]
pub struct ChannelHaptics {
    tx: Sender<HapticIntensity>,
}

impl ChannelHaptics {
    pub fn new() -> (Self, Receiver<HapticIntensity>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self { tx }, rx)
    }
}

impl Haptics for ChannelHaptics {
    fn pulse(&self, intensity: HapticIntensity) {
        // Nobody listening is fine
        if self.tx.send(intensity).is_err() {
            log::debug!("Haptics receiver gone, dropping {:?} pulse", intensity);
        }
    }
}

/// Logs pulses on hardware without an actuator
#[derive(Clone, Copy, Debug, Default)]
pub struct LogHaptics;

impl Haptics for LogHaptics {
    fn pulse(&self, intensity: HapticIntensity) {
        log::info!("Haptic pulse: {:?}", intensity);
    }
}
