//! Device level indicator
//!
//! Maps raw pitch/roll readings to a coarse quality tier and asks for a
//! feedback pulse only when the tier changes.

use serde::{Deserialize, Serialize};

/// One orientation reading, in degrees
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrientationSample {
    pub pitch: f32,
    pub roll: f32,
}

impl OrientationSample {
    pub fn new(pitch: f32, roll: f32) -> Self {
        Self { pitch, roll }
    }
}

/// Discrete level quality
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LevelTier {
    Good,
    Ok,
    #[default]
    Bad,
}

/// Haptic pulse strength
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HapticIntensity {
    Light,
    Medium,
    Heavy,
}

impl LevelTier {
    /// Pulse strength announcing a transition into this tier
    pub fn pulse(self) -> HapticIntensity {
        match self {
            LevelTier::Good => HapticIntensity::Light,
            LevelTier::Ok => HapticIntensity::Medium,
            LevelTier::Bad => HapticIntensity::Heavy,
        }
    }
}

/// Tier thresholds in degrees
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelThresholds {
    /// Pitch reading that counts as level (device upright)
    pub neutral_pitch: f32,
    /// Both deviations below this are `Good`
    pub good: f32,
    /// Both deviations below this are `Ok`
    pub ok: f32,
}

impl Default for LevelThresholds {
    fn default() -> Self {
        Self {
            neutral_pitch: 90.0,
            good: 10.0,
            ok: 20.0,
        }
    }
}

impl LevelThresholds {
    pub fn classify(&self, sample: OrientationSample) -> LevelTier {
        let roll = sample.roll.abs();
        let pitch = (sample.pitch - self.neutral_pitch).abs();
        if roll < self.good && pitch < self.good {
            LevelTier::Good
        } else if roll < self.ok && pitch < self.ok {
            LevelTier::Ok
        } else {
            LevelTier::Bad
        }
    }
}

/// Outcome of the orientation permission request
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PermissionState {
    #[default]
    Pending,
    Granted,
    Denied,
}

/// Result of feeding one sample
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LevelReading {
    pub tier: LevelTier,
    /// Set only when the tier differs from the last emitted one
    pub pulse: Option<HapticIntensity>,
}

#[derive(Clone, Debug, Default)]
pub struct LevelIndicator {
    thresholds: LevelThresholds,
    last: Option<LevelTier>,
    permission: PermissionState,
}

impl LevelIndicator {
    pub fn new(thresholds: LevelThresholds) -> Self {
        Self {
            thresholds,
            last: None,
            permission: PermissionState::Pending,
        }
    }

    pub fn set_permission(&mut self, permission: PermissionState) {
        if permission == PermissionState::Denied {
            log::info!("Orientation permission denied, level indicator disabled");
            self.last = None;
        }
        self.permission = permission;
    }

    pub fn permission(&self) -> PermissionState {
        self.permission
    }

    /// Current tier. Without readings (or without permission) this is `Bad`.
    pub fn tier(&self) -> LevelTier {
        self.last.unwrap_or(LevelTier::Bad)
    }

    /// Classify a sample, remembering the tier
    pub fn observe(&mut self, sample: OrientationSample) -> Option<LevelReading> {
        if self.permission == PermissionState::Denied {
            return None;
        }
        if !(sample.pitch.is_finite() && sample.roll.is_finite()) {
            log::debug!("Dropping non-finite orientation sample {:?}", sample);
            return None;
        }
        let tier = self.thresholds.classify(sample);
        let pulse = (self.last != Some(tier)).then(|| tier.pulse());
        if pulse.is_some() {
            log::debug!("Level tier {:?} -> {:?}", self.last, tier);
        }
        self.last = Some(tier);
        Some(LevelReading { tier, pulse })
    }

    /// Forget the last tier so the next reading pulses again
    pub fn reset(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn indicator() -> LevelIndicator {
        let mut level = LevelIndicator::new(LevelThresholds::default());
        level.set_permission(PermissionState::Granted);
        level
    }

    #[test]
    fn test_classify_thresholds() {
        let t = LevelThresholds::default();
        assert_eq!(t.classify(OrientationSample::new(90.0, 0.0)), LevelTier::Good);
        assert_eq!(t.classify(OrientationSample::new(99.0, -9.0)), LevelTier::Good);
        assert_eq!(t.classify(OrientationSample::new(75.0, 5.0)), LevelTier::Ok);
        assert_eq!(t.classify(OrientationSample::new(90.0, 19.9)), LevelTier::Ok);
        assert_eq!(t.classify(OrientationSample::new(90.0, 20.0)), LevelTier::Bad);
        assert_eq!(t.classify(OrientationSample::new(0.0, 0.0)), LevelTier::Bad);
    }

    #[test]
    fn test_constant_stream_pulses_once() {
        let mut level = indicator();
        let sample = OrientationSample::new(91.0, 2.0);
        let pulses = (0..50)
            .filter_map(|_| level.observe(sample))
            .filter(|r| r.pulse.is_some())
            .count();
        assert_eq!(pulses, 1);
        assert_eq!(level.tier(), LevelTier::Good);
    }

    #[test]
    fn test_alternating_stream_pulses_per_transition() {
        let mut level = indicator();
        let good = OrientationSample::new(90.0, 0.0);
        let bad = OrientationSample::new(30.0, 45.0);
        let stream = [good, good, bad, bad, bad, good, bad, good];

        let pulses: Vec<_> = stream
            .iter()
            .filter_map(|s| level.observe(*s))
            .filter_map(|r| r.pulse)
            .collect();
        assert_eq!(
            pulses,
            vec![
                HapticIntensity::Light,
                HapticIntensity::Heavy,
                HapticIntensity::Light,
                HapticIntensity::Heavy,
                HapticIntensity::Light,
            ]
        );
    }

    #[test]
    fn test_denied_permission_never_reports_better_than_bad() {
        let mut level = LevelIndicator::new(LevelThresholds::default());
        level.set_permission(PermissionState::Denied);
        assert_eq!(level.observe(OrientationSample::new(90.0, 0.0)), None);
        assert_eq!(level.tier(), LevelTier::Bad);
    }

    #[test]
    fn test_non_finite_samples_are_ignored() {
        let mut level = indicator();
        level.observe(OrientationSample::new(90.0, 0.0));
        assert_eq!(level.observe(OrientationSample::new(f32::NAN, 0.0)), None);
        assert_eq!(level.tier(), LevelTier::Good);
    }
}
