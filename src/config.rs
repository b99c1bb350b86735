//! Configuration persistence for puttline settings

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::capture::{CaptureQuality, Facing, ResolutionHint};
use crate::domain::LevelThresholds;
use crate::render::geometry::{marker, path};

/// Serializable color representation for config storage
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarkerColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl MarkerColor {
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Convert to image crate RGBA format (0-255)
    pub fn to_rgba_u8(self) -> [u8; 4] {
        [
            (self.r * 255.0).round() as u8,
            (self.g * 255.0).round() as u8,
            (self.b * 255.0).round() as u8,
            255,
        ]
    }
}

/// Colors used when drawing markers and the break path
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Palette {
    pub ball: MarkerColor,
    pub hole: MarkerColor,
    pub path: MarkerColor,
    /// Whether to draw a dark outline under markers and the path
    pub shadow: bool,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            ball: MarkerColor::rgb(1.0, 1.0, 1.0),
            hole: MarkerColor::rgb(0.9, 0.1, 0.1),
            path: MarkerColor::rgb(1.0, 0.85, 0.0), // Yellow
            shadow: true,
        }
    }
}

/// Application configuration persisted between sessions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PuttlineConfig {
    /// Whether to show the magnifier while placing or dragging markers
    pub magnifier_enabled: bool,
    /// Loupe radius in logical pixels
    pub magnifier_radius: f32,
    /// Loupe zoom factor
    pub magnifier_zoom: f32,
    /// Press duration before a press on a marker becomes a drag
    pub long_press_ms: u64,
    /// Distance from a marker center that still counts as touching it
    pub hit_radius: f32,
    /// Movement allowed before a long-press is abandoned
    pub tap_slop: f32,
    /// Sideways bulge of the break path as a fraction of its length
    pub break_fraction: f32,
    /// Level tier thresholds
    pub level: LevelThresholds,
    /// Which camera to open
    pub facing: Facing,
    /// Requested capture resolution
    pub resolution: ResolutionHint,
    /// Still capture quality
    pub quality: CaptureQuality,
    /// Marker and path colors
    pub palette: Palette,
}

impl Default for PuttlineConfig {
    fn default() -> Self {
        Self {
            magnifier_enabled: true,
            magnifier_radius: 60.0,
            magnifier_zoom: 2.5,
            long_press_ms: 400,
            hit_radius: marker::RADIUS,
            tap_slop: 8.0,
            break_fraction: path::BREAK_FRACTION,
            level: LevelThresholds::default(),
            facing: Facing::Back,
            resolution: ResolutionHint::default(),
            quality: CaptureQuality::default(),
            palette: Palette::default(),
        }
    }
}

impl PuttlineConfig {
    /// Directory name under the user config dir
    pub const ID: &'static str = "puttline";

    /// Default location of the config file
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(Self::ID).join("config.json"))
    }

    /// Load configuration from disk, or return defaults if unavailable
    pub fn load() -> Self {
        let Some(path) = Self::path() else {
            log::warn!("No config directory available, using defaults");
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(err) => {
                log::warn!("Error loading config, using defaults: {:?}", err);
                Self::default()
            }
        }
    }

    /// Save configuration to disk
    pub fn save(&self) {
        let Some(path) = Self::path() else {
            log::error!("No config directory available for saving");
            return;
        };
        if let Err(err) = self.save_to(&path) {
            log::error!("Failed to save config: {:?}", err);
        }
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = serde_json::from_str(&json)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }
}
