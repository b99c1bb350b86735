//! Capture session state and the UI projection derived from it

use crate::analysis::Analysis;
use crate::domain::{LevelTier, MarkerSet};
use crate::error::{AnalysisError, CaptureDeviceError};
use crate::render::BreakPath;
use crate::widget::magnifier::Loupe;

/// Progress of the analysis request after confirmation
#[derive(Clone, Debug, Default, PartialEq)]
pub enum AnalysisStatus {
    #[default]
    Pending,
    Ready(Analysis),
    /// Shown with a retry affordance; never retried automatically
    Failed(AnalysisError),
}

#[derive(Clone, Debug, PartialEq)]
pub enum CaptureState {
    /// Instructions on screen. `retry` is set when the camera failed to start.
    AwaitingInstructions { retry: Option<CaptureDeviceError> },
    CameraStarting,
    /// Live preview, no markers yet
    CameraActive,
    MarkersIncomplete,
    /// `error` holds the last failed capture, if any
    MarkersComplete { error: Option<CaptureDeviceError> },
    Capturing { ticket: u64 },
    /// Frozen still with markers in image space
    Reviewing,
    Confirmed { ticket: u64, status: AnalysisStatus },
    Cancelled,
}

impl Default for CaptureState {
    fn default() -> Self {
        Self::AwaitingInstructions { retry: None }
    }
}

impl CaptureState {
    /// Live preview states where markers are placed against the camera view
    pub fn is_live(&self) -> bool {
        matches!(
            self,
            Self::CameraActive | Self::MarkersIncomplete | Self::MarkersComplete { .. }
        )
    }

    /// States in which pointer input edits markers
    pub fn accepts_pointer(&self) -> bool {
        self.is_live() || matches!(self, Self::Reviewing)
    }

    /// The surface shows the captured still rather than the camera
    pub fn shows_still(&self) -> bool {
        matches!(self, Self::Reviewing | Self::Confirmed { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::AwaitingInstructions { .. } => "awaiting-instructions",
            Self::CameraStarting => "camera-starting",
            Self::CameraActive => "camera-active",
            Self::MarkersIncomplete => "markers-incomplete",
            Self::MarkersComplete { .. } => "markers-complete",
            Self::Capturing { .. } => "capturing",
            Self::Reviewing => "reviewing",
            Self::Confirmed { .. } => "confirmed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Everything a UI needs to draw the session. Derived, never stored.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SessionView {
    pub show_instructions: bool,
    /// Camera start failure to show next to a retry button
    pub camera_error: Option<String>,
    pub preview_live: bool,
    pub preview_frozen: bool,
    pub busy: bool,
    pub can_reset: bool,
    pub can_capture: bool,
    pub capture_error: Option<String>,
    pub can_confirm: bool,
    pub can_retake: bool,
    pub analysis_pending: bool,
    pub analysis: Option<Analysis>,
    pub analysis_error: Option<String>,
    pub can_retry_analysis: bool,
    pub level: LevelTier,
    pub show_level: bool,
    /// Markers in surface coordinates
    pub markers: MarkerSet,
    /// Break path in surface coordinates
    pub break_path: Option<BreakPath>,
    pub loupe: Option<Loupe>,
}
