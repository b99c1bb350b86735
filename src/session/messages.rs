//! Message types for the capture session
//!
//! This module contains:
//! - Msg enum: everything that can happen to a session
//! - Effect enum: side effects the runtime performs on the coordinator's behalf

use crate::analysis::{Analysis, AnalysisRequest};
use crate::capture::{CaptureQuality, CapturedImage, Facing, ResolutionHint};
use crate::domain::{HapticIntensity, OrientationSample, PermissionState};
use crate::error::{AnalysisError, CaptureDeviceError};

use super::pointer::{LongPressTimer, PointerEvent};

// ============================================================================
// Inbound Messages
// ============================================================================

#[derive(Debug, Clone)]
pub enum Msg {
    /// User dismissed the instructions (or asked to retry a failed start)
    InstructionsDismissed,
    /// Camera start completed
    CameraStarted(Result<(), CaptureDeviceError>),
    /// Visible surface size, in logical pixels
    SurfaceResized { width: f32, height: f32 },
    /// Raw pointer input on the surface
    Pointer(PointerEvent),
    /// Long-press timer fired for this generation
    LongPressElapsed(u64),
    /// Clear both markers
    ResetMarkers,
    /// Take the still
    Capture,
    /// Still capture completed for `ticket`
    FrameCaptured {
        ticket: u64,
        result: Result<CapturedImage, CaptureDeviceError>,
    },
    /// Accept the reviewed still and markers
    Confirm,
    /// Throw away the still and markers, back to the live preview
    Retake,
    /// Abandon the session from anywhere
    Cancel,
    OrientationPermission(PermissionState),
    Orientation(OrientationSample),
    /// Analysis settled for `ticket`
    AnalysisFinished {
        ticket: u64,
        result: Result<Analysis, AnalysisError>,
    },
    /// Resend a failed analysis
    RetryAnalysis,
}

// ============================================================================
// Outbound Effects
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    StartCamera {
        facing: Facing,
        hint: ResolutionHint,
    },
    /// Idempotent
    StopCamera,
    CaptureStill {
        ticket: u64,
        quality: CaptureQuality,
    },
    /// Deliver `Msg::LongPressElapsed(generation)` after the delay
    ScheduleLongPress(LongPressTimer),
    Pulse(HapticIntensity),
    Analyze {
        ticket: u64,
        request: AnalysisRequest,
    },
    /// Ask for permission, then forward samples as `Msg::Orientation`
    StartOrientation,
    /// Idempotent
    StopOrientation,
}
