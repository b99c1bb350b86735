//! Error types for the marker and capture subsystem
//!
//! Every error here is local and recoverable: a failed conversion leaves
//! markers where they were, a failed capture leaves the session waiting for
//! a retry.

use thiserror::Error;

use crate::domain::{CoordinateSpace, MarkerKind};

/// Coordinate conversion failures
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum GeometryError {
    /// One of the two spaces has a zero or non-finite width/height
    #[error("degenerate coordinate space in conversion {from:?} -> {to:?}")]
    DegenerateSpace {
        from: CoordinateSpace,
        to: CoordinateSpace,
    },
}

/// Marker store contract violations
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum StoreError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    /// Markers already live in a different image space
    #[error("markers already migrated to {current:?}, refusing {requested:?}")]
    AlreadyMigrated {
        current: CoordinateSpace,
        requested: CoordinateSpace,
    },
    /// A move was requested for a marker that is not being dragged
    #[error("{0:?} is not being dragged")]
    NotDragging(MarkerKind),
}

/// Camera collaborator failures, surfaced to the user as a retry prompt
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureDeviceError {
    #[error("camera failed to start: {0}")]
    StartFailed(String),
    #[error("still capture failed: {0}")]
    CaptureFailed(String),
    #[error("captured frame is unusable: {0}")]
    InvalidFrame(String),
    #[error("camera is not running")]
    NotStarted,
}

/// Analysis gateway failures with a machine-readable kind
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    #[error("too many requests, try again shortly: {0}")]
    RateLimited(String),
    #[error("analysis quota exhausted: {0}")]
    QuotaExhausted(String),
    #[error("analysis request failed: {0}")]
    Transport(String),
    /// Replaced by the fallback payload, never shown to the user
    #[error("analysis response could not be read: {0}")]
    MalformedResponse(String),
}

impl AnalysisError {
    /// Stable identifier used on the wire and in logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RateLimited(_) => "rate_limited",
            Self::QuotaExhausted(_) => "quota_exhausted",
            Self::Transport(_) => "transport_error",
            Self::MalformedResponse(_) => "malformed_response",
        }
    }

    /// Classify a non-success HTTP status from the gateway
    pub fn from_status(status: u16, body: &str) -> Self {
        let detail = format!("HTTP {status}: {}", body.trim());
        match status {
            429 if body.to_ascii_lowercase().contains("quota") => Self::QuotaExhausted(detail),
            429 => Self::RateLimited(detail),
            _ => Self::Transport(detail),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        let quota = AnalysisError::from_status(429, "Daily quota exceeded");
        assert_eq!(quota.kind(), "quota_exhausted");

        let limited = AnalysisError::from_status(429, "slow down");
        assert_eq!(limited.kind(), "rate_limited");

        let transport = AnalysisError::from_status(502, "bad gateway");
        assert_eq!(transport.kind(), "transport_error");
        assert_eq!(transport.to_string(), "analysis request failed: HTTP 502: bad gateway");
    }
}
