//! Putting-line analysis contract
//!
//! The inference service itself lives elsewhere. This module owns the JSON
//! request and response shapes, reading responses, and the fallback shown
//! when a response cannot be read.

use std::collections::VecDeque;
use std::sync::Mutex;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use futures::FutureExt;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::capture::CapturedImage;
use crate::domain::Point;
use crate::error::AnalysisError;

/// Body sent to the analysis service. Marker positions are image pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    pub image_base64: String,
    pub mime_type: String,
    pub ball: Point,
    pub hole: Point,
    pub image_width: u32,
    pub image_height: u32,
}

impl AnalysisRequest {
    pub fn new(image: &CapturedImage, ball: Point, hole: Point) -> Self {
        Self {
            image_base64: STANDARD.encode(&image.bytes),
            mime_type: image.mime_type().to_string(),
            ball,
            hole,
            image_width: image.width(),
            image_height: image.height(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PuttingLine {
    pub direction: String,
    #[serde(rename = "break")]
    pub break_: String,
    pub confidence: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResponse {
    pub putting_line: PuttingLine,
    pub recommendations: [String; 4],
}

impl AnalysisResponse {
    /// Neutral advice used whenever the service answer is unreadable
    pub fn fallback() -> Self {
        Self {
            putting_line: PuttingLine {
                direction: "Aim straight at the hole".into(),
                break_: "Break could not be read from this photo".into(),
                confidence: "low".into(),
            },
            recommendations: [
                "Walk around the hole and look at the slope from the low side".into(),
                "Watch how water would drain off the green".into(),
                "Commit to your line and focus on speed".into(),
                "Retake the photo from behind the ball, closer to the ground".into(),
            ],
        }
    }
}

/// A settled analysis shown to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Analysis {
    pub response: AnalysisResponse,
    /// The service answer was unreadable and the fallback is shown instead
    pub fallback: bool,
}

/// Read a service response body. A Markdown code fence around the JSON is
/// accepted.
pub fn parse_response(body: &str) -> Result<AnalysisResponse, AnalysisError> {
    let json = strip_code_fence(body);
    serde_json::from_str(json).map_err(|e| AnalysisError::MalformedResponse(e.to_string()))
}

fn strip_code_fence(body: &str) -> &str {
    let trimmed = body.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (`json`) on the opening line
    let rest = rest.split_once('\n').map_or("", |(_, r)| r);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

/// Turn a raw gateway result into what the user sees: malformed answers
/// become the fallback, every other error is surfaced
pub fn settle(result: Result<AnalysisResponse, AnalysisError>) -> Result<Analysis, AnalysisError> {
    match result {
        Ok(response) => Ok(Analysis {
            response,
            fallback: false,
        }),
        Err(AnalysisError::MalformedResponse(reason)) => {
            log::warn!("Malformed analysis response, using fallback: {}", reason);
            Ok(Analysis {
                response: AnalysisResponse::fallback(),
                fallback: true,
            })
        }
        Err(err) => {
            log::error!("Analysis failed ({}): {}", err.kind(), err);
            Err(err)
        }
    }
}

/// The analysis service
pub trait AnalysisGateway: Send + Sync {
    fn analyze(
        &self,
        request: AnalysisRequest,
    ) -> BoxFuture<'static, Result<AnalysisResponse, AnalysisError>>;
}

/// Offline gateway answering from a queue of canned bodies.
///
/// Each call takes the next queued reply; once the queue is empty the last
/// reply repeats.
#[derive(Debug)]
pub struct CannedGateway {
    replies: Mutex<VecDeque<Result<String, AnalysisError>>>,
    last: Mutex<Result<String, AnalysisError>>,
}

impl CannedGateway {
    pub fn new(replies: impl IntoIterator<Item = Result<String, AnalysisError>>) -> Self {
        let fallback_body = serde_json::to_string(&AnalysisResponse::fallback())
            .map_err(|e| AnalysisError::MalformedResponse(e.to_string()));
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            last: Mutex::new(fallback_body),
        }
    }

    /// Always answer with `response`
    pub fn answering(response: &AnalysisResponse) -> Self {
        let body = serde_json::to_string(response)
            .map_err(|e| AnalysisError::MalformedResponse(e.to_string()));
        Self::new([body])
    }

    fn next_reply(&self) -> Result<String, AnalysisError> {
        let next = self
            .replies
            .lock()
            .ok()
            .and_then(|mut replies| replies.pop_front());
        let Ok(mut last) = self.last.lock() else {
            return Err(AnalysisError::Transport("gateway state poisoned".into()));
        };
        if let Some(reply) = next {
            *last = reply;
        }
        last.clone()
    }
}

impl AnalysisGateway for CannedGateway {
    fn analyze(
        &self,
        request: AnalysisRequest,
    ) -> BoxFuture<'static, Result<AnalysisResponse, AnalysisError>> {
        log::info!(
            "Analyzing {}x{} {} (ball {:.0},{:.0} hole {:.0},{:.0})",
            request.image_width,
            request.image_height,
            request.mime_type,
            request.ball.x,
            request.ball.y,
            request.hole.x,
            request.hole.y
        );
        let reply = self.next_reply();
        async move { parse_response(&reply?) }.boxed()
    }
}
