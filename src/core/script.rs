//! JSON session scripts for the command line driver
//!
//! A script describes the simulated collaborators and the user input to
//! replay against them.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};

use super::app::App;
use crate::domain::Point;
use crate::orientation::TimedSample;
use crate::session::messages::Msg;
use crate::session::pointer::PointerEvent;
use crate::session::state::{AnalysisStatus, CaptureState};

fn default_timeout_ms() -> u64 {
    2000
}

fn default_true() -> bool {
    true
}

/// One user action or wait
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum ScriptStep {
    Dismiss,
    Resize { width: f32, height: f32 },
    /// Press and release at the same spot
    Tap { x: f32, y: f32 },
    Press { x: f32, y: f32 },
    Move { x: f32, y: f32 },
    Release { x: f32, y: f32 },
    Leave,
    /// Keep handling messages for a while (long-press, sensor samples)
    Hold { ms: u64 },
    Reset,
    Capture,
    Confirm,
    Retake,
    Cancel,
    RetryAnalysis,
    /// Wait until the session reaches the named state
    WaitFor {
        state: String,
        #[serde(default = "default_timeout_ms")]
        timeout_ms: u64,
    },
    /// Wait until the analysis has settled, successfully or not
    AwaitAnalysis {
        #[serde(default = "default_timeout_ms")]
        timeout_ms: u64,
    },
}

/// Simulated camera parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraScript {
    pub width: u32,
    pub height: u32,
    pub delay_ms: u64,
    pub fail_captures: u32,
    pub fail_start: bool,
}

impl Default for CameraScript {
    fn default() -> Self {
        Self {
            width: 3000,
            height: 2400,
            delay_ms: 50,
            fail_captures: 0,
            fail_start: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Script {
    #[serde(default)]
    pub camera: CameraScript,
    #[serde(default = "default_true")]
    pub orientation_granted: bool,
    #[serde(default)]
    pub orientation: Vec<TimedSample>,
    /// Raw analysis service bodies, replayed in order
    #[serde(default)]
    pub analysis: Vec<String>,
    pub steps: Vec<ScriptStep>,
}

const SAMPLE_REPLY: &str = r#"```json
{
  "puttingLine": {
    "direction": "Start it a ball and a half outside the left edge",
    "break": "Moderate right-to-left, most of it in the last third",
    "confidence": "medium"
  },
  "recommendations": [
    "Pick a spot a foot in front of the ball on your start line",
    "Putt to a point 40 cm past the hole",
    "The grain runs toward the water, expect it to be quicker downhill",
    "Keep your head still until the ball is well on its way"
  ]
}
```"#;

impl Default for Script {
    /// Tap ball and hole on a 1000x800 view, capture a 3000x2400 still,
    /// confirm and wait for the analysis
    fn default() -> Self {
        use ScriptStep::*;
        let level = |after_ms, pitch, roll| TimedSample {
            after_ms,
            pitch,
            roll,
        };
        Self {
            camera: CameraScript::default(),
            orientation_granted: true,
            orientation: vec![
                level(10, 62.0, 14.0),
                level(40, 78.0, 8.0),
                level(40, 88.0, 3.0),
                level(40, 89.5, 1.0),
            ],
            analysis: vec![SAMPLE_REPLY.to_string()],
            steps: vec![
                Dismiss,
                WaitFor {
                    state: "camera-active".into(),
                    timeout_ms: default_timeout_ms(),
                },
                Resize {
                    width: 1000.0,
                    height: 800.0,
                },
                Hold { ms: 150 },
                Tap { x: 100.0, y: 100.0 },
                Tap { x: 900.0, y: 700.0 },
                Capture,
                WaitFor {
                    state: "reviewing".into(),
                    timeout_ms: default_timeout_ms(),
                },
                Confirm,
                AwaitAnalysis {
                    timeout_ms: default_timeout_ms(),
                },
            ],
        }
    }
}

impl Script {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read script: {}", path.display()))?;
        serde_json::from_str(&json).with_context(|| format!("Invalid script: {}", path.display()))
    }

    /// Replay every step against `app`
    pub async fn run(&self, app: &mut App) -> anyhow::Result<()> {
        for (index, step) in self.steps.iter().enumerate() {
            log::debug!("Script step {}: {:?}", index, step);
            run_step(app, step)
                .await
                .with_context(|| format!("Script step {} ({:?}) failed", index, step))?;
        }
        Ok(())
    }
}

async fn run_step(app: &mut App, step: &ScriptStep) -> anyhow::Result<()> {
    match step {
        ScriptStep::Dismiss => app.dispatch(Msg::InstructionsDismissed),
        ScriptStep::Resize { width, height } => app.dispatch(Msg::SurfaceResized {
            width: *width,
            height: *height,
        }),
        ScriptStep::Tap { x, y } => {
            let at = Point::new(*x, *y);
            app.dispatch(Msg::Pointer(PointerEvent::Down(at)));
            app.dispatch(Msg::Pointer(PointerEvent::Up(at)));
        }
        ScriptStep::Press { x, y } => {
            app.dispatch(Msg::Pointer(PointerEvent::Down(Point::new(*x, *y))))
        }
        ScriptStep::Move { x, y } => {
            app.dispatch(Msg::Pointer(PointerEvent::Move(Point::new(*x, *y))))
        }
        ScriptStep::Release { x, y } => {
            app.dispatch(Msg::Pointer(PointerEvent::Up(Point::new(*x, *y))))
        }
        ScriptStep::Leave => app.dispatch(Msg::Pointer(PointerEvent::Leave)),
        ScriptStep::Hold { ms } => app.pump_for(Duration::from_millis(*ms)).await,
        ScriptStep::Reset => app.dispatch(Msg::ResetMarkers),
        ScriptStep::Capture => app.dispatch(Msg::Capture),
        ScriptStep::Confirm => app.dispatch(Msg::Confirm),
        ScriptStep::Retake => app.dispatch(Msg::Retake),
        ScriptStep::Cancel => app.dispatch(Msg::Cancel),
        ScriptStep::RetryAnalysis => app.dispatch(Msg::RetryAnalysis),
        ScriptStep::WaitFor { state, timeout_ms } => {
            let reached = app
                .pump_until(Duration::from_millis(*timeout_ms), |c| {
                    c.state().name() == state.as_str()
                })
                .await;
            if !reached {
                bail!(
                    "session is {} instead of {}",
                    app.coordinator().state().name(),
                    state
                );
            }
        }
        ScriptStep::AwaitAnalysis { timeout_ms } => {
            let settled = app
                .pump_until(Duration::from_millis(*timeout_ms), |c| {
                    matches!(
                        c.state(),
                        CaptureState::Confirmed { status, .. } if *status != AnalysisStatus::Pending
                    )
                })
                .await;
            if !settled {
                bail!(
                    "analysis did not settle (session is {})",
                    app.coordinator().state().name()
                );
            }
        }
    }
    Ok(())
}
