//! Session runtime
//!
//! Owns the coordinator and a single message queue. Effects are carried out
//! by spawned tasks that report back through the queue; the coordinator
//! itself is only ever touched from `dispatch`.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::analysis::{self, AnalysisGateway};
use crate::capture::{CaptureDevice, CapturedImage};
use crate::config::PuttlineConfig;
use crate::domain::PermissionState;
use crate::haptics::Haptics;
use crate::orientation::OrientationSource;
use crate::session::coordinator::CaptureCoordinator;
use crate::session::messages::{Effect, Msg};

/// Queue depth for messages coming back from collaborators
const QUEUE_SIZE: usize = 32;

/// The outside world as seen by a session
#[derive(Clone)]
pub struct Collaborators {
    pub camera: Arc<dyn CaptureDevice>,
    pub orientation: Arc<dyn OrientationSource>,
    pub haptics: Arc<dyn Haptics>,
    pub gateway: Arc<dyn AnalysisGateway>,
}

pub struct App {
    coordinator: CaptureCoordinator,
    collaborators: Collaborators,
    tx: mpsc::Sender<Msg>,
    rx: mpsc::Receiver<Msg>,
    orientation_task: Option<JoinHandle<()>>,
}

impl App {
    pub fn new(config: PuttlineConfig, collaborators: Collaborators) -> Self {
        let (tx, rx) = mpsc::channel(QUEUE_SIZE);
        Self {
            coordinator: CaptureCoordinator::new(config),
            collaborators,
            tx,
            rx,
            orientation_task: None,
        }
    }

    pub fn coordinator(&self) -> &CaptureCoordinator {
        &self.coordinator
    }

    /// Run one message through the coordinator and start its effects
    pub fn dispatch(&mut self, msg: Msg) {
        for effect in self.coordinator.update(msg) {
            self.execute(effect);
        }
    }

    fn reply(&self, task: impl Future<Output = Msg> + Send + 'static) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let msg = task.await;
            if tx.send(msg).await.is_err() {
                log::debug!("Session queue closed, dropping reply");
            }
        });
    }

    fn execute(&mut self, effect: Effect) {
        log::debug!("Effect: {:?}", EffectName(&effect));
        match effect {
            Effect::StartCamera { facing, hint } => {
                let start = self.collaborators.camera.start(facing, hint);
                self.reply(async move { Msg::CameraStarted(start.await) });
            }
            Effect::StopCamera => self.collaborators.camera.stop(),
            Effect::CaptureStill { ticket, quality } => {
                let capture = self.collaborators.camera.capture_still(quality);
                self.reply(async move {
                    let result = capture.await.and_then(CapturedImage::from_frame);
                    Msg::FrameCaptured { ticket, result }
                });
            }
            Effect::ScheduleLongPress(timer) => {
                self.reply(async move {
                    tokio::time::sleep(timer.delay).await;
                    Msg::LongPressElapsed(timer.generation)
                });
            }
            Effect::Pulse(intensity) => self.collaborators.haptics.pulse(intensity),
            Effect::Analyze { ticket, request } => {
                let analyze = self.collaborators.gateway.analyze(request);
                self.reply(async move {
                    let result = analysis::settle(analyze.await);
                    Msg::AnalysisFinished { ticket, result }
                });
            }
            Effect::StartOrientation => self.start_orientation(),
            Effect::StopOrientation => {
                self.collaborators.orientation.stop();
                if let Some(task) = self.orientation_task.take() {
                    task.abort();
                }
            }
        }
    }

    fn start_orientation(&mut self) {
        if let Some(task) = self.orientation_task.take() {
            task.abort();
        }
        let source = self.collaborators.orientation.clone();
        let tx = self.tx.clone();
        self.orientation_task = Some(tokio::spawn(async move {
            let permission = source.request_permission().await;
            if tx.send(Msg::OrientationPermission(permission)).await.is_err() {
                return;
            }
            if permission != PermissionState::Granted {
                return;
            }
            let mut samples = source.samples();
            while let Some(sample) = samples.next().await {
                if tx.send(Msg::Orientation(sample)).await.is_err() {
                    break;
                }
            }
        }));
    }

    /// Handle messages as they arrive for `duration`
    pub async fn pump_for(&mut self, duration: Duration) {
        let deadline = tokio::time::Instant::now() + duration;
        loop {
            tokio::select! {
                msg = self.rx.recv() => match msg {
                    Some(msg) => self.dispatch(msg),
                    None => break,
                },
                _ = tokio::time::sleep_until(deadline) => break,
            }
        }
    }

    /// Handle messages until `done` holds or `timeout` passes. Returns
    /// whether the condition was reached.
    pub async fn pump_until(
        &mut self,
        timeout: Duration,
        done: impl Fn(&CaptureCoordinator) -> bool,
    ) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while !done(&self.coordinator) {
            tokio::select! {
                msg = self.rx.recv() => match msg {
                    Some(msg) => self.dispatch(msg),
                    None => return false,
                },
                _ = tokio::time::sleep_until(deadline) => return false,
            }
        }
        true
    }
}

impl Drop for App {
    fn drop(&mut self) {
        if let Some(task) = self.orientation_task.take() {
            task.abort();
        }
    }
}

/// Effect without its payload, for logs (requests carry whole images)
struct EffectName<'a>(&'a Effect);

impl std::fmt::Debug for EffectName<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Effect::Analyze { ticket, request } => write!(
                f,
                "Analyze {{ ticket: {}, image: {}x{} }}",
                ticket, request.image_width, request.image_height
            ),
            other => write!(f, "{other:?}"),
        }
    }
}
