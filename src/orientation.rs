//! Device orientation collaborator
//!
//! Permission is asked once; after that samples are pushed at whatever rate
//! the sensor likes.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::future::BoxFuture;
use futures::stream::BoxStream;
use futures::{FutureExt, StreamExt};
use serde::{Deserialize, Serialize};

use crate::domain::{OrientationSample, PermissionState};

pub trait OrientationSource: Send + Sync {
    /// Resolves to `Granted` or `Denied`
    fn request_permission(&self) -> BoxFuture<'static, PermissionState>;

    /// Sample stream; ends once `stop` is called
    fn samples(&self) -> BoxStream<'static, OrientationSample>;

    /// Idempotent
    fn stop(&self);
}

/// A sample delivered after waiting `after_ms`
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimedSample {
    #[serde(default)]
    pub after_ms: u64,
    pub pitch: f32,
    pub roll: f32,
}

/// Plays back a fixed list of samples
#[derive(Clone, Debug)]
pub struct ScriptedOrientation {
    permission: PermissionState,
    samples: Vec<TimedSample>,
    stopped: Arc<AtomicBool>,
}

impl ScriptedOrientation {
    pub fn new(granted: bool, samples: Vec<TimedSample>) -> Self {
        Self {
            permission: if granted {
                PermissionState::Granted
            } else {
                PermissionState::Denied
            },
            samples,
            stopped: Arc::default(),
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

impl OrientationSource for ScriptedOrientation {
    fn request_permission(&self) -> BoxFuture<'static, PermissionState> {
        let permission = self.permission;
        async move { permission }.boxed()
    }

    fn samples(&self) -> BoxStream<'static, OrientationSample> {
        self.stopped.store(false, Ordering::SeqCst);
        let stopped = self.stopped.clone();
        futures::stream::iter(self.samples.clone())
            .then(|timed| async move {
                if timed.after_ms > 0 {
                    tokio::time::sleep(Duration::from_millis(timed.after_ms)).await;
                }
                OrientationSample::new(timed.pitch, timed.roll)
            })
            .take_while(move |_| futures::future::ready(!stopped.load(Ordering::SeqCst)))
            .boxed()
    }

    fn stop(&self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            log::debug!("Orientation stream stopped");
        }
    }
}
