//! Scripted host: replays recorded host signals into a keyboard session.
//!
//! A scenario is a TOML file describing the device the keyboard starts on
//! and the ordered list of signals the host delivers:
//!
//! ```toml
//! [device]
//! family = "pad"
//! width = 768
//! height = 1024
//! locale = "en-US"
//!
//! [[steps]]
//! kind = "host_changed"
//! has_dictation_key = true
//!
//! [[steps]]
//! kind = "frame_settled"
//! view_width = 320
//! screen_size = { width = 768, height = 1024 }
//! ```
//!
//! # Delivery model (for beginners)
//!
//! [`ScriptedHost::spawn`] starts a Tokio task that pushes each step into a
//! bounded `mpsc` channel, yielding between steps the way a real host
//! returns to its run loop.  [`drive`] runs on the session's owner task: it
//! queues every signal that is already waiting, then drains the session's
//! deferred queue once the burst is over.  Signals that arrive in the same
//! burst can therefore supersede each other, exactly as they would when a
//! host reports several values within one UI pass.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use softkey_core::{DeviceFamily, LocaleId, RuntimeContext, ScreenSize};

use crate::application::reconcile::PassOutcome;
use crate::application::session::{HostSignal, KeyboardSession};

/// Capacity of the host → session channel.
const CHANNEL_CAPACITY: usize = 64;

/// Error type for scenario loading.
#[derive(Debug, Error)]
pub enum ScriptError {
    /// The scenario file could not be read.
    #[error("I/O error reading scenario at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The scenario TOML is malformed.
    #[error("failed to parse scenario TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

/// The device a scenario starts on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceSetup {
    pub family: DeviceFamily,
    pub width: u32,
    pub height: u32,
    /// Initial locale; the configured default locale when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<LocaleId>,
}

impl DeviceSetup {
    pub fn screen_size(&self) -> ScreenSize {
        ScreenSize::new(self.width, self.height)
    }

    /// Creates the runtime context a session on this device starts with.
    pub fn context(&self, default_locale: &LocaleId) -> RuntimeContext {
        let locale = self.locale.clone().unwrap_or_else(|| default_locale.clone());
        RuntimeContext::new(locale, self.family, self.screen_size())
    }
}

/// A recorded host session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioScript {
    pub device: DeviceSetup,
    #[serde(default)]
    pub steps: Vec<HostSignal>,
}

/// Parses a scenario from TOML text.
///
/// # Errors
///
/// Returns [`ScriptError::Parse`] if the text is not a valid scenario.
pub fn parse_script(content: &str) -> Result<ScenarioScript, ScriptError> {
    Ok(toml::from_str(content)?)
}

/// Reads and parses a scenario file.
///
/// # Errors
///
/// Returns [`ScriptError::Io`] if the file cannot be read and
/// [`ScriptError::Parse`] if it is malformed.
pub fn load_script(path: &Path) -> Result<ScenarioScript, ScriptError> {
    let content = std::fs::read_to_string(path).map_err(|source| ScriptError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_script(&content)
}

/// Delivers recorded signals over a channel.
#[derive(Debug, Clone)]
pub struct ScriptedHost {
    steps: Vec<HostSignal>,
}

impl ScriptedHost {
    pub fn new(steps: Vec<HostSignal>) -> Self {
        Self { steps }
    }

    /// Spawns the delivery task and returns the receiving end.
    ///
    /// The task ends after the last step or when the receiver is dropped.
    pub fn spawn(self) -> (mpsc::Receiver<HostSignal>, JoinHandle<usize>) {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let handle = tokio::spawn(self.run(tx));
        (rx, handle)
    }

    /// Sends every step in order; returns how many were delivered.
    pub async fn run(self, tx: mpsc::Sender<HostSignal>) -> usize {
        let mut delivered = 0;
        for signal in self.steps {
            if tx.send(signal).await.is_err() {
                debug!(delivered, "session closed the channel; stopping host");
                break;
            }
            delivered += 1;
            tokio::task::yield_now().await;
        }
        delivered
    }
}

/// Feeds signals from `rx` into `session` until the channel closes.
///
/// Each burst of already-waiting signals is queued first, then the session's
/// deferred passes run.  A failed re-resolution is logged and the remaining
/// passes still run; the session keeps its last published layout and retries
/// on its next pass.  Failed passes produce no outcome.
pub async fn drive(
    session: &mut KeyboardSession,
    mut rx: mpsc::Receiver<HostSignal>,
) -> Vec<PassOutcome> {
    let mut outcomes = Vec::new();
    while let Some(signal) = rx.recv().await {
        session.receive(signal);
        while let Ok(next) = rx.try_recv() {
            session.receive(next);
        }
        // Each failure consumes one pass, so this ends once the queue drains.
        loop {
            match session.run_pending() {
                Ok(ran) => {
                    outcomes.extend(ran);
                    break;
                }
                Err(e) => warn!(session = %session.id(), error = %e, "layout not refreshed"),
            }
        }
    }
    info!(session = %session.id(), passes = outcomes.len(), "host channel closed");
    outcomes
}
