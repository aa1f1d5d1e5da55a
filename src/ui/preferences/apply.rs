//! Commits edited settings and restarts the audio workers that depend on them.
//!
//! The sequence is all-or-nothing up to the commit: a panel rejecting its
//! values or an old worker failing to stop leaves the live settings as they
//! were. New workers are only started after both old ones have terminated,
//! so no two workers ever own the same device.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use {
    thiserror::Error,
    tracing::{debug, info},
};

use crate::{
    audio::{AudioBackendRegistry, WorkerError},
    error::{AudioError, ErrorReporter},
    state::AppState,
    ui::preferences::panel::{Panel, PanelError, SharedSnapshot},
};

/// Error type for the apply sequence.
#[derive(Error, Debug)]
pub enum ApplyError {
    /// A panel rejected its values; nothing was changed.
    #[error("Panel '{panel}' rejected its settings: {source}")]
    PanelSave { panel: String, source: PanelError },
    /// An old worker did not terminate; settings were not committed and no
    /// worker is running.
    #[error("Previous audio workers did not stop: {0}")]
    WorkerShutdown(#[from] WorkerError),
    /// The new workers could not be installed.
    #[error("Failed to start audio: {0}")]
    Audio(#[from] AudioError),
}

/// Configuration for the apply sequence.
#[derive(Debug, Clone)]
pub struct ApplyConfig {
    /// How long to wait for both old workers to terminate.
    pub shutdown_timeout: Duration,
}

impl Default for ApplyConfig {
    fn default() -> Self {
        Self {
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

/// Outcome of a successful apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyReport {
    /// Backend of the running input worker, if one started.
    pub input: Option<String>,
    /// Backend of the running output worker, if one started.
    pub output: Option<String>,
    /// Whether the committed settings were written to disk.
    pub persisted: bool,
}

/// Moves a dialog's working snapshot into effect.
pub struct ApplyCoordinator {
    app_state: Arc<AppState>,
    backends: Arc<AudioBackendRegistry>,
    config: ApplyConfig,
}

impl ApplyCoordinator {
    /// Creates a coordinator for `app_state`.
    pub fn new(
        app_state: Arc<AppState>,
        backends: Arc<AudioBackendRegistry>,
        config: ApplyConfig,
    ) -> Self {
        Self {
            app_state,
            backends,
            config,
        }
    }

    /// Runs the apply sequence.
    ///
    /// # Arguments
    ///
    /// * `panels` - Every panel of the dialog, in page order
    /// * `working` - The snapshot the panels save into
    ///
    /// # Errors
    ///
    /// Returns `ApplyError::PanelSave` before anything live is touched, or
    /// `ApplyError::WorkerShutdown` if an old worker outlives the timeout.
    /// A worker that timed out is waited for again on the next apply.
    pub fn apply(
        &self,
        panels: &mut [Box<dyn Panel>],
        working: &SharedSnapshot,
    ) -> Result<ApplyReport, ApplyError> {
        for panel in panels.iter_mut() {
            panel.save().map_err(|source| ApplyError::PanelSave {
                panel: panel.title().to_string(),
                source,
            })?;
        }
        let settings = working.read().clone();

        let released = self.app_state.release_audio_workers();
        let count = released.len();
        let started = Instant::now();
        if let Err(e) = self
            .app_state
            .await_released(released, self.config.shutdown_timeout)
        {
            ErrorReporter::error(&e, "stopping audio workers");
            return Err(e.into());
        }
        debug!(
            "{} audio worker(s) stopped in {:?}",
            count,
            started.elapsed()
        );
        self.app_state.notify_workers_stopped();

        self.app_state.commit_settings(settings);

        for panel in panels.iter_mut() {
            panel.accept();
        }

        self.app_state.start_audio(&self.backends)?;

        self.app_state.reset_hotkeys();

        let persisted = match self.app_state.settings().persist() {
            Ok(()) => true,
            Err(e) => {
                ErrorReporter::warn(&e, "persisting settings");
                false
            }
        };

        let report = ApplyReport {
            input: self
                .app_state
                .audio_input()
                .map(|worker| worker.backend().to_string()),
            output: self
                .app_state
                .audio_output()
                .map(|worker| worker.backend().to_string()),
            persisted,
        };
        info!(
            "Settings applied: input={:?}, output={:?}, persisted={}",
            report.input, report.output, report.persisted
        );

        Ok(report)
    }
}
