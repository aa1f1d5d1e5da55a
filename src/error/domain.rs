//! Domain-specific error types using `thiserror`.
//!
//! This module aggregates the module-level errors into one enum per domain:
//! the audio subsystem and the preferences dialog.

use std::result::Result as StdResult;

use {anyhow::Error, thiserror::Error};

use crate::{
    audio::{BackendError, WorkerError},
    ui::preferences::{ApplyError, PanelError},
};

/// Audio-related errors.
#[derive(Error, Debug)]
pub enum AudioError {
    /// A backend could not be opened.
    #[error("Backend error: {0}")]
    BackendError(#[from] BackendError),
    /// A worker failed to start or stop.
    #[error("Worker error: {0}")]
    WorkerError(#[from] WorkerError),
    /// Invalid operation for current state.
    #[error("Invalid operation: {reason}")]
    InvalidOperation { reason: String },
}

/// Preferences-related errors.
#[derive(Error, Debug)]
pub enum PreferencesError {
    /// A panel rejected its values.
    #[error("Panel error: {0}")]
    PanelError(#[from] PanelError),
    /// Applying the edited settings failed.
    #[error("Apply error: {0}")]
    ApplyError(#[from] ApplyError),
}

/// Operational error context propagation with `anyhow`.
pub type Result<T> = StdResult<T, Error>;
