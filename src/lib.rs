//! Parley - Voice Chat Client Core
//!
//! The settings, audio and preferences core of a voice chat client. Edited
//! preferences are committed atomically, and the capture and playback
//! workers are restarted so that a new worker never shares a device with
//! the one it replaces.

pub mod audio;
pub mod config;
pub mod error;
pub mod state;
pub mod ui;

// Re-export key types for convenience
pub use {
    audio::{AudioBackendRegistry, AudioWorker, WorkerKind},
    config::{SettingsManager, UserSettings},
    error::{AudioError, PreferencesError},
    state::{AppState, AppStateEvent},
    ui::{PanelRegistry, PreferencesDialog},
};
