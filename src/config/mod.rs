//! User settings and their persistent storage.
//!
//! This module provides the settings snapshot type edited by the preferences
//! dialog and the live store it is committed into.

pub mod settings;

pub use settings::{
    NO_BACKEND, SettingsError, SettingsManager, ShortcutAction, ShortcutBinding, TransmitMode,
    UserSettings, get_config_path,
};
