//! User settings and the live settings store.
//!
//! `UserSettings` is the value-type snapshot edited by the preferences
//! dialog. `SettingsManager` holds the live copy behind a lock and persists
//! it to an XDG-compliant JSON file.

use std::{
    env::var,
    fs::{create_dir_all, read_to_string, write},
    io::Error as StdError,
    path::PathBuf,
};

use {
    parking_lot::{RwLock, RwLockReadGuard},
    serde::{Deserialize, Serialize},
    serde_json::{Error as SerdeJsonError, from_str, to_string_pretty},
    thiserror::Error,
    tracing::debug,
};

/// Backend name that disables an audio direction.
pub const NO_BACKEND: &str = "none";

/// Error type for settings operations.
#[derive(Error, Debug)]
pub enum SettingsError {
    /// Failed to read or write settings file.
    #[error("IO error: {0}")]
    IoError(#[from] StdError),
    /// Failed to serialize or deserialize settings.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] SerdeJsonError),
}

/// How captured audio is gated before transmission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TransmitMode {
    /// Always transmit.
    Continuous,
    /// Transmit while speech is detected.
    #[default]
    VoiceActivity,
    /// Transmit while a push-to-talk key is held.
    PushToTalk,
}

/// Actions that can be bound to global shortcuts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShortcutAction {
    /// Transmit while held.
    PushToTalk,
    /// Transmit to the alternate target while held.
    AltSpeak,
    /// Toggle self-mute.
    MuteSelf,
    /// Toggle self-deafen.
    DeafenSelf,
}

/// One shortcut binding: an action and the key combination triggering it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortcutBinding {
    /// The bound action.
    pub action: ShortcutAction,
    /// Key names making up the combination, e.g. `["Ctrl", "F1"]`.
    pub keys: Vec<String>,
}

/// Serializable user settings structure with default values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSettings {
    /// Audio input backend name (`"none"` disables capture).
    pub audio_input: String,
    /// Audio output backend name (`"none"` disables playback).
    pub audio_output: String,
    /// Capture device name, `None` for the system default.
    pub input_device: Option<String>,
    /// Playback device name, `None` for the system default.
    pub output_device: Option<String>,
    /// Transmission gating mode.
    pub transmit_mode: TransmitMode,
    /// How long transmission continues after speech stops, in milliseconds.
    pub voice_hold_ms: u32,
    /// Capture gain in percent.
    pub input_volume: u32,
    /// Playback gain in percent.
    pub output_volume: u32,
    /// Jitter buffer length in milliseconds.
    pub jitter_buffer_ms: u32,
    /// Audio frames sent per network packet.
    pub frames_per_packet: u8,
    /// Global shortcut bindings.
    pub shortcuts: Vec<ShortcutBinding>,
    /// Whether expert-only preference pages are shown.
    pub expert: bool,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            audio_input: "cpal".to_string(),
            audio_output: "cpal".to_string(),
            input_device: None,
            output_device: None,
            transmit_mode: TransmitMode::default(),
            voice_hold_ms: 250,
            input_volume: 100,
            output_volume: 100,
            jitter_buffer_ms: 40,
            frames_per_packet: 2,
            shortcuts: vec![],
            expert: false,
        }
    }
}

/// Live settings store shared by the whole application.
///
/// Readers take short read locks; the apply coordinator replaces the whole
/// value under one write lock, so no reader ever sees a mix of old and new
/// fields.
#[derive(Debug)]
pub struct SettingsManager {
    /// Thread-safe user settings storage.
    settings: RwLock<UserSettings>,
    /// Path to the configuration file on disk.
    config_path: PathBuf,
}

impl SettingsManager {
    /// Creates a new settings manager with default config path.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if settings cannot be loaded from disk.
    pub fn new() -> Result<Self, SettingsError> {
        Self::with_config_path(get_config_path())
    }

    /// Creates a new settings manager with a custom config path (for testing).
    ///
    /// # Arguments
    ///
    /// * `config_path` - Custom path for the settings file
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if the directory cannot be created or an
    /// existing file cannot be parsed.
    pub fn with_config_path(config_path: PathBuf) -> Result<Self, SettingsError> {
        if let Some(parent) = config_path.parent() {
            create_dir_all(parent)?;
        }

        let settings = if config_path.exists() {
            debug!("Loading settings from existing file: {:?}", config_path);
            let contents = read_to_string(&config_path)?;
            from_str(&contents)?
        } else {
            debug!("No settings file at {:?}, using defaults", config_path);
            UserSettings::default()
        };

        Ok(SettingsManager {
            settings: RwLock::new(settings),
            config_path,
        })
    }

    /// Creates a manager holding `settings` that persists to `config_path`.
    #[must_use]
    pub fn from_settings(settings: UserSettings, config_path: PathBuf) -> Self {
        SettingsManager {
            settings: RwLock::new(settings),
            config_path,
        }
    }

    /// Gets the current settings.
    pub fn get_settings(&self) -> RwLockReadGuard<'_, UserSettings> {
        self.settings.read()
    }

    /// Returns an owned copy of the current settings.
    #[must_use]
    pub fn snapshot(&self) -> UserSettings {
        self.settings.read().clone()
    }

    /// Gets the configuration file path.
    pub fn get_config_path(&self) -> &PathBuf {
        &self.config_path
    }

    /// Replaces the live settings in one step without touching the disk.
    pub fn commit(&self, new_settings: UserSettings) {
        *self.settings.write() = new_settings;
    }

    /// Writes the current settings to disk.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if settings cannot be serialized or written.
    pub fn persist(&self) -> Result<(), SettingsError> {
        debug!("Saving settings to file: {:?}", self.config_path);
        let contents = to_string_pretty(&*self.settings.read())?;
        if let Some(parent) = self.config_path.parent() {
            create_dir_all(parent)?;
        }
        write(&self.config_path, contents)?;
        Ok(())
    }
}

/// Returns the settings file location under the XDG config directory.
#[must_use]
pub fn get_config_path() -> PathBuf {
    let mut config_dir = get_xdg_config_home();
    config_dir.push("parley");
    config_dir.push("settings.json");
    config_dir
}

/// Uses `XDG_CONFIG_HOME` if set, otherwise `$HOME/.config`.
fn get_xdg_config_home() -> PathBuf {
    if let Ok(config_home) = var("XDG_CONFIG_HOME")
        && !config_home.is_empty()
    {
        return PathBuf::from(config_home);
    }

    if let Ok(home) = var("HOME") {
        let mut path = PathBuf::from(home);
        path.push(".config");
        return path;
    }

    PathBuf::from(".")
}

#[cfg(test)]
mod tests {
    use serde_json::from_str;
    use tempfile::TempDir;

    use crate::config::settings::{
        SettingsManager, ShortcutAction, ShortcutBinding, TransmitMode, UserSettings,
    };

    #[test]
    fn test_user_settings_default() {
        let settings = UserSettings::default();
        assert_eq!(settings.audio_input, "cpal");
        assert_eq!(settings.audio_output, "cpal");
        assert_eq!(settings.transmit_mode, TransmitMode::VoiceActivity);
        assert_eq!(settings.voice_hold_ms, 250);
        assert!(!settings.expert);
        assert!(settings.shortcuts.is_empty());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let settings: UserSettings = from_str(r#"{"audio_input":"null","expert":true}"#).unwrap();
        assert_eq!(settings.audio_input, "null");
        assert!(settings.expert);
        assert_eq!(settings.jitter_buffer_ms, 40);
    }

    #[test]
    fn test_commit_is_not_persisted_until_persist() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("settings.json");
        let manager = SettingsManager::with_config_path(path.clone()).unwrap();

        let mut changed = manager.snapshot();
        changed.voice_hold_ms = 900;
        changed.shortcuts = vec![ShortcutBinding {
            action: ShortcutAction::PushToTalk,
            keys: vec!["Ctrl".to_string(), "F1".to_string()],
        }];
        manager.commit(changed.clone());

        assert_eq!(manager.get_settings().voice_hold_ms, 900);
        assert!(!path.exists());

        manager.persist().unwrap();
        let reloaded = SettingsManager::with_config_path(path).unwrap();
        assert_eq!(reloaded.snapshot(), changed);
    }
}
