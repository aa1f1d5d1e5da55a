//! Audio output preferences page.

use std::{ops::RangeInclusive, sync::Arc};

use tracing::debug;

use crate::{
    audio::{AudioBackendRegistry, WorkerKind},
    config::{NO_BACKEND, UserSettings},
    ui::preferences::panel::{
        Control, Panel, PanelContext, PanelError, SharedSnapshot, check_range,
    },
};

/// Accepted playback volume, in percent.
pub const OUTPUT_VOLUME_RANGE: RangeInclusive<u32> = 0..=200;
/// Accepted jitter buffer length, in milliseconds.
pub const JITTER_BUFFER_RANGE_MS: RangeInclusive<u32> = 10..=500;

/// Audio output preferences page with playback backend and buffering.
pub struct AudioOutputPanel {
    working: SharedSnapshot,
    backends: Arc<AudioBackendRegistry>,
    system: Control<String>,
    device: Control<Option<String>>,
    volume: Control<u32>,
    jitter_buffer_ms: Control<u32>,
}

impl AudioOutputPanel {
    /// Creates the page with controls showing defaults until loaded.
    pub fn new(ctx: &PanelContext) -> Self {
        let defaults = UserSettings::default();
        Self {
            working: Arc::clone(&ctx.working),
            backends: Arc::clone(&ctx.backends),
            system: Control::new(defaults.audio_output),
            device: Control::new(defaults.output_device),
            volume: Control::new(defaults.output_volume),
            jitter_buffer_ms: Control::new(defaults.jitter_buffer_ms),
        }
    }

    /// Backend names offered in the system list, `"none"` first.
    pub fn system_choices(&self) -> Vec<String> {
        let mut choices = vec![NO_BACKEND.to_string()];
        choices.extend(self.backends.output_names());
        choices
    }

    /// Selects the playback backend.
    pub fn set_system(&mut self, name: &str) {
        self.system.set(name.to_string());
    }

    /// Selects the playback device, `None` for the system default.
    pub fn set_device(&mut self, device: Option<String>) {
        self.device.set(device);
    }

    /// Sets the playback volume.
    pub fn set_volume(&mut self, percent: u32) {
        self.volume.set(percent);
    }

    /// Sets the jitter buffer length.
    pub fn set_jitter_buffer_ms(&mut self, buffer_ms: u32) {
        self.jitter_buffer_ms.set(buffer_ms);
    }

    /// Selected playback backend.
    pub fn system(&self) -> &str {
        self.system.value()
    }

    /// Jitter buffer control.
    pub fn jitter_buffer(&self) -> &Control<u32> {
        &self.jitter_buffer_ms
    }
}

impl Panel for AudioOutputPanel {
    fn title(&self) -> &str {
        "Audio Output"
    }

    fn icon_name(&self) -> &str {
        "audio-speakers-symbolic"
    }

    fn load(&mut self, settings: &UserSettings) {
        self.system.load(settings.audio_output.clone());
        self.device.load(settings.output_device.clone());
        self.volume.load(settings.output_volume);
        self.jitter_buffer_ms.load(settings.jitter_buffer_ms);
    }

    fn save(&mut self) -> Result<(), PanelError> {
        let system = self.system.value();
        if !self.backends.is_valid_choice(WorkerKind::Output, system) {
            return Err(PanelError::InvalidValue {
                field: "audio_output",
                reason: format!("unknown backend '{system}'"),
            });
        }
        check_range("output_volume", *self.volume.value(), OUTPUT_VOLUME_RANGE)?;
        check_range(
            "jitter_buffer_ms",
            *self.jitter_buffer_ms.value(),
            JITTER_BUFFER_RANGE_MS,
        )?;

        let mut working = self.working.write();
        working.audio_output = system.clone();
        working.output_device = self.device.value().clone();
        working.output_volume = *self.volume.value();
        working.jitter_buffer_ms = *self.jitter_buffer_ms.value();
        debug!("AudioOutputPanel: Saved, backend '{}'", working.audio_output);
        Ok(())
    }

    fn is_expert_visible(&self, _expert: bool) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::RwLock;

    use crate::{
        audio::AudioBackendRegistry,
        config::UserSettings,
        ui::preferences::{
            AudioOutputPanel,
            panel::{Panel, PanelContext, PanelError},
        },
    };

    fn context() -> PanelContext {
        PanelContext {
            working: Arc::new(RwLock::new(UserSettings::default())),
            backends: Arc::new(AudioBackendRegistry::with_default_backends()),
        }
    }

    #[test]
    fn test_edits_reach_snapshot_only_on_save() {
        let ctx = context();
        let mut panel = AudioOutputPanel::new(&ctx);
        panel.load(&UserSettings::default());
        panel.set_system("none");
        panel.set_jitter_buffer_ms(120);
        panel.set_volume(150);
        assert_eq!(ctx.working.read().audio_output, "cpal");

        panel.save().unwrap();
        let working = ctx.working.read();
        assert_eq!(working.audio_output, "none");
        assert_eq!(working.jitter_buffer_ms, 120);
        assert_eq!(working.output_volume, 150);
    }

    #[test]
    fn test_jitter_buffer_out_of_range_is_rejected() {
        let ctx = context();
        let mut panel = AudioOutputPanel::new(&ctx);
        panel.set_jitter_buffer_ms(900);
        assert!(matches!(
            panel.save(),
            Err(PanelError::InvalidValue {
                field: "jitter_buffer_ms",
                ..
            })
        ));
    }

    #[test]
    fn test_load_is_idempotent() {
        let ctx = context();
        let mut panel = AudioOutputPanel::new(&ctx);
        let settings = UserSettings {
            jitter_buffer_ms: 80,
            ..UserSettings::default()
        };
        panel.load(&settings);
        panel.load(&settings);
        assert_eq!(*panel.jitter_buffer().value(), 80);
        assert_eq!(panel.jitter_buffer().notifications(), 1);
        assert_eq!(panel.system_choices(), vec!["none", "null", "cpal"]);
    }
}
