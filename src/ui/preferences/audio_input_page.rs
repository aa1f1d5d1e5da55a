//! Audio input preferences page.
//!
//! Capture backend and device selection, transmission mode, voice hold and
//! capture volume.

use std::{ops::RangeInclusive, sync::Arc};

use tracing::debug;

use crate::{
    audio::{AudioBackendRegistry, WorkerKind},
    config::{NO_BACKEND, TransmitMode, UserSettings},
    ui::preferences::panel::{
        Control, Panel, PanelContext, PanelError, SharedSnapshot, check_range,
    },
};

/// Accepted voice hold, in milliseconds.
pub const VOICE_HOLD_RANGE_MS: RangeInclusive<u32> = 20..=5000;
/// Accepted capture volume, in percent.
pub const INPUT_VOLUME_RANGE: RangeInclusive<u32> = 0..=200;

/// Audio input preferences page.
pub struct AudioInputPanel {
    working: SharedSnapshot,
    backends: Arc<AudioBackendRegistry>,
    system: Control<String>,
    device: Control<Option<String>>,
    transmit_mode: Control<TransmitMode>,
    voice_hold_ms: Control<u32>,
    volume: Control<u32>,
}

impl AudioInputPanel {
    /// Creates the page with controls showing defaults until loaded.
    pub fn new(ctx: &PanelContext) -> Self {
        let defaults = UserSettings::default();
        Self {
            working: Arc::clone(&ctx.working),
            backends: Arc::clone(&ctx.backends),
            system: Control::new(defaults.audio_input),
            device: Control::new(defaults.input_device),
            transmit_mode: Control::new(defaults.transmit_mode),
            voice_hold_ms: Control::new(defaults.voice_hold_ms),
            volume: Control::new(defaults.input_volume),
        }
    }

    /// Backend names offered in the system list, `"none"` first.
    pub fn system_choices(&self) -> Vec<String> {
        let mut choices = vec![NO_BACKEND.to_string()];
        choices.extend(self.backends.input_names());
        choices
    }

    /// Selects the capture backend.
    pub fn set_system(&mut self, name: &str) {
        self.system.set(name.to_string());
    }

    /// Selects the capture device, `None` for the system default.
    pub fn set_device(&mut self, device: Option<String>) {
        self.device.set(device);
    }

    /// Selects the transmission mode.
    pub fn set_transmit_mode(&mut self, mode: TransmitMode) {
        self.transmit_mode.set(mode);
    }

    /// Sets the voice hold.
    pub fn set_voice_hold_ms(&mut self, hold_ms: u32) {
        self.voice_hold_ms.set(hold_ms);
    }

    /// Sets the capture volume.
    pub fn set_volume(&mut self, percent: u32) {
        self.volume.set(percent);
    }

    /// Selected capture backend.
    pub fn system(&self) -> &str {
        self.system.value()
    }

    /// Selected transmission mode.
    pub fn transmit_mode(&self) -> TransmitMode {
        *self.transmit_mode.value()
    }

    /// Voice hold control.
    pub fn voice_hold(&self) -> &Control<u32> {
        &self.voice_hold_ms
    }

    /// Text shown next to the voice hold slider.
    pub fn voice_hold_label(&self) -> String {
        let hold_ms = *self.voice_hold_ms.value();
        if hold_ms < 1000 {
            format!("{hold_ms} ms")
        } else {
            format!("{:.2} s", f64::from(hold_ms) / 1000.0)
        }
    }

    /// Whether the voice hold slider is enabled.
    pub fn voice_hold_enabled(&self) -> bool {
        *self.transmit_mode.value() == TransmitMode::VoiceActivity
    }
}

impl Panel for AudioInputPanel {
    fn title(&self) -> &str {
        "Audio Input"
    }

    fn icon_name(&self) -> &str {
        "audio-input-microphone-symbolic"
    }

    fn load(&mut self, settings: &UserSettings) {
        self.system.load(settings.audio_input.clone());
        self.device.load(settings.input_device.clone());
        self.transmit_mode.load(settings.transmit_mode);
        self.voice_hold_ms.load(settings.voice_hold_ms);
        self.volume.load(settings.input_volume);
    }

    fn save(&mut self) -> Result<(), PanelError> {
        let system = self.system.value();
        if !self.backends.is_valid_choice(WorkerKind::Input, system) {
            return Err(PanelError::InvalidValue {
                field: "audio_input",
                reason: format!("unknown backend '{system}'"),
            });
        }
        check_range("voice_hold_ms", *self.voice_hold_ms.value(), VOICE_HOLD_RANGE_MS)?;
        check_range("input_volume", *self.volume.value(), INPUT_VOLUME_RANGE)?;

        let mut working = self.working.write();
        working.audio_input = system.clone();
        working.input_device = self.device.value().clone();
        working.transmit_mode = *self.transmit_mode.value();
        working.voice_hold_ms = *self.voice_hold_ms.value();
        working.input_volume = *self.volume.value();
        debug!("AudioInputPanel: Saved, backend '{}'", working.audio_input);
        Ok(())
    }

    fn is_expert_visible(&self, _expert: bool) -> bool {
        true
    }
}
