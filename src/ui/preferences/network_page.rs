//! Network preferences page, listed in expert mode only.

use std::sync::Arc;

use crate::{
    config::UserSettings,
    ui::preferences::panel::{
        Control, Panel, PanelContext, PanelError, SharedSnapshot, check_range,
    },
};

/// Network preferences page.
pub struct NetworkPanel {
    working: SharedSnapshot,
    frames_per_packet: Control<u8>,
}

impl NetworkPanel {
    /// Creates the page with controls showing defaults until loaded.
    pub fn new(ctx: &PanelContext) -> Self {
        Self {
            working: Arc::clone(&ctx.working),
            frames_per_packet: Control::new(UserSettings::default().frames_per_packet),
        }
    }

    /// Sets how many 10 ms frames go into one packet.
    pub fn set_frames_per_packet(&mut self, frames: u8) {
        self.frames_per_packet.set(frames);
    }

    /// Text shown next to the packet size slider.
    pub fn latency_label(&self) -> String {
        format!("{} ms", u32::from(*self.frames_per_packet.value()) * 10)
    }
}

impl Panel for NetworkPanel {
    fn title(&self) -> &str {
        "Network"
    }

    fn icon_name(&self) -> &str {
        "network-wired-symbolic"
    }

    fn load(&mut self, settings: &UserSettings) {
        self.frames_per_packet.load(settings.frames_per_packet);
    }

    fn save(&mut self) -> Result<(), PanelError> {
        let frames = *self.frames_per_packet.value();
        check_range("frames_per_packet", u32::from(frames), 1..=10)?;
        self.working.write().frames_per_packet = frames;
        Ok(())
    }

    fn is_expert_visible(&self, expert: bool) -> bool {
        expert
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
            NetworkPanel,
            panel::{Panel, PanelContext},
        },
    };

    #[test]
    fn test_network_page_is_expert_only() {
        let ctx = PanelContext {
            working: Arc::new(RwLock::new(UserSettings::default())),
            backends: Arc::new(AudioBackendRegistry::new()),
        };
        let mut panel = NetworkPanel::new(&ctx);
        assert!(!panel.is_expert_visible(false));
        assert!(panel.is_expert_visible(true));

        panel.set_frames_per_packet(4);
        assert_eq!(panel.latency_label(), "40 ms");
        panel.save().unwrap();
        assert_eq!(ctx.working.read().frames_per_packet, 4);

        panel.set_frames_per_packet(0);
        assert!(panel.save().is_err());
        assert_eq!(ctx.working.read().frames_per_packet, 4);
    }
}
