//! Preferences dialog core.
//!
//! Panels are registered in a `PanelRegistry`, instantiated per dialog
//! session against a working snapshot, and made live by the
//! `ApplyCoordinator`. Rendering is left to the embedding toolkit.

pub mod apply;
pub mod audio_input_page;
pub mod audio_output_page;
pub mod dialog;
pub mod network_page;
pub mod panel;
pub mod registry;
pub mod shortcuts_page;


pub use {
    apply::{ApplyConfig, ApplyCoordinator, ApplyError, ApplyReport},
    audio_input_page::AudioInputPanel,
    audio_output_page::AudioOutputPanel,
    dialog::PreferencesDialog,
    network_page::NetworkPanel,
    panel::{Control, Panel, PanelContext, PanelError, SharedSnapshot},
    registry::{PanelFactory, PanelRegistration, PanelRegistry},
    shortcuts_page::ShortcutsPanel,
};
