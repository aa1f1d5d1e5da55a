//! User interface core, independent of any widget toolkit.
//!
//! Only the preferences dialog lives here: its panels keep their control
//! values in memory so the lifecycle can be driven headlessly.

pub mod preferences;

pub use preferences::{PanelRegistry, PreferencesDialog};
