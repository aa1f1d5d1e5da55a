//! The panel contract shared by every preferences page.
//!
//! A panel keeps the values of its controls locally. `load` pushes settings
//! into the controls, `save` validates them and writes them into the
//! dialog's working snapshot, which is only made live by the apply path.

use std::{any::Any, ops::RangeInclusive, sync::Arc};

use {parking_lot::RwLock, thiserror::Error};

use crate::{audio::AudioBackendRegistry, config::UserSettings};

/// The working copy of the settings shared by the panels of one dialog.
pub type SharedSnapshot = Arc<RwLock<UserSettings>>;

/// Error type for panel validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PanelError {
    /// A control holds a value the settings cannot accept.
    #[error("Invalid {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// What a panel factory receives.
#[derive(Clone)]
pub struct PanelContext {
    /// Working snapshot panels save into.
    pub working: SharedSnapshot,
    /// Available audio backends, for choice lists and validation.
    pub backends: Arc<AudioBackendRegistry>,
}

/// One page of the preferences dialog.
pub trait Panel: Any {
    /// Page title shown in the page list.
    fn title(&self) -> &str;

    /// Icon shown next to the title.
    fn icon_name(&self) -> &str {
        "preferences-other-symbolic"
    }

    /// Pushes `settings` into the panel's controls.
    fn load(&mut self, settings: &UserSettings);

    /// Validates the controls and writes them into the working snapshot.
    ///
    /// # Errors
    ///
    /// Returns `PanelError` without touching the snapshot if a control
    /// holds an invalid value.
    fn save(&mut self) -> Result<(), PanelError>;

    /// Called after the working snapshot has been made live.
    fn accept(&mut self) {}

    /// Whether the page is listed while expert mode is `expert`.
    fn is_expert_visible(&self, expert: bool) -> bool;
}

/// The value behind one control, with change notification counting.
///
/// Loading the value a control already shows does not notify again, so
/// repeated loads are idempotent. The first load always notifies so that
/// dependent displays are initialised.
#[derive(Debug, Clone, Default)]
pub struct Control<T> {
    value: T,
    loaded: bool,
    notifications: u64,
}

impl<T: Clone + PartialEq> Control<T> {
    /// Creates a control showing `value` that has not been loaded yet.
    pub fn new(value: T) -> Self {
        Self {
            value,
            loaded: false,
            notifications: 0,
        }
    }

    /// Shows `value` as coming from settings.
    pub fn load(&mut self, value: T) {
        if !self.loaded || self.value != value {
            self.value = value;
            self.notifications += 1;
        }
        self.loaded = true;
    }

    /// Changes the value as a user edit would.
    pub fn set(&mut self, value: T) {
        if self.value != value {
            self.value = value;
            self.notifications += 1;
        }
    }

    /// Current value.
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Number of change notifications emitted so far.
    pub fn notifications(&self) -> u64 {
        self.notifications
    }
}

/// Checks that `value` lies in `range`.
pub(crate) fn check_range(
    field: &'static str,
    value: u32,
    range: RangeInclusive<u32>,
) -> Result<(), PanelError> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(PanelError::InvalidValue {
            field,
            reason: format!(
                "{value} is outside {}..={}",
                range.start(),
                range.end()
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::ui::preferences::panel::{Control, PanelError, check_range};

    #[test]
    fn test_first_load_notifies_even_when_unchanged() {
        let mut control = Control::new(250_u32);
        control.load(250);
        assert_eq!(control.notifications(), 1);
    }

    #[test]
    fn test_repeated_load_is_idempotent() {
        let mut control = Control::new(0_u32);
        control.load(500);
        control.load(500);
        control.load(500);
        assert_eq!(*control.value(), 500);
        assert_eq!(control.notifications(), 1);

        control.load(600);
        assert_eq!(control.notifications(), 2);
    }

    #[test]
    fn test_set_only_notifies_on_change() {
        let mut control = Control::new(String::from("cpal"));
        control.set("cpal".to_string());
        assert_eq!(control.notifications(), 0);
        control.set("null".to_string());
        assert_eq!(control.notifications(), 1);
    }

    #[test]
    fn test_check_range() {
        assert!(check_range("jitter_buffer_ms", 40, 10..=500).is_ok());
        assert_eq!(
            check_range("jitter_buffer_ms", 5, 10..=500),
            Err(PanelError::InvalidValue {
                field: "jitter_buffer_ms",
                reason: "5 is outside 10..=500".to_string(),
            })
        );
    }
}
