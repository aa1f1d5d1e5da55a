//! Registry of preference panel factories.
//!
//! Pages are ordered by priority, lowest first. Factories registered with
//! the same priority keep their registration order.

use std::{collections::BTreeMap, sync::Arc};

use tracing::debug;

use crate::ui::preferences::{
    AudioInputPanel, AudioOutputPanel, NetworkPanel, ShortcutsPanel,
    panel::{Panel, PanelContext},
};

/// Builds one panel against a dialog's working snapshot.
pub type PanelFactory = Arc<dyn Fn(&PanelContext) -> Box<dyn Panel> + Send + Sync>;

/// Priority of the audio input page.
pub const AUDIO_INPUT_PRIORITY: i32 = 1000;
/// Priority of the audio output page.
pub const AUDIO_OUTPUT_PRIORITY: i32 = 1010;
/// Priority of the shortcuts page.
pub const SHORTCUTS_PRIORITY: i32 = 1020;
/// Priority of the network page.
pub const NETWORK_PRIORITY: i32 = 1030;

/// Token identifying one registration, ordered by priority then sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PanelRegistration {
    priority: i32,
    sequence: u64,
}

impl PanelRegistration {
    /// Priority this registration was made with.
    #[must_use]
    pub fn priority(&self) -> i32 {
        self.priority
    }
}

/// Priority-ordered panel factories.
#[derive(Default)]
pub struct PanelRegistry {
    factories: BTreeMap<PanelRegistration, PanelFactory>,
    next_sequence: u64,
}

impl PanelRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in pages.
    #[must_use]
    pub fn with_builtin_panels() -> Self {
        let mut registry = Self::new();
        registry.register(AUDIO_INPUT_PRIORITY, |ctx| {
            Box::new(AudioInputPanel::new(ctx))
        });
        registry.register(AUDIO_OUTPUT_PRIORITY, |ctx| {
            Box::new(AudioOutputPanel::new(ctx))
        });
        registry.register(SHORTCUTS_PRIORITY, |ctx| Box::new(ShortcutsPanel::new(ctx)));
        registry.register(NETWORK_PRIORITY, |ctx| Box::new(NetworkPanel::new(ctx)));
        registry
    }

    /// Adds a factory at `priority`.
    ///
    /// # Returns
    ///
    /// The token to pass to `unregister`.
    pub fn register<F>(&mut self, priority: i32, factory: F) -> PanelRegistration
    where
        F: Fn(&PanelContext) -> Box<dyn Panel> + Send + Sync + 'static,
    {
        let registration = PanelRegistration {
            priority,
            sequence: self.next_sequence,
        };
        self.next_sequence += 1;
        self.factories.insert(registration, Arc::new(factory));
        debug!("Registered preferences panel at priority {}", priority);
        registration
    }

    /// Removes a registration.
    ///
    /// # Returns
    ///
    /// `false` if it was not registered.
    pub fn unregister(&mut self, registration: PanelRegistration) -> bool {
        self.factories.remove(&registration).is_some()
    }

    /// Number of registered factories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Whether no factory is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Builds every panel in page order.
    pub fn instantiate(&self, ctx: &PanelContext) -> Vec<Box<dyn Panel>> {
        self.factories.values().map(|factory| factory(ctx)).collect()
    }
}
