//! Main preferences dialog.
//!
//! The `PreferencesDialog` owns one instance of every registered panel and
//! the working snapshot they edit. It routes lifecycle operations to the
//! panels, keeps the page list in sync with expert mode, and hands the
//! panels to the `ApplyCoordinator` on apply.

use std::{any::Any, sync::Arc};

use {parking_lot::RwLock, tracing::debug};

use crate::{
    audio::AudioBackendRegistry,
    config::UserSettings,
    error::PreferencesError,
    state::AppState,
    ui::preferences::{
        apply::{ApplyConfig, ApplyCoordinator, ApplyError, ApplyReport},
        panel::{Panel, PanelContext, PanelError, SharedSnapshot},
        registry::PanelRegistry,
    },
};

/// Preferences dialog session.
pub struct PreferencesDialog {
    app_state: Arc<AppState>,
    coordinator: ApplyCoordinator,
    working: SharedSnapshot,
    panels: Vec<Box<dyn Panel>>,
    /// Indices into `panels` of the listed pages.
    visible: Vec<usize>,
    /// Index into `panels` of the selected page.
    current: Option<usize>,
    expert: bool,
}

impl PreferencesDialog {
    /// Creates a dialog with the default apply configuration.
    ///
    /// # Arguments
    ///
    /// * `registry` - Panel factories to instantiate
    /// * `app_state` - Live application state
    /// * `backends` - Audio backends for choices and worker restarts
    pub fn new(
        registry: &PanelRegistry,
        app_state: Arc<AppState>,
        backends: Arc<AudioBackendRegistry>,
    ) -> Self {
        Self::with_config(registry, app_state, backends, ApplyConfig::default())
    }

    /// Creates a dialog with a custom apply configuration.
    pub fn with_config(
        registry: &PanelRegistry,
        app_state: Arc<AppState>,
        backends: Arc<AudioBackendRegistry>,
        config: ApplyConfig,
    ) -> Self {
        let live = app_state.get_settings();
        let working = Arc::new(RwLock::new(live.clone()));
        let ctx = PanelContext {
            working: Arc::clone(&working),
            backends: Arc::clone(&backends),
        };

        let mut panels = registry.instantiate(&ctx);
        for panel in &mut panels {
            debug!("PreferencesDialog: Adding page '{}'", panel.title());
            panel.load(&live);
        }

        let mut dialog = Self {
            coordinator: ApplyCoordinator::new(Arc::clone(&app_state), backends, config),
            app_state,
            working,
            panels,
            visible: Vec::new(),
            current: None,
            expert: live.expert,
        };
        dialog.set_expert_mode(live.expert);

        debug!("PreferencesDialog: Created with {} pages", dialog.panels.len());
        dialog
    }

    /// Loads `settings` into every panel.
    pub fn load(&mut self, settings: &UserSettings) {
        for panel in &mut self.panels {
            panel.load(settings);
        }
    }

    /// Saves every panel into the working snapshot.
    ///
    /// # Errors
    ///
    /// Returns the first `PanelError`; later panels are not saved.
    pub fn save(&mut self) -> Result<(), PanelError> {
        self.panels.iter_mut().try_for_each(|panel| panel.save())
    }

    /// Tells every panel that its settings are live.
    pub fn accept(&mut self) {
        for panel in &mut self.panels {
            panel.accept();
        }
    }

    /// Reloads the selected page from default settings.
    ///
    /// Other pages and the working snapshot are left alone.
    pub fn restore_defaults(&mut self) {
        if let Some(index) = self.current {
            debug!(
                "PreferencesDialog: Restoring defaults on '{}'",
                self.panels[index].title()
            );
            self.panels[index].load(&UserSettings::default());
        }
    }

    /// Reloads the selected page from the live settings, dropping its edits.
    pub fn reset(&mut self) {
        if let Some(index) = self.current {
            let live = self.app_state.get_settings();
            self.panels[index].load(&live);
        }
    }

    /// Switches expert mode and rebuilds the page list.
    ///
    /// The selected page stays selected if it is still listed, otherwise
    /// the first listed page is selected.
    pub fn set_expert_mode(&mut self, expert: bool) {
        self.expert = expert;
        self.working.write().expert = expert;

        self.visible = self
            .panels
            .iter()
            .enumerate()
            .filter(|(_, panel)| panel.is_expert_visible(expert) || expert)
            .map(|(index, _)| index)
            .collect();

        self.current = self
            .current
            .filter(|index| self.visible.contains(index))
            .or_else(|| self.visible.first().copied());
    }

    /// Whether expert mode is on.
    pub fn is_expert_mode(&self) -> bool {
        self.expert
    }

    /// Titles of the listed pages, in order.
    pub fn visible_pages(&self) -> Vec<&str> {
        self.visible
            .iter()
            .map(|&index| self.panels[index].title())
            .collect()
    }

    /// Title of the selected page.
    pub fn current_page(&self) -> Option<&str> {
        self.current.map(|index| self.panels[index].title())
    }

    /// Selects the listed page titled `title`.
    ///
    /// # Returns
    ///
    /// `false` if no listed page has that title.
    pub fn select_page(&mut self, title: &str) -> bool {
        let found = self
            .visible
            .iter()
            .copied()
            .find(|&index| self.panels[index].title() == title);
        if found.is_some() {
            self.current = found;
        }
        found.is_some()
    }

    /// Typed access to a panel, for driving its controls.
    pub fn panel_mut<P: Panel>(&mut self) -> Option<&mut P> {
        self.panels.iter_mut().find_map(|panel| {
            let panel: &mut dyn Any = &mut **panel;
            panel.downcast_mut::<P>()
        })
    }

    /// Copy of the working snapshot.
    pub fn working_snapshot(&self) -> UserSettings {
        self.working.read().clone()
    }

    /// Saves, commits and restarts audio; the dialog stays open.
    ///
    /// # Errors
    ///
    /// See `ApplyCoordinator::apply`.
    pub fn apply(&mut self) -> Result<ApplyReport, ApplyError> {
        self.coordinator.apply(&mut self.panels, &self.working)
    }

    /// Applies and ends the dialog session.
    ///
    /// # Errors
    ///
    /// Returns `PreferencesError::ApplyError` if the apply fails.
    pub fn apply_and_close(mut self) -> Result<ApplyReport, PreferencesError> {
        let report = self.apply()?;
        debug!("PreferencesDialog: Closed");
        Ok(report)
    }
}
