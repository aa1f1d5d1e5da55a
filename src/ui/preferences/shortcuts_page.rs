//! Global shortcut bindings page.

use std::{collections::HashSet, sync::Arc};

use tracing::debug;

use crate::{
    config::{ShortcutAction, ShortcutBinding, UserSettings},
    ui::preferences::panel::{Control, Panel, PanelContext, PanelError, SharedSnapshot},
};

/// Shortcut bindings page.
pub struct ShortcutsPanel {
    working: SharedSnapshot,
    bindings: Control<Vec<ShortcutBinding>>,
}

impl ShortcutsPanel {
    /// Creates the page with no bindings shown until loaded.
    pub fn new(ctx: &PanelContext) -> Self {
        Self {
            working: Arc::clone(&ctx.working),
            bindings: Control::new(UserSettings::default().shortcuts),
        }
    }

    /// Binds `keys` to `action`, replacing any previous binding of `action`.
    pub fn bind(&mut self, action: ShortcutAction, keys: &[&str]) {
        let mut bindings: Vec<ShortcutBinding> = self
            .bindings
            .value()
            .iter()
            .filter(|binding| binding.action != action)
            .cloned()
            .collect();
        bindings.push(ShortcutBinding {
            action,
            keys: keys.iter().map(|key| (*key).to_string()).collect(),
        });
        self.bindings.set(bindings);
    }

    /// Removes the binding of `action`.
    pub fn unbind(&mut self, action: ShortcutAction) {
        let bindings = self
            .bindings
            .value()
            .iter()
            .filter(|binding| binding.action != action)
            .cloned()
            .collect();
        self.bindings.set(bindings);
    }

    /// Bindings currently shown.
    pub fn bindings(&self) -> &[ShortcutBinding] {
        self.bindings.value()
    }
}

impl Panel for ShortcutsPanel {
    fn title(&self) -> &str {
        "Shortcuts"
    }

    fn icon_name(&self) -> &str {
        "preferences-desktop-keyboard-shortcuts-symbolic"
    }

    fn load(&mut self, settings: &UserSettings) {
        self.bindings.load(settings.shortcuts.clone());
    }

    fn save(&mut self) -> Result<(), PanelError> {
        let mut seen = HashSet::new();
        for binding in self.bindings.value() {
            if binding.keys.is_empty() {
                return Err(PanelError::InvalidValue {
                    field: "shortcuts",
                    reason: format!("{:?} has no keys", binding.action),
                });
            }
            if !seen.insert(&binding.keys) {
                return Err(PanelError::InvalidValue {
                    field: "shortcuts",
                    reason: format!("{} is bound twice", binding.keys.join("+")),
                });
            }
        }

        self.working.write().shortcuts = self.bindings.value().clone();
        debug!("ShortcutsPanel: Saved {} bindings", self.bindings.value().len());
        Ok(())
    }

    fn is_expert_visible(&self, _expert: bool) -> bool {
        true
    }
}
