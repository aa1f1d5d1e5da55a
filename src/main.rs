//! Parley - Voice Chat Client Core
//!
//! Headless entry point. Loads the settings, starts the audio workers and
//! keeps them running until interrupted. With `--apply`, the preferences
//! dialog is opened on the live settings and applied once, which restarts
//! the workers and writes the settings file.

use std::{env::args, sync::Arc, time::Duration};

use {tokio::signal::ctrl_c, tracing::info, tracing_subscriber::EnvFilter};

use parley::{
    AppState, AudioBackendRegistry, PanelRegistry, PreferencesDialog, SettingsManager,
    config::get_config_path,
    error::{Result, ResultExt},
};

/// How long shutdown waits for the audio workers.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Main entry point for the Parley application.
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = SettingsManager::new()
        .add_contextf(format!("Failed to load settings from {:?}", get_config_path()))?;
    info!("Settings loaded from {:?}", settings.get_config_path());

    let app_state = Arc::new(AppState::new(Arc::new(settings)));
    let backends = Arc::new(AudioBackendRegistry::with_default_backends());
    app_state
        .start_audio(&backends)
        .add_context("Failed to start audio")?;

    if args().skip(1).any(|arg| arg == "--apply") {
        let dialog = PreferencesDialog::new(
            &PanelRegistry::with_builtin_panels(),
            Arc::clone(&app_state),
            Arc::clone(&backends),
        );
        info!("Preferences pages: {}", dialog.visible_pages().join(", "));
        let report = dialog
            .apply_and_close()
            .add_context("Failed to apply preferences")?;
        info!(
            "Preferences applied: input={:?}, output={:?}",
            report.input, report.output
        );
    }

    ctrl_c().await.add_context("Failed to wait for interrupt")?;
    info!("Interrupted, stopping audio");

    app_state
        .shutdown_audio(SHUTDOWN_TIMEOUT)
        .add_context("Failed to stop audio")?;
    Ok(())
}
