//! Process-wide application state.
//!
//! `AppState` holds the live settings, the running audio workers and the
//! held-hotkey counters. Everything may read it; only the apply path and
//! application start/shutdown replace its contents.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU32, Ordering::SeqCst},
    },
    time::{Duration, Instant},
};

use {
    parking_lot::{Mutex, RwLock},
    tokio::sync::broadcast::{Receiver, Sender, channel},
    tracing::{debug, info, warn},
};

use crate::{
    audio::{AudioBackendRegistry, AudioWorker, ReleasedWorker, WorkerError, WorkerPriority},
    config::{SettingsManager, ShortcutAction, UserSettings},
    error::AudioError,
};

/// Number of held keys per transmit shortcut.
#[derive(Debug, Default)]
pub struct HotkeyState {
    push_to_talk: AtomicU32,
    alt_speak: AtomicU32,
}

impl HotkeyState {
    fn counter(&self, action: ShortcutAction) -> Option<&AtomicU32> {
        match action {
            ShortcutAction::PushToTalk => Some(&self.push_to_talk),
            ShortcutAction::AltSpeak => Some(&self.alt_speak),
            ShortcutAction::MuteSelf | ShortcutAction::DeafenSelf => None,
        }
    }

    /// Records a key of `action` going down.
    pub fn press(&self, action: ShortcutAction) {
        if let Some(counter) = self.counter(action) {
            counter.fetch_add(1, SeqCst);
        }
    }

    /// Records a key of `action` going up.
    pub fn release(&self, action: ShortcutAction) {
        if let Some(counter) = self.counter(action) {
            let _ = counter.fetch_update(SeqCst, SeqCst, |held| held.checked_sub(1));
        }
    }

    /// Keys currently held for `action`.
    #[must_use]
    pub fn held(&self, action: ShortcutAction) -> u32 {
        self.counter(action).map_or(0, |counter| counter.load(SeqCst))
    }

    /// Forgets all held keys.
    pub fn reset(&self) {
        self.push_to_talk.store(0, SeqCst);
        self.alt_speak.store(0, SeqCst);
    }
}

/// Application state change events.
#[derive(Debug, Clone)]
pub enum AppStateEvent {
    /// New settings are live.
    SettingsCommitted(UserSettings),
    /// The previous audio workers have terminated.
    AudioWorkersStopped,
    /// Audio workers were (re)started; `None` marks an absent direction.
    AudioWorkersStarted {
        input: Option<String>,
        output: Option<String>,
    },
    /// Held hotkey state was cleared.
    HotkeysReset,
}

/// Central state container with thread-safe access.
#[derive(Debug)]
pub struct AppState {
    /// Live settings store.
    settings: Arc<SettingsManager>,
    /// Running capture worker.
    audio_input: RwLock<Option<Arc<AudioWorker>>>,
    /// Running playback worker.
    audio_output: RwLock<Option<Arc<AudioWorker>>>,
    /// Released workers that outlived their shutdown deadline.
    stranded: Mutex<Vec<ReleasedWorker>>,
    /// Held shortcut keys.
    hotkeys: HotkeyState,
    /// Broadcast channel for state change notifications.
    state_tx: Sender<AppStateEvent>,
}

impl AppState {
    /// Creates application state around the live settings store.
    ///
    /// No audio worker runs until `start_audio` is called.
    pub fn new(settings: Arc<SettingsManager>) -> Self {
        let (state_tx, _) = channel(16);

        Self {
            settings,
            audio_input: RwLock::new(None),
            audio_output: RwLock::new(None),
            stranded: Mutex::new(Vec::new()),
            hotkeys: HotkeyState::default(),
            state_tx,
        }
    }

    /// The live settings store.
    pub fn settings(&self) -> &Arc<SettingsManager> {
        &self.settings
    }

    /// Returns a copy of the live settings.
    pub fn get_settings(&self) -> UserSettings {
        self.settings.snapshot()
    }

    /// The running capture worker, if any.
    pub fn audio_input(&self) -> Option<Arc<AudioWorker>> {
        self.audio_input.read().clone()
    }

    /// The running playback worker, if any.
    pub fn audio_output(&self) -> Option<Arc<AudioWorker>> {
        self.audio_output.read().clone()
    }

    /// Held hotkey counters.
    pub fn hotkeys(&self) -> &HotkeyState {
        &self.hotkeys
    }

    /// Subscribes to application state changes.
    pub fn subscribe(&self) -> Receiver<AppStateEvent> {
        self.state_tx.subscribe()
    }

    /// Starts capture and playback workers from the live settings.
    ///
    /// A direction whose backend is `"none"`, unknown, or fails to open or
    /// spawn is left empty.
    ///
    /// # Errors
    ///
    /// Returns `AudioError::InvalidOperation` if workers are already running,
    /// or `AudioError::WorkerError` if a previously released worker has not
    /// terminated yet.
    pub fn start_audio(&self, backends: &AudioBackendRegistry) -> Result<(), AudioError> {
        if self.audio_input.read().is_some() || self.audio_output.read().is_some() {
            return Err(AudioError::InvalidOperation {
                reason: "audio workers are already running".to_string(),
            });
        }

        let stranded: Vec<ReleasedWorker> = self.stranded.lock().drain(..).collect();
        if !stranded.is_empty() {
            self.await_released(stranded, Duration::ZERO)?;
        }

        let settings = self.get_settings();

        let input = backends
            .new_input_from_choice(&settings.audio_input, &settings)
            .and_then(|worker| Self::start_worker(worker, WorkerPriority::Highest));
        let output = backends
            .new_output_from_choice(&settings.audio_output, &settings)
            .and_then(|worker| Self::start_worker(worker, WorkerPriority::High));

        let input_name = input.as_ref().map(|w| w.backend().to_string());
        let output_name = output.as_ref().map(|w| w.backend().to_string());
        info!(
            "Audio workers started: input={:?}, output={:?}",
            input_name, output_name
        );

        *self.audio_input.write() = input;
        *self.audio_output.write() = output;
        let _ = self.state_tx.send(AppStateEvent::AudioWorkersStarted {
            input: input_name,
            output: output_name,
        });

        Ok(())
    }

    fn start_worker(mut worker: AudioWorker, priority: WorkerPriority) -> Option<Arc<AudioWorker>> {
        match worker.start(priority) {
            Ok(()) => Some(Arc::new(worker)),
            Err(e) => {
                warn!(
                    "Failed to start audio {} worker '{}': {}",
                    worker.kind(),
                    worker.backend(),
                    e
                );
                None
            }
        }
    }

    /// Stops both audio workers and waits up to `timeout` for them to exit.
    ///
    /// # Errors
    ///
    /// Returns `AudioError::WorkerError` if a worker does not terminate in
    /// time. Such a worker keeps blocking `start_audio` until it exits.
    pub fn shutdown_audio(&self, timeout: Duration) -> Result<(), AudioError> {
        let released = self.release_audio_workers();
        self.await_released(released, timeout)?;
        self.notify_workers_stopped();
        Ok(())
    }

    /// Empties both worker slots, giving up the process-wide references.
    ///
    /// Workers stranded by an earlier timeout are returned too, so that the
    /// caller waits for them before starting replacements.
    pub(crate) fn release_audio_workers(&self) -> Vec<ReleasedWorker> {
        let input = self.audio_input.write().take();
        let output = self.audio_output.write().take();
        let mut released: Vec<ReleasedWorker> = self.stranded.lock().drain(..).collect();
        debug!(
            "Releasing audio workers: input={}, output={}, stranded={}",
            input.is_some(),
            output.is_some(),
            released.len()
        );

        released.extend(
            [input, output]
                .into_iter()
                .flatten()
                .map(AudioWorker::release),
        );
        released
    }

    /// Waits up to `timeout` for every worker in `released` to terminate.
    ///
    /// # Errors
    ///
    /// Returns `WorkerError::ShutdownTimeout` for the first worker still
    /// alive at the deadline. It and every worker not yet confirmed are kept
    /// as stranded.
    pub(crate) fn await_released(
        &self,
        released: Vec<ReleasedWorker>,
        timeout: Duration,
    ) -> Result<(), WorkerError> {
        let started = Instant::now();
        let deadline = started + timeout;
        let mut pending = released.into_iter();
        while let Some(worker) = pending.next() {
            if let Err(e) = worker.wait_until(started, deadline) {
                warn!(
                    "Audio {} worker still running after {:?}, keeping it stranded",
                    worker.kind(),
                    started.elapsed()
                );
                let mut stranded = self.stranded.lock();
                stranded.push(worker);
                stranded.extend(pending);
                return Err(e);
            }
        }
        Ok(())
    }

    pub(crate) fn notify_workers_stopped(&self) {
        let _ = self.state_tx.send(AppStateEvent::AudioWorkersStopped);
    }

    /// Makes `settings` live in one step.
    pub(crate) fn commit_settings(&self, settings: UserSettings) {
        self.settings.commit(settings.clone());
        let _ = self
            .state_tx
            .send(AppStateEvent::SettingsCommitted(settings));
    }

    /// Clears held hotkeys so changed bindings start from a clean state.
    pub(crate) fn reset_hotkeys(&self) {
        self.hotkeys.reset();
        let _ = self.state_tx.send(AppStateEvent::HotkeysReset);
    }
}

#[cfg(test)]
mod tests {
    use std::{path::PathBuf, sync::Arc, thread::sleep, time::Duration};

    use crate::{
        audio::{
            AudioBackend, AudioBackendRegistry, AudioProcessor, BackendError, WorkerContext,
            WorkerError, WorkerKind, WorkerPriority,
        },
        config::{SettingsManager, ShortcutAction, UserSettings},
        error::AudioError,
        state::{AppState, AppStateEvent, HotkeyState},
    };

    /// Backend whose worker keeps running for a while after being stopped.
    struct Lingering;

    struct LingeringProcessor;

    impl AudioBackend for Lingering {
        fn name(&self) -> &str {
            "lingering"
        }

        fn open(&self, _settings: &UserSettings) -> Result<Box<dyn AudioProcessor>, BackendError> {
            Ok(Box::new(LingeringProcessor))
        }
    }

    impl AudioProcessor for LingeringProcessor {
        fn run(self: Box<Self>, ctx: &WorkerContext) -> Result<(), WorkerError> {
            while !ctx.wait(Duration::from_millis(5)) {}
            sleep(Duration::from_millis(300));
            Ok(())
        }
    }

    fn null_state(input: &str, output: &str) -> AppState {
        let settings = UserSettings {
            audio_input: input.to_string(),
            audio_output: output.to_string(),
            ..UserSettings::default()
        };
        AppState::new(Arc::new(SettingsManager::from_settings(
            settings,
            PathBuf::from("/nonexistent/parley/settings.json"),
        )))
    }

    #[test]
    fn test_hotkey_counts_and_reset() {
        let hotkeys = HotkeyState::default();
        hotkeys.press(ShortcutAction::PushToTalk);
        hotkeys.press(ShortcutAction::PushToTalk);
        hotkeys.press(ShortcutAction::AltSpeak);
        hotkeys.press(ShortcutAction::MuteSelf);
        hotkeys.release(ShortcutAction::PushToTalk);
        assert_eq!(hotkeys.held(ShortcutAction::PushToTalk), 1);
        assert_eq!(hotkeys.held(ShortcutAction::AltSpeak), 1);
        assert_eq!(hotkeys.held(ShortcutAction::MuteSelf), 0);

        hotkeys.reset();
        hotkeys.release(ShortcutAction::AltSpeak);
        assert_eq!(hotkeys.held(ShortcutAction::PushToTalk), 0);
        assert_eq!(hotkeys.held(ShortcutAction::AltSpeak), 0);
    }

    #[test]
    fn test_start_and_shutdown_audio() {
        let backends = AudioBackendRegistry::with_default_backends();
        let state = null_state("null", "null");
        let mut events = state.subscribe();

        state.start_audio(&backends).unwrap();
        let input = state.audio_input().unwrap();
        let output = state.audio_output().unwrap();
        assert_eq!(input.priority(), Some(WorkerPriority::Highest));
        assert_eq!(output.priority(), Some(WorkerPriority::High));
        drop((input, output));

        assert!(matches!(
            state.start_audio(&backends),
            Err(AudioError::InvalidOperation { .. })
        ));

        state.shutdown_audio(Duration::from_secs(5)).unwrap();
        assert!(state.audio_input().is_none());
        assert!(state.audio_output().is_none());
        assert_eq!(backends.census(WorkerKind::Input).live(), 0);
        assert_eq!(backends.census(WorkerKind::Output).live(), 0);

        assert!(matches!(
            events.try_recv(),
            Ok(AppStateEvent::AudioWorkersStarted { .. })
        ));
        assert!(matches!(
            events.try_recv(),
            Ok(AppStateEvent::AudioWorkersStopped)
        ));
    }

    #[test]
    fn test_none_backend_leaves_slot_empty() {
        let backends = AudioBackendRegistry::with_default_backends();
        let state = null_state("none", "null");
        state.start_audio(&backends).unwrap();
        assert!(state.audio_input().is_none());
        assert_eq!(state.audio_output().unwrap().backend(), "null");
        state.shutdown_audio(Duration::from_secs(5)).unwrap();
    }

    #[test]
    fn test_timed_out_worker_blocks_restart_until_it_exits() {
        let mut backends = AudioBackendRegistry::with_default_backends();
        backends.register_input(Arc::new(Lingering));
        let state = null_state("lingering", "none");
        state.start_audio(&backends).unwrap();

        // Give up on the worker before it has finished stopping
        assert!(matches!(
            state.shutdown_audio(Duration::from_millis(20)),
            Err(AudioError::WorkerError(WorkerError::ShutdownTimeout { .. }))
        ));

        // The old thread still runs, so no replacement may start
        assert!(matches!(
            state.start_audio(&backends),
            Err(AudioError::WorkerError(WorkerError::ShutdownTimeout { .. }))
        ));
        assert!(state.audio_input().is_none());
        assert_eq!(backends.census(WorkerKind::Input).started(), 1);

        // Once it has exited, shutdown settles and audio starts again
        state.shutdown_audio(Duration::from_secs(5)).unwrap();
        state.start_audio(&backends).unwrap();
        assert_eq!(backends.census(WorkerKind::Input).peak(), 1);
        assert_eq!(backends.census(WorkerKind::Input).started(), 2);
        state.shutdown_audio(Duration::from_secs(5)).unwrap();
    }
}
