//! Named audio backends and the registry that builds workers from them.
//!
//! Settings select backends by name. Asking for `"none"`, an unknown name,
//! or a backend whose device cannot be opened yields no worker, which the
//! rest of the application treats as that audio direction being absent.

use std::sync::Arc;

use {
    cpal::{DefaultStreamConfigError, DevicesError, SampleFormat},
    thiserror::Error,
    tracing::{debug, warn},
};

use crate::{
    audio::{
        device::{CpalInputBackend, CpalOutputBackend},
        null::NullBackend,
        worker::{AudioProcessor, AudioWorker, WorkerCensus, WorkerKind},
    },
    config::{NO_BACKEND, UserSettings},
};

/// Error type for opening a backend.
#[derive(Error, Debug)]
pub enum BackendError {
    /// No default device exists for this direction.
    #[error("No suitable audio device found")]
    NoDeviceFound,
    /// The configured device is not present.
    #[error("Audio device not found: {name}")]
    DeviceNotFound { name: String },
    /// Device enumeration failed.
    #[error("Failed to enumerate audio devices: {0}")]
    Devices(#[from] DevicesError),
    /// The device has no usable default configuration.
    #[error("Failed to query device configuration: {0}")]
    DeviceConfig(#[from] DefaultStreamConfigError),
    /// The device only offers a sample format we do not handle.
    #[error("Unsupported sample format: {format:?}")]
    UnsupportedSampleFormat { format: SampleFormat },
}

/// A source of audio processors selectable by name.
pub trait AudioBackend: Send + Sync {
    /// Name stored in the settings to select this backend.
    fn name(&self) -> &str;

    /// Prepares a processor for the given settings.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the device cannot be opened.
    fn open(&self, settings: &UserSettings) -> Result<Box<dyn AudioProcessor>, BackendError>;
}

/// Input and output backends, plus per-direction worker accounting.
pub struct AudioBackendRegistry {
    inputs: Vec<Arc<dyn AudioBackend>>,
    outputs: Vec<Arc<dyn AudioBackend>>,
    input_census: Arc<WorkerCensus>,
    output_census: Arc<WorkerCensus>,
}

impl Default for AudioBackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioBackendRegistry {
    /// Creates a registry without backends.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inputs: Vec::new(),
            outputs: Vec::new(),
            input_census: Arc::new(WorkerCensus::default()),
            output_census: Arc::new(WorkerCensus::default()),
        }
    }

    /// Creates a registry with the `null` and `cpal` backends.
    #[must_use]
    pub fn with_default_backends() -> Self {
        let mut registry = Self::new();
        registry.register_input(Arc::new(NullBackend));
        registry.register_output(Arc::new(NullBackend));
        registry.register_input(Arc::new(CpalInputBackend));
        registry.register_output(Arc::new(CpalOutputBackend));
        registry
    }

    /// Adds an input backend, replacing one with the same name.
    pub fn register_input(&mut self, backend: Arc<dyn AudioBackend>) {
        Self::insert(&mut self.inputs, backend);
    }

    /// Adds an output backend, replacing one with the same name.
    pub fn register_output(&mut self, backend: Arc<dyn AudioBackend>) {
        Self::insert(&mut self.outputs, backend);
    }

    fn insert(list: &mut Vec<Arc<dyn AudioBackend>>, backend: Arc<dyn AudioBackend>) {
        match list.iter_mut().find(|b| b.name() == backend.name()) {
            Some(slot) => *slot = backend,
            None => list.push(backend),
        }
    }

    /// Selectable input backend names, without `"none"`.
    #[must_use]
    pub fn input_names(&self) -> Vec<String> {
        self.inputs.iter().map(|b| b.name().to_string()).collect()
    }

    /// Selectable output backend names, without `"none"`.
    #[must_use]
    pub fn output_names(&self) -> Vec<String> {
        self.outputs.iter().map(|b| b.name().to_string()).collect()
    }

    /// Whether `name` is a valid choice for `kind`, `"none"` included.
    #[must_use]
    pub fn is_valid_choice(&self, kind: WorkerKind, name: &str) -> bool {
        name == NO_BACKEND
            || self
                .backends(kind)
                .iter()
                .any(|backend| backend.name() == name)
    }

    /// Live-thread accounting for `kind`.
    #[must_use]
    pub fn census(&self, kind: WorkerKind) -> &Arc<WorkerCensus> {
        match kind {
            WorkerKind::Input => &self.input_census,
            WorkerKind::Output => &self.output_census,
        }
    }

    /// Builds an unstarted input worker for the backend named `choice`.
    pub fn new_input_from_choice(
        &self,
        choice: &str,
        settings: &UserSettings,
    ) -> Option<AudioWorker> {
        self.new_from_choice(WorkerKind::Input, choice, settings)
    }

    /// Builds an unstarted output worker for the backend named `choice`.
    pub fn new_output_from_choice(
        &self,
        choice: &str,
        settings: &UserSettings,
    ) -> Option<AudioWorker> {
        self.new_from_choice(WorkerKind::Output, choice, settings)
    }

    fn backends(&self, kind: WorkerKind) -> &[Arc<dyn AudioBackend>] {
        match kind {
            WorkerKind::Input => &self.inputs,
            WorkerKind::Output => &self.outputs,
        }
    }

    fn new_from_choice(
        &self,
        kind: WorkerKind,
        choice: &str,
        settings: &UserSettings,
    ) -> Option<AudioWorker> {
        if choice == NO_BACKEND {
            debug!("Audio {} disabled by settings", kind);
            return None;
        }

        let Some(backend) = self.backends(kind).iter().find(|b| b.name() == choice) else {
            warn!("Unknown audio {} backend '{}'", kind, choice);
            return None;
        };

        match backend.open(settings) {
            Ok(processor) => Some(AudioWorker::new(
                kind,
                choice,
                processor,
                Arc::clone(self.census(kind)),
            )),
            Err(e) => {
                warn!("Audio {} backend '{}' unavailable: {}", kind, choice, e);
                None
            }
        }
    }
}
