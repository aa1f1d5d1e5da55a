//! Audio subsystem.
//!
//! Provides named capture and playback backends and the worker handles that
//! run them on dedicated threads. Workers signal their own termination so
//! that a replacement is never started while the old one still owns a device.

pub mod backend;
pub mod device;
pub mod null;
pub mod worker;

pub use {
    backend::{AudioBackend, AudioBackendRegistry, BackendError},
    worker::{
        AudioProcessor, AudioWorker, ReleasedWorker, Signal, WorkerCensus, WorkerContext,
        WorkerError, WorkerKind, WorkerPriority,
    },
};
