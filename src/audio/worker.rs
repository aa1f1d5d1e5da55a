//! Audio worker handles.
//!
//! An `AudioWorker` owns one background thread running an `AudioProcessor`.
//! Workers are shared as `Arc<AudioWorker>`; dropping the last strong
//! reference raises the stop signal, and the thread raises the exit signal
//! once the processor (and with it the audio device) has been dropped.

use std::{
    fmt::{Debug, Display, Formatter, Result as FmtResult},
    io::Error as IoError,
    sync::{
        Arc, OnceLock, Weak,
        atomic::{AtomicU64, AtomicUsize, Ordering::SeqCst},
    },
    thread::{Builder, JoinHandle, yield_now},
    time::{Duration, Instant},
};

use {
    parking_lot::{Condvar, Mutex},
    thiserror::Error,
    thread_priority::{ThreadPriority, ThreadPriorityValue, set_current_thread_priority},
    tracing::{debug, error, warn},
};

/// Error type for worker lifecycle operations.
#[derive(Error, Debug)]
pub enum WorkerError {
    /// The worker thread could not be spawned.
    #[error("Failed to spawn worker thread: {0}")]
    Spawn(#[from] IoError),
    /// `start` was called on a worker that is already running.
    #[error("Audio {kind} worker already started")]
    AlreadyStarted { kind: WorkerKind },
    /// A released worker did not terminate in time.
    #[error("Audio {kind} worker '{backend}' did not stop within {waited_ms} ms")]
    ShutdownTimeout {
        kind: WorkerKind,
        backend: String,
        waited_ms: u128,
    },
    /// The processor failed while running.
    #[error("Audio processor failed: {reason}")]
    Processor { reason: String },
}

/// Direction of an audio worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerKind {
    /// Capture from a microphone.
    Input,
    /// Playback to speakers.
    Output,
}

impl Display for WorkerKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            WorkerKind::Input => write!(f, "input"),
            WorkerKind::Output => write!(f, "output"),
        }
    }
}

/// Scheduling priority requested when starting a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum WorkerPriority {
    /// Regular priority.
    Normal,
    /// Elevated priority, used for playback.
    High,
    /// Highest priority, used for capture.
    Highest,
}

impl WorkerPriority {
    /// Cross-platform priority value in `0..=99`, `None` to keep the
    /// scheduler default.
    #[must_use]
    pub fn level(self) -> Option<u8> {
        match self {
            WorkerPriority::Normal => None,
            WorkerPriority::High => Some(70),
            WorkerPriority::Highest => Some(90),
        }
    }
}

/// Raises the calling thread to `priority`.
///
/// Failure is not fatal: unprivileged processes are often not allowed to
/// raise their priority, and the worker then runs at the default.
fn raise_current_thread(kind: WorkerKind, priority: WorkerPriority) -> bool {
    let Some(level) = priority.level() else {
        return true;
    };
    let value = match ThreadPriorityValue::try_from(level) {
        Ok(value) => value,
        Err(e) => {
            warn!("Invalid audio {} thread priority {}: {}", kind, level, e);
            return false;
        }
    };

    match set_current_thread_priority(ThreadPriority::Crossplatform(value)) {
        Ok(()) => {
            debug!("Audio {} thread raised to {:?}", kind, priority);
            true
        }
        Err(e) => {
            warn!(
                "Could not raise audio {} thread to {:?}: {:?}",
                kind, priority, e
            );
            false
        }
    }
}

/// One-shot flag with blocking waits.
#[derive(Debug, Default)]
pub struct Signal {
    raised: Mutex<bool>,
    cond: Condvar,
}

impl Signal {
    /// Creates a lowered signal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the signal and wakes every waiter.
    pub fn raise(&self) {
        let mut raised = self.raised.lock();
        *raised = true;
        self.cond.notify_all();
    }

    /// Returns whether the signal has been raised.
    #[must_use]
    pub fn is_raised(&self) -> bool {
        *self.raised.lock()
    }

    /// Blocks until the signal is raised or `deadline` passes.
    ///
    /// # Returns
    ///
    /// `true` if the signal was raised.
    pub fn wait_until(&self, deadline: Instant) -> bool {
        let mut raised = self.raised.lock();
        while !*raised {
            if self.cond.wait_until(&mut raised, deadline).timed_out() {
                return *raised;
            }
        }
        true
    }

    /// Blocks for at most `timeout` waiting for the signal.
    pub fn wait_for(&self, timeout: Duration) -> bool {
        self.wait_until(Instant::now() + timeout)
    }
}

/// Counts live worker threads of one direction.
#[derive(Debug, Default)]
pub struct WorkerCensus {
    live: AtomicUsize,
    peak: AtomicUsize,
    started: AtomicUsize,
}

impl WorkerCensus {
    fn enter(&self) {
        let live = self.live.fetch_add(1, SeqCst) + 1;
        self.peak.fetch_max(live, SeqCst);
        self.started.fetch_add(1, SeqCst);
    }

    fn leave(&self) {
        self.live.fetch_sub(1, SeqCst);
    }

    /// Worker threads currently running.
    #[must_use]
    pub fn live(&self) -> usize {
        self.live.load(SeqCst)
    }

    /// Highest number of simultaneously running worker threads seen.
    #[must_use]
    pub fn peak(&self) -> usize {
        self.peak.load(SeqCst)
    }

    /// Total number of worker threads ever started.
    #[must_use]
    pub fn started(&self) -> usize {
        self.started.load(SeqCst)
    }
}

/// Handle given to a running processor.
pub struct WorkerContext {
    stop: Arc<Signal>,
    frames: Arc<AtomicU64>,
    priority_applied: Arc<OnceLock<bool>>,
}

impl WorkerContext {
    /// Returns whether the worker has been asked to stop.
    #[must_use]
    pub fn should_stop(&self) -> bool {
        self.stop.is_raised()
    }

    /// Sleeps for up to `timeout`, returning early with `true` on stop.
    pub fn wait(&self, timeout: Duration) -> bool {
        self.stop.wait_for(timeout)
    }

    /// Adds `frames` to the processed frame count.
    pub fn add_frames(&self, frames: u64) {
        self.frames.fetch_add(frames, SeqCst);
    }

    /// Whether this thread runs at its requested priority.
    #[must_use]
    pub fn priority_applied(&self) -> bool {
        self.priority_applied.get().copied().unwrap_or(false)
    }

    /// Shared frame counter, for use from device callbacks.
    #[must_use]
    pub fn frame_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.frames)
    }
}

/// The body of an audio worker thread.
///
/// Implementations must return promptly once `WorkerContext::should_stop`
/// turns true, and release their device before returning.
pub trait AudioProcessor: Send {
    /// Runs until stopped.
    ///
    /// # Errors
    ///
    /// Returns `WorkerError::Processor` if the device fails.
    fn run(self: Box<Self>, ctx: &WorkerContext) -> Result<(), WorkerError>;
}

/// Raises the exit signal when the worker thread unwinds or returns.
struct ExitGuard {
    exited: Arc<Signal>,
    census: Arc<WorkerCensus>,
}

impl Drop for ExitGuard {
    fn drop(&mut self) {
        self.census.leave();
        self.exited.raise();
    }
}

/// A background audio worker.
pub struct AudioWorker {
    kind: WorkerKind,
    backend: String,
    processor: Mutex<Option<Box<dyn AudioProcessor>>>,
    priority: Option<WorkerPriority>,
    stop: Arc<Signal>,
    exited: Arc<Signal>,
    frames: Arc<AtomicU64>,
    census: Arc<WorkerCensus>,
    priority_applied: Arc<OnceLock<bool>>,
    thread: Option<JoinHandle<()>>,
}

impl AudioWorker {
    /// Creates a worker that has not been started yet.
    ///
    /// # Arguments
    ///
    /// * `kind` - Direction of the worker
    /// * `backend` - Name of the backend that built the processor
    /// * `processor` - Thread body
    /// * `census` - Live-thread counter for this direction
    pub fn new(
        kind: WorkerKind,
        backend: impl Into<String>,
        processor: Box<dyn AudioProcessor>,
        census: Arc<WorkerCensus>,
    ) -> Self {
        Self {
            kind,
            backend: backend.into(),
            processor: Mutex::new(Some(processor)),
            priority: None,
            stop: Arc::new(Signal::new()),
            exited: Arc::new(Signal::new()),
            frames: Arc::new(AtomicU64::new(0)),
            census,
            priority_applied: Arc::new(OnceLock::new()),
            thread: None,
        }
    }

    /// Spawns the worker thread.
    ///
    /// The thread raises its own scheduling priority before running the
    /// processor. If the platform refuses, a warning is logged and the
    /// worker runs at the default priority.
    ///
    /// # Errors
    ///
    /// Returns `WorkerError` if the worker was already started or the
    /// thread cannot be spawned.
    pub fn start(&mut self, priority: WorkerPriority) -> Result<(), WorkerError> {
        let processor = self
            .processor
            .get_mut()
            .take()
            .ok_or(WorkerError::AlreadyStarted { kind: self.kind })?;

        let ctx = WorkerContext {
            stop: Arc::clone(&self.stop),
            frames: Arc::clone(&self.frames),
            priority_applied: Arc::clone(&self.priority_applied),
        };
        let guard = ExitGuard {
            exited: Arc::clone(&self.exited),
            census: Arc::clone(&self.census),
        };
        let kind = self.kind;
        let backend = self.backend.clone();

        self.census.enter();
        let spawned = Builder::new()
            .name(format!("audio-{kind}-{priority:?}").to_lowercase())
            .spawn(move || {
                let _guard = guard;
                let _ = ctx.priority_applied.set(raise_current_thread(kind, priority));
                debug!("Audio {} worker '{}' running", kind, backend);
                if let Err(e) = processor.run(&ctx) {
                    error!("Audio {} worker '{}' failed: {}", kind, backend, e);
                }
                debug!("Audio {} worker '{}' exiting", kind, backend);
            });

        // A failed spawn drops the closure, and with it the guard, so the
        // census and exit signal are already settled here.
        self.thread = Some(spawned?);
        self.priority = Some(priority);
        Ok(())
    }

    /// Direction of this worker.
    #[must_use]
    pub fn kind(&self) -> WorkerKind {
        self.kind
    }

    /// Name of the backend this worker runs.
    #[must_use]
    pub fn backend(&self) -> &str {
        &self.backend
    }

    /// Priority the worker was started with, if started.
    #[must_use]
    pub fn priority(&self) -> Option<WorkerPriority> {
        self.priority
    }

    /// Whether the thread managed to raise its scheduling priority, once it
    /// has tried.
    #[must_use]
    pub fn priority_applied(&self) -> Option<bool> {
        self.priority_applied.get().copied()
    }

    /// Frames processed so far.
    #[must_use]
    pub fn frames_processed(&self) -> u64 {
        self.frames.load(SeqCst)
    }

    /// Whether the worker thread is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.thread.is_some() && !self.exited.is_raised()
    }

    /// Gives up `worker`, returning what is needed to await its termination.
    ///
    /// Dropping the strong reference raises the stop signal once no other
    /// holder remains.
    #[must_use]
    pub fn release(worker: Arc<AudioWorker>) -> ReleasedWorker {
        let released = ReleasedWorker {
            kind: worker.kind,
            backend: worker.backend.clone(),
            weak: Arc::downgrade(&worker),
            exited: Arc::clone(&worker.exited),
        };
        drop(worker);
        released
    }
}

impl Debug for AudioWorker {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("AudioWorker")
            .field("kind", &self.kind)
            .field("backend", &self.backend)
            .field("priority", &self.priority)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl Drop for AudioWorker {
    fn drop(&mut self) {
        self.stop.raise();
        if self.thread.is_none() {
            // Never started, nothing to wait for.
            self.exited.raise();
        }
    }
}

/// A worker whose strong reference has been given up.
#[derive(Debug)]
pub struct ReleasedWorker {
    kind: WorkerKind,
    backend: String,
    weak: Weak<AudioWorker>,
    exited: Arc<Signal>,
}

impl ReleasedWorker {
    /// Direction of the released worker.
    #[must_use]
    pub fn kind(&self) -> WorkerKind {
        self.kind
    }

    /// Blocks until the worker thread has exited and no strong holder
    /// remains, or `deadline` passes.
    ///
    /// # Errors
    ///
    /// Returns `WorkerError::ShutdownTimeout` on expiry.
    pub fn wait_until(&self, started: Instant, deadline: Instant) -> Result<(), WorkerError> {
        let timed_out = || WorkerError::ShutdownTimeout {
            kind: self.kind,
            backend: self.backend.clone(),
            waited_ms: started.elapsed().as_millis(),
        };

        if !self.exited.wait_until(deadline) {
            return Err(timed_out());
        }
        while self.weak.strong_count() > 0 {
            if Instant::now() >= deadline {
                return Err(timed_out());
            }
            yield_now();
        }

        debug!("Audio {} worker '{}' terminated", self.kind, self.backend);
        Ok(())
    }
}
