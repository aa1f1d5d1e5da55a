//! Device-less backend.
//!
//! Runs the capture or playback clock without touching hardware, one
//! packet of 10 ms frames per tick. Useful on headless machines.

use std::time::Duration;

use crate::{
    audio::{
        backend::{AudioBackend, BackendError},
        worker::{AudioProcessor, WorkerContext, WorkerError},
    },
    config::UserSettings,
};

/// Frames in one 10 ms block at 48 kHz.
const FRAMES_PER_BLOCK: u64 = 480;

/// Backend named `null`, usable for both directions.
pub struct NullBackend;

impl AudioBackend for NullBackend {
    fn name(&self) -> &str {
        "null"
    }

    fn open(&self, settings: &UserSettings) -> Result<Box<dyn AudioProcessor>, BackendError> {
        let blocks = u64::from(settings.frames_per_packet.max(1));
        Ok(Box::new(NullProcessor {
            tick: Duration::from_millis(10 * blocks),
            frames_per_tick: FRAMES_PER_BLOCK * blocks,
        }))
    }
}

struct NullProcessor {
    tick: Duration,
    frames_per_tick: u64,
}

impl AudioProcessor for NullProcessor {
    fn run(self: Box<Self>, ctx: &WorkerContext) -> Result<(), WorkerError> {
        while !ctx.wait(self.tick) {
            ctx.add_frames(self.frames_per_tick);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::Arc,
        thread::sleep,
        time::{Duration, Instant},
    };

    use crate::{
        audio::{
            backend::AudioBackend,
            null::NullBackend,
            worker::{AudioWorker, WorkerCensus, WorkerKind, WorkerPriority},
        },
        config::UserSettings,
    };

    #[test]
    fn test_null_worker_counts_frames_and_stops() {
        let settings = UserSettings {
            frames_per_packet: 1,
            ..UserSettings::default()
        };
        let processor = NullBackend.open(&settings).unwrap();
        let mut worker = AudioWorker::new(
            WorkerKind::Input,
            "null",
            processor,
            Arc::new(WorkerCensus::default()),
        );
        worker.start(WorkerPriority::Highest).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while worker.frames_processed() == 0 && Instant::now() < deadline {
            sleep(Duration::from_millis(5));
        }
        assert!(worker.frames_processed() >= 480);

        let released = AudioWorker::release(Arc::new(worker));
        let now = Instant::now();
        released
            .wait_until(now, now + Duration::from_secs(5))
            .unwrap();
    }
}
