//! Hardware backends using the `cpal` crate.
//!
//! Devices are resolved when a backend is opened so that a missing device
//! yields no worker. Streams are built inside the worker thread and dropped
//! there before the thread reports its exit.

use std::{
    fmt::Display,
    sync::atomic::Ordering::SeqCst,
    time::Duration,
};

use {
    cpal::{
        Device, InputCallbackInfo, OutputCallbackInfo, SampleFormat::F32, StreamConfig,
        default_host,
        traits::{DeviceTrait, HostTrait, StreamTrait},
    },
    tracing::{debug, error},
};

use crate::{
    audio::{
        backend::{AudioBackend, BackendError},
        worker::{AudioProcessor, WorkerContext, WorkerError, WorkerKind},
    },
    config::UserSettings,
};

/// How often a running stream checks for a stop request.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Capture backend named `cpal`.
pub struct CpalInputBackend;

/// Playback backend named `cpal`.
pub struct CpalOutputBackend;

impl AudioBackend for CpalInputBackend {
    fn name(&self) -> &str {
        "cpal"
    }

    fn open(&self, settings: &UserSettings) -> Result<Box<dyn AudioProcessor>, BackendError> {
        let device = find_device(WorkerKind::Input, settings.input_device.as_deref())?;
        let supported = device.default_input_config()?;
        if supported.sample_format() != F32 {
            return Err(BackendError::UnsupportedSampleFormat {
                format: supported.sample_format(),
            });
        }

        Ok(Box::new(CpalInputProcessor {
            device,
            config: supported.config(),
        }))
    }
}

impl AudioBackend for CpalOutputBackend {
    fn name(&self) -> &str {
        "cpal"
    }

    fn open(&self, settings: &UserSettings) -> Result<Box<dyn AudioProcessor>, BackendError> {
        let device = find_device(WorkerKind::Output, settings.output_device.as_deref())?;
        let supported = device.default_output_config()?;
        if supported.sample_format() != F32 {
            return Err(BackendError::UnsupportedSampleFormat {
                format: supported.sample_format(),
            });
        }

        Ok(Box::new(CpalOutputProcessor {
            device,
            config: supported.config(),
        }))
    }
}

/// Returns the description used to match configured device names.
fn device_name(device: &Device) -> Option<String> {
    device.description().ok().map(|desc| desc.to_string())
}

/// Looks up the named device, or the host default when `name` is `None`.
fn find_device(kind: WorkerKind, name: Option<&str>) -> Result<Device, BackendError> {
    let host = default_host();

    let Some(name) = name else {
        let device = match kind {
            WorkerKind::Input => host.default_input_device(),
            WorkerKind::Output => host.default_output_device(),
        };
        return device.ok_or(BackendError::NoDeviceFound);
    };

    let devices: Vec<Device> = match kind {
        WorkerKind::Input => host.input_devices()?.collect(),
        WorkerKind::Output => host.output_devices()?.collect(),
    };

    devices
        .into_iter()
        .find(|device| device_name(device).as_deref() == Some(name))
        .ok_or_else(|| BackendError::DeviceNotFound {
            name: name.to_string(),
        })
}

fn processor_error(e: impl Display) -> WorkerError {
    WorkerError::Processor {
        reason: e.to_string(),
    }
}

struct CpalInputProcessor {
    device: Device,
    config: StreamConfig,
}

impl AudioProcessor for CpalInputProcessor {
    fn run(self: Box<Self>, ctx: &WorkerContext) -> Result<(), WorkerError> {
        let frames = ctx.frame_counter();
        let channels = u64::from(self.config.channels.max(1));

        let stream = self
            .device
            .build_input_stream(
                &self.config,
                move |data: &[f32], _: &InputCallbackInfo| {
                    frames.fetch_add(data.len() as u64 / channels, SeqCst);
                },
                |err| error!("Audio input stream error: {}", err),
                None,
            )
            .map_err(processor_error)?;
        stream.play().map_err(processor_error)?;
        debug!("Capture stream running: {:?}", self.config);

        while !ctx.wait(POLL_INTERVAL) {}

        drop(stream);
        Ok(())
    }
}

struct CpalOutputProcessor {
    device: Device,
    config: StreamConfig,
}

impl AudioProcessor for CpalOutputProcessor {
    fn run(self: Box<Self>, ctx: &WorkerContext) -> Result<(), WorkerError> {
        let frames = ctx.frame_counter();
        let channels = u64::from(self.config.channels.max(1));

        // No mixer feeds this stream yet; it holds the device and plays silence.
        let stream = self
            .device
            .build_output_stream(
                &self.config,
                move |data: &mut [f32], _: &OutputCallbackInfo| {
                    data.fill(0.0);
                    frames.fetch_add(data.len() as u64 / channels, SeqCst);
                },
                |err| error!("Audio output stream error: {}", err),
                None,
            )
            .map_err(processor_error)?;
        stream.play().map_err(processor_error)?;
        debug!("Playback stream running: {:?}", self.config);

        while !ctx.wait(POLL_INTERVAL) {}

        drop(stream);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        audio::{
            backend::{AudioBackend, BackendError},
            device::{CpalInputBackend, CpalOutputBackend},
        },
        config::UserSettings,
    };

    #[test]
    fn test_missing_named_device_is_reported() {
        let settings = UserSettings {
            input_device: Some("no-such-device-for-tests".to_string()),
            output_device: Some("no-such-device-for-tests".to_string()),
            ..UserSettings::default()
        };

        // Enumeration itself may fail on machines without an audio stack.
        for result in [
            CpalInputBackend.open(&settings),
            CpalOutputBackend.open(&settings),
        ] {
            assert!(matches!(
                result,
                Err(BackendError::DeviceNotFound { .. } | BackendError::Devices(_))
            ));
        }
    }
}
