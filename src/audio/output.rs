//! Speaker output driving the playback scheduler
//!
//! The device callback pulls rendered blocks from the scheduler,
//! clocked by the number of frames the device has consumed. That
//! frame counter doubles as the scheduler's device-relative clock, so
//! scheduled start times never drift against actual output.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleRate, Stream, StreamConfig};

use super::playback::{PlaybackClock, PlaybackScheduler};
use crate::{Error, Result};

/// Device-relative clock counting rendered output frames
#[derive(Clone)]
pub struct OutputClock {
    frames: Arc<AtomicU64>,
    sample_rate: u32,
}

impl OutputClock {
    /// Create a clock for the given output sample rate
    #[must_use]
    pub fn new(sample_rate: u32) -> Self {
        Self {
            frames: Arc::new(AtomicU64::new(0)),
            sample_rate,
        }
    }

    fn advance(&self, frames: u64) {
        self.frames.fetch_add(frames, Ordering::Relaxed);
    }
}

impl PlaybackClock for OutputClock {
    fn now(&self) -> Duration {
        let frames = self.frames.load(Ordering::Relaxed);
        Duration::from_nanos(frames * 1_000_000_000 / u64::from(self.sample_rate))
    }
}

/// Plays scheduled audio to the default output device
pub struct AudioOutput {
    device: Device,
    config: StreamConfig,
    clock: OutputClock,
    stream: Option<Stream>,
}

impl AudioOutput {
    /// Create a new audio output instance
    ///
    /// # Errors
    ///
    /// Returns error if no suitable output device is available
    pub fn new(sample_rate: u32) -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Audio("no output device available".to_string()))?;

        let supported_config = device
            .supported_output_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(|c| {
                c.channels() == 1
                    && c.min_sample_rate() <= SampleRate(sample_rate)
                    && c.max_sample_rate() >= SampleRate(sample_rate)
            })
            .or_else(|| {
                // Fallback: try stereo
                device.supported_output_configs().ok()?.find(|c| {
                    c.channels() == 2
                        && c.min_sample_rate() <= SampleRate(sample_rate)
                        && c.max_sample_rate() >= SampleRate(sample_rate)
                })
            })
            .ok_or_else(|| Error::Audio("no suitable output config found".to_string()))?;

        let config = supported_config
            .with_sample_rate(SampleRate(sample_rate))
            .config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate,
            channels = config.channels,
            "audio output initialized"
        );

        Ok(Self {
            device,
            config,
            clock: OutputClock::new(sample_rate),
            stream: None,
        })
    }

    /// The device-relative clock the scheduler should be driven with
    #[must_use]
    pub fn clock(&self) -> OutputClock {
        self.clock.clone()
    }

    /// Start pulling rendered audio from the scheduler
    ///
    /// # Errors
    ///
    /// Returns error if the stream cannot be built or started
    pub fn start(&mut self, scheduler: Arc<PlaybackScheduler>) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let config = self.config.clone();
        let channels = config.channels as usize;
        let clock = self.clock.clone();
        let mut mono: Vec<f32> = Vec::new();

        let stream = self
            .device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let frames = data.len() / channels;
                    mono.resize(frames, 0.0);
                    scheduler.render(&mut mono, clock.now());

                    for (frame, &sample) in data.chunks_mut(channels).zip(&mono) {
                        for out in frame.iter_mut() {
                            *out = sample;
                        }
                    }
                    clock.advance(frames as u64);
                },
                |err| {
                    tracing::error!(error = %err, "audio output error");
                },
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?;

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;
        self.stream = Some(stream);

        tracing::debug!("audio output started");
        Ok(())
    }

    /// Stop the output stream
    pub fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
            tracing::debug!("audio output stopped");
        }
    }
}
