//! Configuration for a Voxlink session

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::Result;

/// Sample rate for microphone capture (16kHz for speech)
pub const INPUT_SAMPLE_RATE: u32 = 16_000;

/// Sample rate of synthesized speech from the endpoint
pub const OUTPUT_SAMPLE_RATE: u32 = 24_000;

/// Session configuration
///
/// All fields have defaults matching the reference deployment; a TOML
/// file can override any subset of them.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Microphone capture sample rate in Hz
    pub input_sample_rate: u32,

    /// Playback sample rate in Hz (matches the endpoint's TTS output)
    pub output_sample_rate: u32,

    /// Jitter buffer latency in milliseconds
    ///
    /// Scheduling delay applied on the first buffer and after an
    /// underrun to absorb network arrival jitter.
    pub jitter_buffer_ms: u64,

    /// Width of the downscaled vision frame
    pub capture_width: u32,

    /// Height of the downscaled vision frame
    pub capture_height: u32,

    /// JPEG quality (1-100) for vision frames
    pub jpeg_quality: u8,

    /// Whether the camera channel starts enabled
    pub vision_enabled: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            input_sample_rate: INPUT_SAMPLE_RATE,
            output_sample_rate: OUTPUT_SAMPLE_RATE,
            jitter_buffer_ms: 200,
            capture_width: 320,
            capture_height: 240,
            jpeg_quality: 40,
            vision_enabled: true,
        }
    }
}

impl SessionConfig {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate field ranges
    ///
    /// # Errors
    ///
    /// Returns error if a field is out of range
    pub fn validate(&self) -> Result<()> {
        if self.input_sample_rate == 0 || self.output_sample_rate == 0 {
            return Err(crate::Error::Config(
                "sample rates must be non-zero".to_string(),
            ));
        }
        if self.jpeg_quality == 0 || self.jpeg_quality > 100 {
            return Err(crate::Error::Config(format!(
                "jpeg_quality must be 1-100, got {}",
                self.jpeg_quality
            )));
        }
        if self.capture_width == 0 || self.capture_height == 0 {
            return Err(crate::Error::Config(
                "capture dimensions must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Jitter buffer latency as a [`Duration`]
    #[must_use]
    pub const fn jitter_latency(&self) -> Duration {
        Duration::from_millis(self.jitter_buffer_ms)
    }
}
