//! Audio pipeline
//!
//! Capture feeds the outbound channel, the codec converts between
//! float samples and the PCM16 wire format, and the playback scheduler
//! clocks inbound speech out of the jitter buffer.

pub mod capture;
pub mod codec;
pub mod output;
pub mod playback;

pub use capture::AudioCapture;
pub use codec::{decode_frame, decode_pcm16, encode_pcm16, rms, samples_to_wav};
pub use output::{AudioOutput, OutputClock};
pub use playback::{PlaybackClock, PlaybackEvent, PlaybackScheduler};

/// A decoded block of audio samples with its format
///
/// Immutable once produced; ownership moves to whichever component
/// consumes it (the network sender or the playback scheduler).
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Interleaved signed 16-bit samples
    pub data: Vec<i16>,
    /// Samples per second per channel
    pub sample_rate: u32,
    /// Channel count (1 for both capture and synthesized speech here)
    pub channels: u16,
}

impl AudioFrame {
    /// De-interleave one channel as float samples in [-1, 1]
    ///
    /// An out-of-range channel index yields an empty vector.
    #[must_use]
    pub fn channel_f32(&self, channel: u16) -> Vec<f32> {
        if channel >= self.channels {
            return Vec::new();
        }
        self.data
            .iter()
            .skip(channel as usize)
            .step_by(self.channels as usize)
            .map(|&s| f32::from(s) / 32768.0)
            .collect()
    }

    /// Number of sample frames (per-channel samples)
    #[must_use]
    pub fn frame_count(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.data.len() / self.channels as usize
    }

    /// Duration of this frame at its sample rate
    #[must_use]
    pub fn duration(&self) -> std::time::Duration {
        if self.sample_rate == 0 {
            return std::time::Duration::ZERO;
        }
        let frames = self.frame_count() as u64;
        std::time::Duration::from_nanos(frames * 1_000_000_000 / u64::from(self.sample_rate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_f32_deinterleaves() {
        let frame = AudioFrame {
            data: vec![100, 200, 300, 400],
            sample_rate: 24_000,
            channels: 2,
        };
        let left = frame.channel_f32(0);
        let right = frame.channel_f32(1);
        assert_eq!(left.len(), 2);
        assert!((left[0] - 100.0 / 32768.0).abs() < f32::EPSILON);
        assert!((right[1] - 400.0 / 32768.0).abs() < f32::EPSILON);
        // Out-of-range channel yields nothing.
        assert!(frame.channel_f32(2).is_empty());
    }

    #[test]
    fn duration_reflects_frame_count() {
        let frame = AudioFrame {
            data: vec![0; 4800],
            sample_rate: 24_000,
            channels: 2,
        };
        assert_eq!(frame.frame_count(), 2400);
        assert_eq!(frame.duration(), std::time::Duration::from_millis(100));
    }
}
