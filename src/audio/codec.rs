//! Conversion between float samples and the PCM16 wire format

use super::AudioFrame;
use crate::{Error, Result};

/// Encode float samples as little-endian PCM16 bytes
///
/// Each sample is clamped to [-1, 1] before scaling to the full i16
/// range, rounding to nearest.
#[must_use]
pub fn encode_pcm16(samples: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        #[allow(clippy::cast_possible_truncation)]
        let value = (sample.clamp(-1.0, 1.0) * 32767.0).round() as i16;
        out.extend_from_slice(&value.to_le_bytes());
    }
    out
}

/// Decode little-endian PCM16 bytes into per-channel float samples
///
/// Multi-channel data is de-interleaved per sample index.
///
/// # Errors
///
/// Returns [`Error::MalformedAudio`] on odd-length input or a byte
/// count that does not divide evenly across channels.
pub fn decode_pcm16(bytes: &[u8], channels: u16) -> Result<Vec<Vec<f32>>> {
    if channels == 0 {
        return Err(Error::MalformedAudio("zero channels".to_string()));
    }
    if bytes.len() % 2 != 0 {
        return Err(Error::MalformedAudio(format!(
            "odd byte length {}",
            bytes.len()
        )));
    }
    let total_samples = bytes.len() / 2;
    let channels = channels as usize;
    if total_samples % channels != 0 {
        return Err(Error::MalformedAudio(format!(
            "{total_samples} samples not divisible by {channels} channels"
        )));
    }

    let frame_count = total_samples / channels;
    let mut out = vec![Vec::with_capacity(frame_count); channels];
    for (i, pair) in bytes.chunks_exact(2).enumerate() {
        let value = i16::from_le_bytes([pair[0], pair[1]]);
        out[i % channels].push(f32::from(value) / 32768.0);
    }
    Ok(out)
}

/// Decode a PCM16 payload into an [`AudioFrame`]
///
/// # Errors
///
/// Same failure modes as [`decode_pcm16`]
pub fn decode_frame(bytes: &[u8], sample_rate: u32, channels: u16) -> Result<AudioFrame> {
    if channels == 0 {
        return Err(Error::MalformedAudio("zero channels".to_string()));
    }
    if bytes.len() % 2 != 0 {
        return Err(Error::MalformedAudio(format!(
            "odd byte length {}",
            bytes.len()
        )));
    }
    let total_samples = bytes.len() / 2;
    if total_samples % channels as usize != 0 {
        return Err(Error::MalformedAudio(format!(
            "{total_samples} samples not divisible by {channels} channels"
        )));
    }
    let data = bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    Ok(AudioFrame {
        data,
        sample_rate,
        channels,
    })
}

/// Root-mean-square level of a sample block
///
/// Drives the live audio level meter published by the session.
#[must_use]
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let mean = samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32;
    mean.sqrt()
}

/// Convert f32 samples to WAV bytes (mono, 16-bit)
///
/// Diagnostic path used by the `test-mic` subcommand.
///
/// # Errors
///
/// Returns error if WAV encoding fails
pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).map_err(|e| Error::Audio(e.to_string()))?;

        for &sample in samples {
            #[allow(clippy::cast_possible_truncation)]
            let sample_i16 = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
            writer
                .write_sample(sample_i16)
                .map_err(|e| Error::Audio(e.to_string()))?;
        }

        writer.finalize().map_err(|e| Error::Audio(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}
