//! Vision frame sampling
//!
//! At most one camera frame goes out per conversational turn, captured
//! on the first turn-activity signal, downscaled and JPEG-encoded.
//! Vision is suspended while the assistant is speaking, presenting,
//! forging, or researching so frames are not wasted when the model is
//! not looking for them.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::RgbImage;

use crate::config::SessionConfig;
use crate::session::SessionStatus;
use crate::{Error, Result};

/// A raw camera frame (tightly packed RGB8)
#[derive(Debug, Clone)]
pub struct RawFrame {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// RGB8 pixel data, `width * height * 3` bytes
    pub rgb: Vec<u8>,
}

/// Camera collaborator supplying the most recent frame
pub trait FrameSource: Send + Sync {
    /// The current frame, or `None` if the camera has not produced one
    fn frame(&self) -> Option<RawFrame>;
}

/// Throttled once-per-turn frame sampler
pub struct VisionSampler {
    enabled: bool,
    captured_this_turn: bool,
    target_width: u32,
    target_height: u32,
    jpeg_quality: u8,
}

impl VisionSampler {
    /// Create a sampler from session configuration
    #[must_use]
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            enabled: config.vision_enabled,
            captured_this_turn: false,
            target_width: config.capture_width,
            target_height: config.capture_height,
            jpeg_quality: config.jpeg_quality,
        }
    }

    /// Enable or disable the vision channel
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Whether the vision channel is enabled
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether a capture should happen for the current turn activity
    ///
    /// True only when vision is enabled, this turn has not been
    /// captured yet, and the session status does not suspend vision.
    #[must_use]
    pub fn should_capture(&self, status: SessionStatus) -> bool {
        self.enabled && !self.captured_this_turn && !Self::suspended(status)
    }

    /// Whether vision is automatically suspended for this status
    #[must_use]
    pub const fn suspended(status: SessionStatus) -> bool {
        matches!(
            status,
            SessionStatus::Speaking
                | SessionStatus::Presenting
                | SessionStatus::Forging
                | SessionStatus::Researching
        )
    }

    /// Reset the per-turn latch (turn boundary or interruption)
    pub fn reset_turn(&mut self) {
        self.captured_this_turn = false;
    }

    /// Capture, downscale, and encode one frame
    ///
    /// Returns `None` when the source has no frame yet; the latch is
    /// only set on a successful capture so the next activity signal
    /// retries. The latch stays set for the rest of the turn, even an
    /// unusually long one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Vision`] if the frame data is malformed or
    /// JPEG encoding fails
    pub fn capture(&mut self, source: &dyn FrameSource) -> Result<Option<Vec<u8>>> {
        let Some(frame) = source.frame() else {
            return Ok(None);
        };

        let expected = frame.width as usize * frame.height as usize * 3;
        if frame.rgb.len() != expected {
            return Err(Error::Vision(format!(
                "frame buffer is {} bytes, expected {expected}",
                frame.rgb.len()
            )));
        }

        let img = RgbImage::from_raw(frame.width, frame.height, frame.rgb)
            .ok_or_else(|| Error::Vision("frame dimensions overflow".to_string()))?;
        let scaled = image::imageops::resize(
            &img,
            self.target_width,
            self.target_height,
            FilterType::Nearest,
        );

        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, self.jpeg_quality)
            .encode_image(&scaled)
            .map_err(|e| Error::Vision(e.to_string()))?;

        self.captured_this_turn = true;
        tracing::debug!(bytes = jpeg.len(), "vision frame captured");
        Ok(Some(jpeg))
    }
}
