//! Session status projection

use crate::link::GroundingSource;

/// Connection/activity state of the voice link
///
/// Projected to observers on every change; not a control surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Initial and terminal state; no capture, no playback
    Disconnected,
    /// Acquiring devices and opening the channel
    Connecting,
    /// Connected but muted
    Idle,
    /// Capture pipeline active and streaming
    Listening,
    /// Assistant audio is playing
    Speaking,
    /// The model is producing a turn but no audio has arrived yet
    Thinking,
    /// The endpoint reported consulting external search results
    Researching,
    /// The presentation overlay was opened by a tool call
    Presenting,
    /// A media generation job was initiated by a tool call
    Forging,
}

impl SessionStatus {
    /// Whether the session holds live hardware and an open channel
    #[must_use]
    pub const fn is_connected(self) -> bool {
        !matches!(self, Self::Disconnected | Self::Connecting)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Idle => "idle",
            Self::Listening => "listening",
            Self::Speaking => "speaking",
            Self::Thinking => "thinking",
            Self::Researching => "researching",
            Self::Presenting => "presenting",
            Self::Forging => "forging",
        };
        f.write_str(name)
    }
}

/// One-way telemetry published by the session controller
#[derive(Debug, Clone)]
pub enum SessionUpdate {
    /// Status changed
    Status(SessionStatus),
    /// RMS level of the most recent captured or played block
    AudioLevel(f32),
    /// Live transcript line (empty string blanks the display)
    Transcript(String),
    /// Grounding sources for the active turn (empty clears them)
    Grounding(Vec<GroundingSource>),
    /// The connect attempt failed with this reason
    LinkFailed(String),
    /// The session ended mid-flight with this reason
    Terminated(String),
}
