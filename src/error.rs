//! Error types for Voxlink

use thiserror::Error;

/// Result type alias for Voxlink operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in a Voxlink session
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Microphone or camera access was refused
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The live channel could not be opened
    #[error("channel open failure: {0}")]
    ChannelOpen(String),

    /// Mid-session transport failure on the live channel
    #[error("channel error: {0}")]
    Channel(String),

    /// Inbound audio payload could not be decoded
    #[error("malformed audio: {0}")]
    MalformedAudio(String),

    /// Tool call named an operation we do not support
    #[error("unknown tool call: {0}")]
    UnknownToolCall(String),

    /// A tool handler failed while initiating its side effect
    #[error("handler failure: {0}")]
    Handler(String),

    /// Audio device error
    #[error("audio error: {0}")]
    Audio(String),

    /// Vision capture or encoding error
    #[error("vision error: {0}")]
    Vision(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
