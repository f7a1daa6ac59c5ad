//! Abstract live channel to the conversational endpoint
//!
//! The wire protocol is deliberately out of scope: the session only
//! needs an ordered stream of [`LinkEvent`]s and an outbound
//! [`LinkSink`]. Concrete transports (websocket, in-process fake for
//! tests) implement [`LiveConnector`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::Result;

/// A tool-call request from the remote endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Correlation id; the response must echo it
    pub id: String,
    /// Operation name, one of the fixed supported set
    pub name: String,
    /// Structured argument payload
    pub args: serde_json::Value,
}

/// Acknowledgment for a tool-call request
///
/// Carries initiation status, not completion; side effects run on
/// their own after the response is sent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallResponse {
    /// Echoed correlation id
    pub id: String,
    /// Echoed operation name
    pub name: String,
    /// Opaque result payload (or error shape for failures)
    pub response: serde_json::Value,
}

/// An external reference the endpoint cites for a turn's response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingSource {
    /// Human-readable title
    pub title: String,
    /// Link to the cited material
    pub uri: String,
}

/// Inbound events from the live channel, delivered in arrival order
#[derive(Debug, Clone)]
pub enum LinkEvent {
    /// Synthesized speech payload (PCM16 little-endian bytes)
    AudioChunk(Vec<u8>),
    /// Partial transcription of the user's speech
    InputTranscript(String),
    /// Partial transcription of the assistant's speech
    OutputTranscript(String),
    /// The model started producing a turn
    TurnStarted,
    /// The current turn finished
    TurnComplete,
    /// User barge-in; all queued playback must be flushed
    Interrupted,
    /// The endpoint requests a local action
    ToolCall(ToolCallRequest),
    /// Search results the endpoint consulted this turn
    Grounding(Vec<GroundingSource>),
    /// The channel closed (reason)
    Closed(String),
    /// Transport failure (reason)
    Error(String),
}

/// Outbound half of the live channel
#[async_trait]
pub trait LinkSink: Send + Sync {
    /// Send a block of captured audio (PCM16 little-endian bytes)
    ///
    /// # Errors
    ///
    /// Returns error on transport failure
    async fn send_audio(&self, pcm: Vec<u8>) -> Result<()>;

    /// Send a compressed camera frame (JPEG bytes)
    ///
    /// # Errors
    ///
    /// Returns error on transport failure
    async fn send_image(&self, jpeg: Vec<u8>) -> Result<()>;

    /// Send a correlated tool-call acknowledgment
    ///
    /// # Errors
    ///
    /// Returns error on transport failure
    async fn send_tool_response(&self, response: ToolCallResponse) -> Result<()>;
}

/// An open live channel: outbound sink plus ordered inbound events
pub struct LiveChannel {
    /// Outbound sender
    pub sink: Box<dyn LinkSink>,
    /// Inbound event stream; a single consumer preserves ordering
    pub events: mpsc::Receiver<LinkEvent>,
}

/// Opens a live channel to the endpoint
#[async_trait]
pub trait LiveConnector: Send + Sync {
    /// Open the channel
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::ChannelOpen`] if the channel cannot be
    /// established
    async fn connect(&self) -> Result<LiveChannel>;
}
