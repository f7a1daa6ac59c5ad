//! Voxlink - real-time duplex voice session controller
//!
//! This library drives a live voice link to a conversational AI
//! endpoint: microphone capture streamed out, synthesized speech
//! streamed back through a jitter-buffered playback scheduler,
//! barge-in interruption, once-per-turn vision frames, live
//! transcription, and tool-call dispatch.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                 Session Controller                    │
//! │  state machine │ mute/vision toggles │ status sink   │
//! └──────┬───────────────┬───────────────┬───────────────┘
//!        │               │               │
//! ┌──────▼─────┐  ┌──────▼──────┐  ┌─────▼─────────┐
//! │  Capture   │  │  Playback   │  │  Tool-Call    │
//! │  + Codec   │  │  Scheduler  │  │  Dispatcher   │
//! └──────┬─────┘  └──────┬──────┘  └─────┬─────────┘
//!        │               │               │
//! ┌──────▼───────────────▼───────────────▼───────────────┐
//! │          Live Channel (abstract endpoint)             │
//! └──────────────────────────────────────────────────────┘
//! ```

pub mod audio;
pub mod config;
pub mod error;
pub mod link;
pub mod session;
pub mod tools;
pub mod transcript;
pub mod vision;

pub use config::SessionConfig;
pub use error::{Error, Result};
pub use link::{
    GroundingSource, LinkEvent, LinkSink, LiveChannel, LiveConnector, ToolCallRequest,
    ToolCallResponse,
};
pub use session::{
    MediaDevices, SessionController, SessionHandle, SessionStatus, SessionUpdate, SystemDevices,
};
pub use tools::{DispatchedTool, ForgeKind, MediaForge, PresentationOverlay, ToolDispatcher};
pub use transcript::{Role, TranscriptAggregator};
pub use vision::{FrameSource, RawFrame, VisionSampler};
