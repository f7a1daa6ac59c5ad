//! Tool-call dispatch
//!
//! The endpoint can request a fixed set of local actions. Handlers
//! only *initiate* side effects (open an overlay, enqueue a generation
//! job) via one-way collaborator calls; the dispatcher acknowledges
//! initiation immediately and never waits for completion. Distinct
//! tool calls are independent, with no queuing between them.

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::json;

use crate::link::{ToolCallRequest, ToolCallResponse};
use crate::{Error, Result};

/// Tool name for opening the presentation overlay
pub const TOOL_OPEN_PRESENTATION: &str = "openPresentation";
/// Tool name for image generation
pub const TOOL_GENERATE_IMAGE: &str = "generateImage";
/// Tool name for video generation
pub const TOOL_GENERATE_VIDEO: &str = "generateVideo";

/// What kind of media a generation request produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForgeKind {
    /// Still image
    Image,
    /// Video fragment
    Video,
}

/// Which local workflow a dispatched call kicked off
///
/// The session uses this to project Presenting/Forging status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchedTool {
    /// Presentation overlay opened
    Presentation,
    /// Media generation initiated
    Forge(ForgeKind),
}

/// Presentation overlay collaborator
pub trait PresentationOverlay: Send + Sync {
    /// Open the overlay; returns whether it was already open
    ///
    /// # Errors
    ///
    /// Returns error if the overlay fails to initiate opening
    fn open(&self) -> Result<bool>;
}

/// Media-generation overlay collaborator
pub trait MediaForge: Send + Sync {
    /// Kick off a generation job; must return once the job is enqueued
    ///
    /// # Errors
    ///
    /// Returns error if the job cannot be enqueued
    fn request_generation(&self, kind: ForgeKind, prompt: String) -> Result<()>;
}

/// Result of dispatching one tool-call request
#[derive(Debug)]
pub struct Dispatch {
    /// The correlated acknowledgment to send back on the channel
    pub response: ToolCallResponse,
    /// The workflow that was actually initiated, if any
    pub initiated: Option<DispatchedTool>,
}

/// Matches inbound tool-call requests to local handlers
pub struct ToolDispatcher {
    presentation: Arc<dyn PresentationOverlay>,
    forge: Arc<dyn MediaForge>,
    answered: HashSet<String>,
}

impl ToolDispatcher {
    /// Create a dispatcher over the given collaborators
    pub fn new(presentation: Arc<dyn PresentationOverlay>, forge: Arc<dyn MediaForge>) -> Self {
        Self {
            presentation,
            forge,
            answered: HashSet::new(),
        }
    }

    /// Dispatch one request, producing exactly one response per id
    ///
    /// A duplicate id is a protocol error: it is logged and yields no
    /// second response. Unknown names and handler failures yield
    /// error-shaped responses; neither is fatal to the session.
    pub fn dispatch(&mut self, request: &ToolCallRequest) -> Option<Dispatch> {
        if !self.answered.insert(request.id.clone()) {
            tracing::warn!(id = %request.id, name = %request.name, "duplicate tool call id");
            return None;
        }

        let (payload, initiated) = match request.name.as_str() {
            TOOL_OPEN_PRESENTATION => self.open_presentation(),
            TOOL_GENERATE_IMAGE => self.generate(ForgeKind::Image, request),
            TOOL_GENERATE_VIDEO => self.generate(ForgeKind::Video, request),
            unknown => {
                let e = Error::UnknownToolCall(unknown.to_string());
                tracing::warn!(id = %request.id, name = %unknown, "unknown tool call");
                (json!({ "error": e.to_string() }), None)
            }
        };

        Some(Dispatch {
            response: ToolCallResponse {
                id: request.id.clone(),
                name: request.name.clone(),
                response: payload,
            },
            initiated,
        })
    }

    fn open_presentation(&self) -> (serde_json::Value, Option<DispatchedTool>) {
        match self.presentation.open() {
            Ok(was_open) => {
                let result = if was_open {
                    "reopened_from_cache"
                } else {
                    "initial_opening_success"
                };
                (
                    json!({ "result": result }),
                    Some(DispatchedTool::Presentation),
                )
            }
            Err(e) => {
                tracing::error!(error = %e, "presentation handler failed");
                (json!({ "error": e.to_string() }), None)
            }
        }
    }

    fn generate(
        &self,
        kind: ForgeKind,
        request: &ToolCallRequest,
    ) -> (serde_json::Value, Option<DispatchedTool>) {
        let Some(prompt) = request.args.get("prompt").and_then(|p| p.as_str()) else {
            tracing::warn!(id = %request.id, "generation request missing prompt");
            return (json!({ "error": "missing required argument: prompt" }), None);
        };

        match self.forge.request_generation(kind, prompt.to_string()) {
            Ok(()) => (
                json!({ "status": "FORGING_INITIATED" }),
                Some(DispatchedTool::Forge(kind)),
            ),
            Err(e) => {
                tracing::error!(error = %e, "forge handler failed");
                (json!({ "error": e.to_string() }), None)
            }
        }
    }
}
