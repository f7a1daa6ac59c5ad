//! Transcription aggregation
//!
//! Streamed partial-text fragments are appended to per-role buffers
//! and the concatenated line is re-rendered on every fragment so
//! observers can show live partial transcripts.

/// Who produced a transcript fragment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// The human speaker
    User,
    /// The remote assistant
    Assistant,
}

/// Accumulates per-turn user and assistant transcripts
#[derive(Debug, Default)]
pub struct TranscriptAggregator {
    user: String,
    assistant: String,
}

impl TranscriptAggregator {
    /// Create an empty aggregator
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment and return the re-rendered live line
    pub fn push(&mut self, role: Role, delta: &str) -> String {
        match role {
            Role::User => {
                self.user.push_str(delta);
                format!("USER: {}", self.user)
            }
            Role::Assistant => {
                self.assistant.push_str(delta);
                format!("LINK: {}", self.assistant)
            }
        }
    }

    /// Clear both buffers at a turn boundary
    ///
    /// The last rendered text stays visible on the consumer side until
    /// the controller blanks it explicitly.
    pub fn turn_complete(&mut self) {
        self.user.clear();
        self.assistant.clear();
    }

    /// Clear both buffers on barge-in and return the blanked render
    pub fn interrupt(&mut self) -> String {
        self.user.clear();
        self.assistant.clear();
        String::new()
    }

    /// Current user buffer contents
    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Current assistant buffer contents
    #[must_use]
    pub fn assistant(&self) -> &str {
        &self.assistant
    }
}
