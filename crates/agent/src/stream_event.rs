//! Agent-level streaming events.
//!
//! `AgentStreamEvent` is what transports see of a turn. Fragments of every
//! generation are streamed as drafts; once the loop knows whether a draft was
//! a reply or a structured call it sends `reply` or `discard` for it.

use serde::{Deserialize, Serialize};

/// Events emitted by the agent while a turn runs.
///
/// - `chunk`   - text fragment of the current draft
/// - `discard` - the draft was a structured call; drop it from view
/// - `reply`   - the visible reply for this turn
/// - `done`    - the turn is complete
/// - `error`   - the turn failed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentStreamEvent {
    /// Partial text from the model for generation `generation` (1-based).
    Chunk { generation: usize, content: String },

    /// The draft of generation `generation` was a call, not a reply.
    Discard { generation: usize },

    /// The complete visible reply.
    Reply { content: String },

    /// The turn is complete.
    Done {
        session_id: String,
        generations: usize,
        calls_made: usize,
    },

    /// The turn failed.
    Error { message: String },
}

impl AgentStreamEvent {
    /// SSE event name for this event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Chunk { .. } => "chunk",
            Self::Discard { .. } => "discard",
            Self::Reply { .. } => "reply",
            Self::Done { .. } => "done",
            Self::Error { .. } => "error",
        }
    }

    /// Whether no further events follow this one.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Error { .. })
    }
}
