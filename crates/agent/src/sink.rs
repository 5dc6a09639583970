//! Where a turn's stream events go.

use crate::stream_event::AgentStreamEvent;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Receives stream events in the order the turn produces them.
#[async_trait]
pub trait TurnSink: Send + Sync {
    async fn emit(&self, event: AgentStreamEvent);
}

#[async_trait]
impl TurnSink for mpsc::Sender<AgentStreamEvent> {
    async fn emit(&self, event: AgentStreamEvent) {
        // The turn still completes and updates history if the client went away
        if self.send(event).await.is_err() {
            tracing::trace!("Turn sink receiver dropped");
        }
    }
}

/// Discards everything. Used by the fetch decider and non-streaming callers.
pub struct NullSink;

#[async_trait]
impl TurnSink for NullSink {
    async fn emit(&self, _event: AgentStreamEvent) {}
}
