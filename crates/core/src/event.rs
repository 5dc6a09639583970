//! Domain event system: decoupled observation of turns.
//!
//! The orchestration loop publishes events as a turn progresses. Transports
//! and diagnostics can subscribe without the loop knowing about them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// A user message was accepted and a turn began
    TurnStarted {
        session_id: String,
        content_preview: String,
        timestamp: DateTime<Utc>,
    },

    /// One generation finished
    ResponseGenerated {
        session_id: String,
        model: String,
        generation: usize,
        chars: usize,
        timestamp: DateTime<Utc>,
    },

    /// A structured call was dispatched
    CapabilityInvoked {
        name: String,
        known: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// The fetch decider injected review material
    ReviewsPrefetched {
        session_id: String,
        subject_id: String,
        timestamp: DateTime<Utc>,
    },

    /// A visible reply was delivered and the turn ended
    ReplyDelivered {
        session_id: String,
        generations: usize,
        calls_made: usize,
        timestamp: DateTime<Utc>,
    },

    /// An error occurred
    ErrorOccurred {
        context: String,
        error_message: String,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
