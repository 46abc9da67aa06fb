//! Domain event system: decoupled observation of the agent loop.
//!
//! The orchestrator publishes events as a turn progresses. Front ends and
//! tests can subscribe without the loop knowing who is listening.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::tool::ToolOrigin;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// A user turn started
    TurnStarted {
        conversation_id: String,
        timestamp: DateTime<Utc>,
    },

    /// The model answered one round-trip
    ModelResponded {
        conversation_id: String,
        iteration: u32,
        tool_calls: usize,
        tokens_used: Option<u32>,
        timestamp: DateTime<Utc>,
    },

    /// A tool was executed
    ToolExecuted {
        call_id: String,
        tool_name: String,
        /// Raw argument text as the model sent it
        arguments: String,
        origin: Option<ToolOrigin>,
        success: bool,
        /// Leading part of the tool-role payload
        result_preview: String,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// The remote catalog could not be listed; only local tools were offered
    CatalogDegraded {
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// A user turn ended
    TurnFinished {
        conversation_id: String,
        iterations: u32,
        limit_reached: bool,
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
