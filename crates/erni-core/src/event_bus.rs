//! EventBus - broadcast of turn lifecycle events to in-process subscribers
//!
//! Events carry ids and outcomes only. Message text and context values stay
//! in the turn response.

use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Lifecycle event of one turn
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnEvent {
    /// A turn entered the runner
    TurnStarted {
        /// Turn identifier
        turn_id: Uuid,
        /// Conversation identifier
        conversation_id: String,
        /// Active agent at turn start
        agent: String,
    },
    /// A guardrail produced a verdict
    GuardrailEvaluated {
        /// Turn identifier
        turn_id: Uuid,
        /// Guardrail name
        guardrail: String,
        /// Whether it passed
        passed: bool,
    },
    /// Control moved between agents
    HandoffApplied {
        /// Turn identifier
        turn_id: Uuid,
        /// Previous agent
        source_agent: String,
        /// New agent
        target_agent: String,
    },
    /// The turn finished and its state was persisted
    TurnCompleted {
        /// Turn identifier
        turn_id: Uuid,
        /// Active agent after the turn
        agent: String,
        /// Whether an input guardrail refused the turn
        refused: bool,
        /// Wall time in milliseconds
        duration_ms: u64,
    },
    /// The turn aborted without persisting
    TurnFailed {
        /// Turn identifier
        turn_id: Uuid,
        /// Public error message
        error: String,
    },
}

impl TurnEvent {
    /// Turn this event belongs to
    #[must_use]
    pub fn turn_id(&self) -> Uuid {
        match self {
            Self::TurnStarted { turn_id, .. }
            | Self::GuardrailEvaluated { turn_id, .. }
            | Self::HandoffApplied { turn_id, .. }
            | Self::TurnCompleted { turn_id, .. }
            | Self::TurnFailed { turn_id, .. } => *turn_id,
        }
    }
}

/// Broadcast channel for [`TurnEvent`]s
///
/// Slow subscribers lag and miss events instead of blocking turns.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<TurnEvent>,
}

impl EventBus {
    /// Create a bus buffering `capacity` events per subscriber
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Receive all future events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<TurnEvent> {
        self.sender.subscribe()
    }

    /// Publish to current subscribers; returns how many received it
    pub fn publish(&self, event: TurnEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Number of active subscribers
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
