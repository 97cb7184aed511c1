//! Replication - Cross-process context sharing and durable turn history
//!
//! Both halves are best-effort: a backend failure is logged at `warn` and
//! the turn carries on with local state.

mod context;
mod history;

pub use context::{ContextReplicator, ContextSnapshot};
pub use history::{MemoryTurnHistory, SqliteTurnHistory, TurnHistory, DEFAULT_HISTORY_PATH};

use crate::store::ConversationState;
use erni_llm::Message;
use erni_tools::BuildingProjectContext;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Conversation cap of the local-only history
const IN_MEMORY_MAX_CONVERSATIONS: usize = 1000;

/// Replicated view of a conversation used to resume it elsewhere
#[derive(Debug, Clone, PartialEq)]
pub struct ReplicatedConversation {
    /// Context as last replicated
    pub context: BuildingProjectContext,
    /// Agent that handled the last replicated turn, if known
    pub active_agent: Option<String>,
    /// Revision of the replicated state
    pub revision: u64,
    /// Turn history, oldest first
    pub history: Vec<Message>,
}

/// Context replicator plus turn history
pub struct ReplicationLayer {
    contexts: ContextReplicator,
    history: Arc<dyn TurnHistory>,
}

impl ReplicationLayer {
    /// Combine a context replicator with a history backend
    #[must_use]
    pub fn new(contexts: ContextReplicator, history: Arc<dyn TurnHistory>) -> Self {
        Self { contexts, history }
    }

    /// Local-only layer for development and tests
    #[must_use]
    pub fn in_memory(context_ttl: Duration) -> Self {
        Self::new(
            ContextReplicator::local_only(context_ttl),
            Arc::new(MemoryTurnHistory::new(
                context_ttl,
                IN_MEMORY_MAX_CONVERSATIONS,
            )),
        )
    }

    /// Context replicator
    #[must_use]
    pub fn contexts(&self) -> &ContextReplicator {
        &self.contexts
    }

    /// History backend
    #[must_use]
    pub fn history(&self) -> &Arc<dyn TurnHistory> {
        &self.history
    }

    /// Publish the outcome of a turn
    pub async fn record_turn(
        &self,
        conversation_id: &str,
        state: &ConversationState,
        new_items: &[Message],
    ) {
        let snapshot = ContextSnapshot {
            context: state.context.clone(),
            active_agent: Some(state.active_agent.clone()),
            revision: state.revision,
        };
        self.contexts.set_snapshot(conversation_id, &snapshot, None).await;
        if let Err(e) = self.history.append(conversation_id, new_items).await {
            warn!(conversation_id = %conversation_id, error = %e, "Turn history append failed");
        }
    }

    /// Replicated state of a conversation, if it is newer than `known_revision`
    ///
    /// `known_revision` is the revision of the caller's local copy, `None`
    /// when it has none. An equal or older replicated copy is not returned.
    pub async fn resume(
        &self,
        conversation_id: &str,
        known_revision: Option<u64>,
    ) -> Option<ReplicatedConversation> {
        let snapshot = self.contexts.get_snapshot(conversation_id).await?;
        if known_revision.is_some_and(|known| known >= snapshot.revision) {
            return None;
        }
        let history = self
            .history
            .read(conversation_id, None)
            .await
            .unwrap_or_else(|e| {
                warn!(conversation_id = %conversation_id, error = %e, "Turn history read failed");
                Vec::new()
            });
        Some(ReplicatedConversation {
            context: snapshot.context,
            active_agent: snapshot.active_agent,
            revision: snapshot.revision,
            history,
        })
    }
}
