//! Conversation Store - Per-conversation state between turns
//!
//! Maps a conversation id to its context, active agent and accumulated turn
//! items. Two bounds apply on every access:
//! - entries not written within the TTL disappear;
//! - at the size cap, the oldest ~10% by last write are evicted before a
//!   new conversation is admitted.
//!
//! Backends:
//! - [`MemoryConversationStore`] (default)
//! - [`SqliteConversationStore`] for restarts without losing state

mod memory;
mod sqlite;

pub use memory::MemoryConversationStore;
pub use sqlite::SqliteConversationStore;

use crate::error::Result;
use erni_llm::Message;
use erni_tools::BuildingProjectContext;
use serde::{Deserialize, Serialize};

/// State carried between turns of one conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    /// Collected facts
    pub context: BuildingProjectContext,
    /// Agent that handles the next turn
    pub active_agent: String,
    /// Turn items so far, oldest first
    pub input_items: Vec<Message>,
    /// Incremented on every persisted turn
    #[serde(default)]
    pub revision: u64,
}

impl ConversationState {
    /// Fresh state for a new conversation
    #[must_use]
    pub fn new(active_agent: impl Into<String>) -> Self {
        Self {
            context: BuildingProjectContext::new(),
            active_agent: active_agent.into(),
            input_items: Vec::new(),
            revision: 0,
        }
    }
}

/// Storage for conversation state
#[async_trait::async_trait]
pub trait ConversationStore: Send + Sync {
    /// Backend name for logs and health output
    fn backend(&self) -> &'static str;

    /// Load a conversation, `None` if missing or expired
    async fn get(&self, id: &str) -> Result<Option<ConversationState>>;

    /// Write a conversation, replacing any previous state
    async fn save(&self, id: &str, state: &ConversationState) -> Result<()>;

    /// Remove a conversation
    async fn remove(&self, id: &str) -> Result<bool>;

    /// Number of live conversations
    async fn len(&self) -> Result<usize>;
}

/// Number of entries evicted when the store is full: 10%, at least one
pub(crate) fn eviction_batch(max_entries: usize) -> usize {
    (max_entries / 10).max(1)
}
