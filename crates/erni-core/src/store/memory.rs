//! In-memory conversation store

use super::{eviction_batch, ConversationState, ConversationStore};
use crate::clock::{Clock, SystemClock};
use crate::error::Result;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::debug;

struct Entry {
    state: ConversationState,
    written: Instant,
}

/// Process-local store bounded by TTL and entry count
pub struct MemoryConversationStore {
    entries: Mutex<HashMap<String, Entry>>,
    ttl: Duration,
    max_entries: usize,
    clock: Arc<dyn Clock>,
}

impl MemoryConversationStore {
    /// Create a store
    #[must_use]
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self::with_clock(ttl, max_entries, Arc::new(SystemClock))
    }

    /// Create a store with an injected clock
    #[must_use]
    pub fn with_clock(ttl: Duration, max_entries: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            max_entries: max_entries.max(1),
            clock,
        }
    }

    fn sweep_expired(&self, entries: &mut HashMap<String, Entry>, now: Instant) {
        let before = entries.len();
        entries.retain(|_, e| now.saturating_duration_since(e.written) < self.ttl);
        let removed = before - entries.len();
        if removed > 0 {
            debug!(removed, "Expired conversations removed");
        }
    }

    fn evict_oldest(&self, entries: &mut HashMap<String, Entry>) {
        let mut by_age: Vec<(Instant, String)> = entries
            .iter()
            .map(|(id, e)| (e.written, id.clone()))
            .collect();
        by_age.sort();

        let batch = eviction_batch(self.max_entries);
        for (_, id) in by_age.into_iter().take(batch) {
            entries.remove(&id);
        }
        debug!(evicted = batch, "Conversation store full, evicted oldest entries");
    }
}

#[async_trait::async_trait]
impl ConversationStore for MemoryConversationStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, id: &str) -> Result<Option<ConversationState>> {
        let now = self.clock.now();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        self.sweep_expired(&mut entries, now);
        Ok(entries.get(id).map(|e| e.state.clone()))
    }

    async fn save(&self, id: &str, state: &ConversationState) -> Result<()> {
        let now = self.clock.now();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        self.sweep_expired(&mut entries, now);

        if !entries.contains_key(id) && entries.len() >= self.max_entries {
            self.evict_oldest(&mut entries);
        }
        entries.insert(
            id.to_string(),
            Entry {
                state: state.clone(),
                written: now,
            },
        );
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<bool> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.remove(id).is_some())
    }

    async fn len(&self) -> Result<usize> {
        let now = self.clock.now();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        self.sweep_expired(&mut entries, now);
        Ok(entries.len())
    }
}
