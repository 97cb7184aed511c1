//! Durable per-conversation turn history

use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};
use crate::store::eviction_batch;
use erni_llm::Message;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Default location of the history database
pub const DEFAULT_HISTORY_PATH: &str = "data/conversations.db";

/// Append-only turn item log keyed by conversation id
#[async_trait::async_trait]
pub trait TurnHistory: Send + Sync {
    /// Append items in order
    async fn append(&self, conversation_id: &str, items: &[Message]) -> Result<()>;

    /// Items oldest first; `limit` keeps only the most recent ones
    async fn read(&self, conversation_id: &str, limit: Option<usize>) -> Result<Vec<Message>>;
}

struct HistoryEntry {
    items: Vec<Message>,
    touched: Instant,
}

/// Process-local history
///
/// Bounded like the conversation store: a conversation not appended to
/// within the TTL is dropped, and at the size cap the least recently
/// appended ~10% are evicted before a new conversation is admitted.
pub struct MemoryTurnHistory {
    entries: Mutex<HashMap<String, HistoryEntry>>,
    ttl: Duration,
    max_conversations: usize,
    clock: Arc<dyn Clock>,
}

impl MemoryTurnHistory {
    /// Create an empty history
    #[must_use]
    pub fn new(ttl: Duration, max_conversations: usize) -> Self {
        Self::with_clock(ttl, max_conversations, Arc::new(SystemClock))
    }

    /// Create an empty history with an injected clock
    #[must_use]
    pub fn with_clock(ttl: Duration, max_conversations: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            max_conversations: max_conversations.max(1),
            clock,
        }
    }

    /// Number of conversations held
    #[must_use]
    pub fn len(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        self.sweep_expired(&mut entries, now);
        entries.len()
    }

    /// Whether no conversation is held
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn sweep_expired(&self, entries: &mut HashMap<String, HistoryEntry>, now: Instant) {
        entries.retain(|_, e| now.saturating_duration_since(e.touched) < self.ttl);
    }

    fn evict_oldest(&self, entries: &mut HashMap<String, HistoryEntry>) {
        let mut by_age: Vec<(Instant, String)> = entries
            .iter()
            .map(|(id, e)| (e.touched, id.clone()))
            .collect();
        by_age.sort();

        let batch = eviction_batch(self.max_conversations);
        for (_, id) in by_age.into_iter().take(batch) {
            entries.remove(&id);
        }
        debug!(evicted = batch, "Turn history full, evicted oldest conversations");
    }
}

#[async_trait::async_trait]
impl TurnHistory for MemoryTurnHistory {
    async fn append(&self, conversation_id: &str, items: &[Message]) -> Result<()> {
        let now = self.clock.now();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        self.sweep_expired(&mut entries, now);

        if !entries.contains_key(conversation_id) && entries.len() >= self.max_conversations {
            self.evict_oldest(&mut entries);
        }
        let entry = entries
            .entry(conversation_id.to_string())
            .or_insert_with(|| HistoryEntry {
                items: Vec::new(),
                touched: now,
            });
        entry.items.extend(items.iter().cloned());
        entry.touched = now;
        Ok(())
    }

    async fn read(&self, conversation_id: &str, limit: Option<usize>) -> Result<Vec<Message>> {
        let now = self.clock.now();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        self.sweep_expired(&mut entries, now);

        let Some(entry) = entries.get(conversation_id) else {
            return Ok(Vec::new());
        };
        let skip = limit.map_or(0, |n| entry.items.len().saturating_sub(n));
        Ok(entry.items.iter().skip(skip).cloned().collect())
    }
}

/// SQLite-backed history
pub struct SqliteTurnHistory {
    pool: SqlitePool,
}

impl SqliteTurnHistory {
    /// Open (or create) the history database at `path`
    ///
    /// # Errors
    /// Returns `Store` if the directory, connection or schema cannot be set up
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Store(format!("Failed to create history directory: {e}")))?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS turn_items (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                conversation_id TEXT NOT NULL,
                item TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_turn_items_conversation ON turn_items(conversation_id, id)",
        )
        .execute(&pool)
        .await?;

        info!(path = %path.display(), "Turn history initialized");
        Ok(Self { pool })
    }
}

#[async_trait::async_trait]
impl TurnHistory for SqliteTurnHistory {
    async fn append(&self, conversation_id: &str, items: &[Message]) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }
        let now = chrono::Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;
        for item in items {
            sqlx::query(
                "INSERT INTO turn_items (conversation_id, item, created_at) VALUES (?, ?, ?)",
            )
            .bind(conversation_id)
            .bind(serde_json::to_string(item)?)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        debug!(conversation_id = %conversation_id, count = items.len(), "Turn items appended");
        Ok(())
    }

    async fn read(&self, conversation_id: &str, limit: Option<usize>) -> Result<Vec<Message>> {
        let rows: Vec<(String,)> = match limit {
            Some(n) => {
                sqlx::query_as(
                    r#"
                    SELECT item FROM (
                        SELECT id, item FROM turn_items WHERE conversation_id = ?
                        ORDER BY id DESC LIMIT ?
                    ) ORDER BY id ASC
                    "#,
                )
                .bind(conversation_id)
                .bind(n as i64)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as("SELECT item FROM turn_items WHERE conversation_id = ? ORDER BY id ASC")
                    .bind(conversation_id)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        rows.into_iter()
            .map(|(raw,)| serde_json::from_str(&raw).map_err(Error::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use tempfile::TempDir;

    async fn exercise(history: &dyn TurnHistory) {
        history
            .append(
                "c1",
                &[Message::user("Hello"), Message::assistant("Hi, how can I help?")],
            )
            .await
            .unwrap();
        history.append("c2", &[Message::user("Other")]).await.unwrap();
        history.append("c1", &[Message::user("Costs?")]).await.unwrap();

        let all = history.read("c1", None).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].content, "Hello");

        let recent = history.read("c1", Some(2)).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[1].content, "Costs?");

        assert_eq!(history.read("c2", None).await.unwrap().len(), 1);
        assert!(history.read("unknown", None).await.unwrap().is_empty());
    }

    fn bounded(ttl_secs: u64, max: usize) -> (Arc<ManualClock>, MemoryTurnHistory) {
        let clock = Arc::new(ManualClock::new());
        let history =
            MemoryTurnHistory::with_clock(Duration::from_secs(ttl_secs), max, clock.clone());
        (clock, history)
    }

    #[tokio::test]
    async fn test_memory_history() {
        exercise(&MemoryTurnHistory::new(Duration::from_secs(3600), 100)).await;
    }

    #[tokio::test]
    async fn test_memory_history_expires_idle_conversations() {
        let (clock, history) = bounded(60, 100);
        history.append("idle", &[Message::user("Hello")]).await.unwrap();
        clock.advance(Duration::from_secs(30));
        history.append("active", &[Message::user("Hello")]).await.unwrap();

        clock.advance(Duration::from_secs(30));
        assert!(history.read("idle", None).await.unwrap().is_empty());
        assert_eq!(history.read("active", None).await.unwrap().len(), 1);
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn test_memory_history_size_cap() {
        let (clock, history) = bounded(3600, 10);
        for i in 0..10 {
            history
                .append(&format!("c{i}"), &[Message::user("Hello")])
                .await
                .unwrap();
            clock.advance(Duration::from_millis(10));
        }
        // Appending refreshes c0
        history.append("c0", &[Message::user("Again")]).await.unwrap();
        history.append("new", &[Message::user("Hello")]).await.unwrap();

        assert_eq!(history.len(), 10);
        assert_eq!(history.read("c0", None).await.unwrap().len(), 2);
        assert!(history.read("c1", None).await.unwrap().is_empty());
        assert_eq!(history.read("new", None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_sqlite_history() {
        let dir = TempDir::new().unwrap();
        let history = SqliteTurnHistory::open(dir.path().join("data").join("conversations.db"))
            .await
            .unwrap();
        exercise(&history).await;
    }
}
