//! SQLite conversation store
//!
//! State is stored as JSON next to its last-write time in Unix
//! milliseconds. The TTL and size-cap sweeps run as SQL before each access.
//! An entry expires once its age reaches the TTL.

use super::{eviction_batch, ConversationState, ConversationStore};
use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Persistent store backed by a SQLite file
pub struct SqliteConversationStore {
    pool: SqlitePool,
    ttl: Duration,
    max_entries: usize,
    clock: Arc<dyn Clock>,
}

impl SqliteConversationStore {
    /// Open (or create) the database at `path`
    ///
    /// # Errors
    /// Returns `Store` if the directory, connection or schema cannot be set up
    pub async fn open(path: impl AsRef<Path>, ttl: Duration, max_entries: usize) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Store(format!("Failed to create database directory: {e}")))?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self {
            pool,
            ttl,
            max_entries: max_entries.max(1),
            clock: Arc::new(SystemClock),
        };
        store.init_schema().await?;

        info!(path = %path.display(), max_entries = store.max_entries, "SQLite conversation store initialized");
        Ok(store)
    }

    /// Replace the clock used for last-write times
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn now_ms(&self) -> i64 {
        self.clock.utc().timestamp_millis()
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS conversations (
                conversation_id TEXT PRIMARY KEY,
                state TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_conversations_updated_at ON conversations(updated_at)",
        )
        .execute(&self.pool)
        .await?;

        debug!("Conversation schema initialized");
        Ok(())
    }

    async fn sweep_expired(&self, now_ms: i64) -> Result<()> {
        let cutoff = now_ms - self.ttl.as_millis() as i64;
        let result = sqlx::query("DELETE FROM conversations WHERE updated_at <= ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() > 0 {
            debug!(removed = result.rows_affected(), "Expired conversations removed");
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ConversationStore for SqliteConversationStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn get(&self, id: &str) -> Result<Option<ConversationState>> {
        self.sweep_expired(self.now_ms()).await?;

        let row: Option<(String,)> =
            sqlx::query_as("SELECT state FROM conversations WHERE conversation_id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(|(raw,)| serde_json::from_str(&raw).map_err(Error::from))
            .transpose()
    }

    async fn save(&self, id: &str, state: &ConversationState) -> Result<()> {
        let now = self.now_ms();
        self.sweep_expired(now).await?;

        let exists: Option<(i64,)> =
            sqlx::query_as("SELECT 1 FROM conversations WHERE conversation_id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        if exists.is_none() {
            let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM conversations")
                .fetch_one(&self.pool)
                .await?;
            if count as usize >= self.max_entries {
                let batch = eviction_batch(self.max_entries) as i64;
                sqlx::query(
                    r#"
                    DELETE FROM conversations WHERE conversation_id IN (
                        SELECT conversation_id FROM conversations
                        ORDER BY updated_at ASC LIMIT ?
                    )
                    "#,
                )
                .bind(batch)
                .execute(&self.pool)
                .await?;
                debug!(evicted = batch, "Conversation store full, evicted oldest entries");
            }
        }

        let data = serde_json::to_string(state)?;
        sqlx::query(
            r#"
            INSERT INTO conversations (conversation_id, state, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(conversation_id) DO UPDATE SET
                state = excluded.state,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(id)
        .bind(&data)
        .bind(now)
        .execute(&self.pool)
        .await?;

        debug!(conversation_id = %id, "Conversation saved to SQLite");
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM conversations WHERE conversation_id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn len(&self) -> Result<usize> {
        self.sweep_expired(self.now_ms()).await?;
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM conversations")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use erni_llm::Message;
    use tempfile::TempDir;

    async fn open(dir: &TempDir, ttl: Duration, max: usize) -> SqliteConversationStore {
        SqliteConversationStore::open(dir.path().join("state").join("conversations.db"), ttl, max)
            .await
            .unwrap()
    }

    async fn open_with_clock(
        dir: &TempDir,
        ttl: Duration,
        max: usize,
    ) -> (Arc<ManualClock>, SqliteConversationStore) {
        let clock = Arc::new(ManualClock::new());
        let store = open(dir, ttl, max).await.with_clock(clock.clone());
        (clock, store)
    }

    #[tokio::test]
    async fn test_save_get_remove() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir, Duration::from_secs(3600), 100).await;

        let mut state = ConversationState::new("Triage Agent");
        state.input_items.push(Message::user("Hello"));
        store.save("c1", &state).await.unwrap();

        assert_eq!(store.get("c1").await.unwrap(), Some(state.clone()));
        state.active_agent = "FAQ Agent".into();
        store.save("c1", &state).await.unwrap();
        assert_eq!(store.get("c1").await.unwrap().unwrap().active_agent, "FAQ Agent");
        assert_eq!(store.len().await.unwrap(), 1);

        assert!(store.remove("c1").await.unwrap());
        assert!(store.get("c1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_state_survives_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = open(&dir, Duration::from_secs(3600), 100).await;
            store.save("c1", &ConversationState::new("Triage Agent")).await.unwrap();
        }
        let store = open(&dir, Duration::from_secs(3600), 100).await;
        assert!(store.get("c1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_ttl_expiry() {
        let dir = TempDir::new().unwrap();
        let (clock, store) = open_with_clock(&dir, Duration::from_secs(60), 100).await;
        store.save("c1", &ConversationState::new("Triage Agent")).await.unwrap();

        clock.advance(Duration::from_secs(59));
        assert!(store.get("c1").await.unwrap().is_some());

        // Gone at exactly the TTL, like the memory store
        clock.advance(Duration::from_secs(1));
        assert!(store.get("c1").await.unwrap().is_none());
        assert_eq!(store.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_size_cap() {
        let dir = TempDir::new().unwrap();
        let (clock, store) = open_with_clock(&dir, Duration::from_secs(3600), 3).await;
        for i in 0..3 {
            store
                .save(&format!("c{i}"), &ConversationState::new("Triage Agent"))
                .await
                .unwrap();
            clock.advance(Duration::from_millis(5));
        }
        store.save("c3", &ConversationState::new("Triage Agent")).await.unwrap();

        assert_eq!(store.len().await.unwrap(), 3);
        assert!(store.get("c0").await.unwrap().is_none());
        assert!(store.get("c3").await.unwrap().is_some());
    }
}
