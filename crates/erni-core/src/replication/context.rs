//! Shared context replication over Redis
//!
//! Each conversation is stored as a JSON [`ContextSnapshot`] under
//! `context:{conversation_id}` with a TTL. When Redis is not configured or
//! does not answer, a process-local map takes over and a warning is logged.
//! Operations never fail the caller.

use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};
use dashmap::DashMap;
use erni_tools::BuildingProjectContext;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const KEY_PREFIX: &str = "context:";

/// Replicated conversation context with the metadata needed to pick the
/// newest copy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextSnapshot {
    /// Collected facts
    pub context: BuildingProjectContext,
    /// Agent that handles the next turn
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_agent: Option<String>,
    /// Number of completed turns that produced this snapshot
    #[serde(default)]
    pub revision: u64,
}

impl ContextSnapshot {
    /// Snapshot carrying only a context
    #[must_use]
    pub fn new(context: BuildingProjectContext) -> Self {
        Self {
            context,
            active_agent: None,
            revision: 0,
        }
    }
}

/// Cross-process context store with local fallback
pub struct ContextReplicator {
    client: Option<redis::Client>,
    local: DashMap<String, (ContextSnapshot, Instant)>,
    default_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl ContextReplicator {
    /// Replicate through Redis at `redis_url`
    ///
    /// # Errors
    /// Returns `Configuration` if the URL cannot be parsed
    pub fn redis(redis_url: &str, default_ttl: Duration) -> Result<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| Error::Configuration(format!("invalid redis url: {e}")))?;
        Ok(Self {
            client: Some(client),
            ..Self::local_only(default_ttl)
        })
    }

    /// Keep contexts in this process only
    #[must_use]
    pub fn local_only(default_ttl: Duration) -> Self {
        Self {
            client: None,
            local: DashMap::new(),
            default_ttl,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock used for local expiry
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Whether a shared backend is configured
    #[must_use]
    pub fn is_shared(&self) -> bool {
        self.client.is_some()
    }

    /// Number of entries held in the local fallback map
    #[must_use]
    pub fn local_len(&self) -> usize {
        self.local.len()
    }

    fn key(conversation_id: &str) -> String {
        format!("{KEY_PREFIX}{conversation_id}")
    }

    async fn connection(&self) -> Option<redis::aio::MultiplexedConnection> {
        let client = self.client.as_ref()?;
        match client.get_multiplexed_async_connection().await {
            Ok(conn) => Some(conn),
            Err(e) => {
                warn!(error = %e, "Redis unavailable, using local context store");
                None
            }
        }
    }

    /// Load a replicated context
    pub async fn get_context(&self, conversation_id: &str) -> Option<BuildingProjectContext> {
        self.get_snapshot(conversation_id).await.map(|s| s.context)
    }

    /// Store a context for `ttl`, or the default TTL
    pub async fn set_context(
        &self,
        conversation_id: &str,
        ctx: &BuildingProjectContext,
        ttl: Option<Duration>,
    ) {
        self.set_snapshot(conversation_id, &ContextSnapshot::new(ctx.clone()), ttl)
            .await;
    }

    /// Load a replicated snapshot
    pub async fn get_snapshot(&self, conversation_id: &str) -> Option<ContextSnapshot> {
        if let Some(mut conn) = self.connection().await {
            let result: redis::RedisResult<Option<String>> = redis::cmd("GET")
                .arg(Self::key(conversation_id))
                .query_async(&mut conn)
                .await;
            match result {
                Ok(Some(raw)) => match serde_json::from_str(&raw) {
                    Ok(snapshot) => {
                        debug!(conversation_id = %conversation_id, "Context loaded from Redis");
                        return Some(snapshot);
                    }
                    Err(e) => {
                        warn!(conversation_id = %conversation_id, error = %e, "Discarding malformed replicated context");
                        return None;
                    }
                },
                Ok(None) => return None,
                Err(e) => warn!(error = %e, "Redis GET failed, using local context store"),
            }
        }

        let now = self.clock.now();
        let entry = self.local.get(conversation_id)?;
        let (snapshot, expires) = entry.value();
        (now < *expires).then(|| snapshot.clone())
    }

    /// Store a snapshot for `ttl`, or the default TTL
    pub async fn set_snapshot(
        &self,
        conversation_id: &str,
        snapshot: &ContextSnapshot,
        ttl: Option<Duration>,
    ) {
        let ttl = ttl.unwrap_or(self.default_ttl);

        if let Some(mut conn) = self.connection().await {
            match serde_json::to_string(snapshot) {
                Ok(raw) => {
                    let result: redis::RedisResult<()> = redis::cmd("SETEX")
                        .arg(Self::key(conversation_id))
                        .arg(ttl.as_secs().max(1))
                        .arg(raw)
                        .query_async(&mut conn)
                        .await;
                    match result {
                        Ok(()) => {
                            debug!(conversation_id = %conversation_id, ttl_secs = ttl.as_secs(), "Context replicated to Redis");
                            return;
                        }
                        Err(e) => warn!(error = %e, "Redis SETEX failed, using local context store"),
                    }
                }
                Err(e) => warn!(error = %e, "Context could not be serialized for Redis"),
            }
        }

        let now = self.clock.now();
        self.local.retain(|_, (_, expires)| now < *expires);
        self.local
            .insert(conversation_id.to_string(), (snapshot.clone(), now + ttl));
    }

    /// `None` when no shared backend is configured, otherwise whether it answers PING
    pub async fn ping(&self) -> Option<bool> {
        let client = self.client.as_ref()?;
        let Ok(mut conn) = client.get_multiplexed_async_connection().await else {
            return Some(false);
        };
        let pong: redis::RedisResult<String> = redis::cmd("PING").query_async(&mut conn).await;
        Some(pong.is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    #[tokio::test]
    async fn test_local_round_trip() {
        let replicator = ContextReplicator::local_only(Duration::from_secs(60));
        let ctx = BuildingProjectContext::new();
        replicator.set_context("c1", &ctx, None).await;

        assert_eq!(replicator.get_context("c1").await, Some(ctx.clone()));
        assert!(replicator.get_context("c2").await.is_none());
        assert!(!replicator.is_shared());
        assert_eq!(replicator.ping().await, None);

        let snapshot = replicator.get_snapshot("c1").await.unwrap();
        assert_eq!(snapshot, ContextSnapshot::new(ctx));
    }

    #[tokio::test]
    async fn test_snapshot_keeps_agent_and_revision() {
        let replicator = ContextReplicator::local_only(Duration::from_secs(60));
        let snapshot = ContextSnapshot {
            context: BuildingProjectContext::new(),
            active_agent: Some("Cost Estimation Agent".into()),
            revision: 3,
        };
        replicator.set_snapshot("c1", &snapshot, None).await;
        assert_eq!(replicator.get_snapshot("c1").await, Some(snapshot));
    }

    #[tokio::test]
    async fn test_local_entries_expire() {
        let clock = Arc::new(ManualClock::new());
        let replicator =
            ContextReplicator::local_only(Duration::from_secs(60)).with_clock(clock.clone());
        replicator
            .set_context("c1", &BuildingProjectContext::new(), Some(Duration::from_secs(10)))
            .await;

        clock.advance(Duration::from_secs(11));
        assert!(replicator.get_context("c1").await.is_none());
    }

    #[tokio::test]
    async fn test_expired_local_entries_are_swept_on_write() {
        let clock = Arc::new(ManualClock::new());
        let replicator =
            ContextReplicator::local_only(Duration::from_secs(10)).with_clock(clock.clone());
        let ctx = BuildingProjectContext::new();
        for i in 0..50 {
            replicator.set_context(&format!("old{i}"), &ctx, None).await;
        }
        assert_eq!(replicator.local_len(), 50);

        clock.advance(Duration::from_secs(10));
        replicator.set_context("fresh", &ctx, None).await;

        assert_eq!(replicator.local_len(), 1);
        assert!(replicator.get_context("fresh").await.is_some());
    }

    #[tokio::test]
    async fn test_unreachable_redis_falls_back() {
        // Nothing listens on port 1
        let replicator =
            ContextReplicator::redis("redis://127.0.0.1:1", Duration::from_secs(60)).unwrap();
        let ctx = BuildingProjectContext::new();
        replicator.set_context("c1", &ctx, None).await;

        assert_eq!(replicator.get_context("c1").await, Some(ctx));
        assert_eq!(replicator.ping().await, Some(false));
    }

    #[test]
    fn test_invalid_url() {
        assert!(matches!(
            ContextReplicator::redis("not a url", Duration::from_secs(1)),
            Err(Error::Configuration(_))
        ));
    }

    // Run with: cargo test --features redis-tests
    #[cfg(feature = "redis-tests")]
    mod redis_tests {
        use super::*;

        #[tokio::test]
        async fn test_redis_replication() {
            let replicator =
                ContextReplicator::redis("redis://127.0.0.1:6379", Duration::from_secs(60))
                    .unwrap();
            let snapshot = ContextSnapshot {
                context: BuildingProjectContext::new(),
                active_agent: Some("FAQ Agent".into()),
                revision: 1,
            };
            replicator
                .set_snapshot("test:replication", &snapshot, Some(Duration::from_secs(5)))
                .await;

            let other =
                ContextReplicator::redis("redis://127.0.0.1:6379", Duration::from_secs(60))
                    .unwrap();
            assert_eq!(other.get_snapshot("test:replication").await, Some(snapshot));
            assert_eq!(other.ping().await, Some(true));
        }
    }
}
