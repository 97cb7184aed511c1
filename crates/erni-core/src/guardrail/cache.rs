//! Bounded, time-expiring cache of guardrail verdicts
//!
//! Entries expire a fixed TTL after insertion. When the cache is full the
//! oldest insertion is evicted; lookups do not refresh an entry's position.

use super::GuardrailResult;
use crate::clock::{Clock, SystemClock};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::debug;

struct Entry {
    result: GuardrailResult,
    inserted_at: Instant,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<String, Entry>,
    /// Keys in insertion order. With a fixed TTL this is also expiry order.
    order: VecDeque<String>,
}

/// Shared guardrail verdict cache
pub struct GuardrailCache {
    inner: Mutex<Inner>,
    capacity: usize,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl GuardrailCache {
    /// Create a cache with the system clock
    #[must_use]
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self::with_clock(capacity, ttl, Arc::new(SystemClock))
    }

    /// Create a cache with a custom clock
    #[must_use]
    pub fn with_clock(capacity: usize, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            capacity,
            ttl,
            clock,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn is_expired(&self, inserted_at: Instant, now: Instant) -> bool {
        now.saturating_duration_since(inserted_at) >= self.ttl
    }

    /// Look up a live entry
    #[must_use]
    pub fn get(&self, key: &str) -> Option<GuardrailResult> {
        let now = self.clock.now();
        let mut inner = self.lock();
        let expired = match inner.entries.get(key) {
            Some(entry) if !self.is_expired(entry.inserted_at, now) => {
                return Some(entry.result.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            inner.entries.remove(key);
            inner.order.retain(|k| k != key);
        }
        None
    }

    /// Insert or replace an entry
    pub fn put(&self, key: impl Into<String>, result: GuardrailResult) {
        if self.capacity == 0 {
            return;
        }
        let key = key.into();
        let now = self.clock.now();
        let mut inner = self.lock();

        if inner.entries.remove(&key).is_some() {
            inner.order.retain(|k| k != &key);
        }

        // Expired entries sit at the front of the queue
        while let Some(front) = inner.order.front() {
            let expired = inner
                .entries
                .get(front)
                .is_none_or(|e| self.is_expired(e.inserted_at, now));
            if !expired {
                break;
            }
            if let Some(stale) = inner.order.pop_front() {
                inner.entries.remove(&stale);
            }
        }

        while inner.entries.len() >= self.capacity {
            let Some(oldest) = inner.order.pop_front() else {
                break;
            };
            inner.entries.remove(&oldest);
            debug!(key = %oldest, "Evicted guardrail cache entry");
        }

        inner.order.push_back(key.clone());
        inner.entries.insert(
            key,
            Entry {
                result,
                inserted_at: now,
            },
        );
    }

    /// Number of stored entries, including ones that expired but were not yet swept
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Whether the cache holds no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of entries
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
