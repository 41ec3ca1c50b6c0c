//! In-Memory Counter Store
//!
//! Process-local [`CounterStore`] backend. Counters live in a `HashMap`
//! behind an async `RwLock` with an expiry deadline per entry; holding the
//! write lock across the read-modify-write makes increment-and-expire a
//! single indivisible step, matching the contract the distributed backend
//! provides via scripting.
//!
//! Suitable for single-instance deployments and for deterministic tests
//! (deadlines use `tokio::time::Instant`, so paused-clock tests can advance
//! time).

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

use super::{CounterStore, StoreUnavailable, WindowCounter};
use crate::key::CounterKey;

#[derive(Debug, Clone, Copy)]
struct CounterEntry {
    count: u64,
    expires_at: Instant,
}

/// In-memory counter store
#[derive(Debug, Clone, Default)]
pub struct InMemoryCounterStore {
    counters: Arc<RwLock<HashMap<CounterKey, CounterEntry>>>,
}

impl InMemoryCounterStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) counters, for diagnostics
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let counters = self.counters.read().await;
        counters.values().filter(|e| e.expires_at > now).count()
    }

    /// Whether the store holds no live counters
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop all counters
    pub async fn clear(&self) {
        self.counters.write().await.clear();
    }
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    async fn increment_and_expire(
        &self,
        key: &CounterKey,
        window: Duration,
    ) -> Result<WindowCounter, StoreUnavailable> {
        let now = Instant::now();
        let mut counters = self.counters.write().await;

        // An expired entry is one the store should already have deleted.
        // Discard all of them while the write lock is held, so the map does
        // not accumulate dead counters for tenants that stop sending.
        counters.retain(|_, entry| entry.expires_at > now);

        let entry = counters.entry(key.clone()).or_insert(CounterEntry {
            count: 0,
            expires_at: now + window,
        });

        entry.count += 1;

        Ok(WindowCounter {
            count: entry.count,
            ttl: entry.expires_at.saturating_duration_since(now),
        })
    }

    async fn peek(&self, key: &CounterKey) -> Result<WindowCounter, StoreUnavailable> {
        let now = Instant::now();
        let counters = self.counters.read().await;

        Ok(match counters.get(key) {
            Some(entry) if entry.expires_at > now => WindowCounter {
                count: entry.count,
                ttl: entry.expires_at.saturating_duration_since(now),
            },
            _ => WindowCounter::absent(),
        })
    }

    async fn reset(&self, key: &CounterKey) -> Result<(), StoreUnavailable> {
        self.counters.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(window: &str, tenant: &str) -> CounterKey {
        CounterKey::new("quota", window, tenant).unwrap()
    }

    #[tokio::test]
    async fn test_first_increment_creates_with_ttl() {
        let store = InMemoryCounterStore::new();
        let counter = store
            .increment_and_expire(&key("burst", "tenant-a"), Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(counter.count, 1);
        assert!(counter.ttl > Duration::ZERO);
        assert!(counter.ttl <= Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_subsequent_increments_keep_ttl() {
        let store = InMemoryCounterStore::new();
        let k = key("burst", "tenant-a");

        let first = store
            .increment_and_expire(&k, Duration::from_secs(60))
            .await
            .unwrap();
        let second = store
            .increment_and_expire(&k, Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(second.count, 2);
        assert!(second.ttl <= first.ttl);
    }

    #[tokio::test]
    async fn test_peek_never_mutates() {
        let store = InMemoryCounterStore::new();
        let k = key("burst", "tenant-a");

        assert_eq!(store.peek(&k).await.unwrap(), WindowCounter::absent());

        store
            .increment_and_expire(&k, Duration::from_secs(60))
            .await
            .unwrap();

        let a = store.peek(&k).await.unwrap();
        let b = store.peek(&k).await.unwrap();
        assert_eq!(a.count, 1);
        assert_eq!(b.count, 1);
    }

    #[tokio::test]
    async fn test_reset_is_idempotent() {
        let store = InMemoryCounterStore::new();
        let k = key("burst", "tenant-a");

        store
            .increment_and_expire(&k, Duration::from_secs(60))
            .await
            .unwrap();
        store.reset(&k).await.unwrap();
        store.reset(&k).await.unwrap();

        assert_eq!(store.peek(&k).await.unwrap(), WindowCounter::absent());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_counter_reads_as_absent() {
        let store = InMemoryCounterStore::new();
        let k = key("burst", "tenant-a");

        store
            .increment_and_expire(&k, Duration::from_secs(60))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(61)).await;

        assert_eq!(store.peek(&k).await.unwrap(), WindowCounter::absent());
        assert!(store.is_empty().await);

        // The next increment starts a fresh window.
        let counter = store
            .increment_and_expire(&k, Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(counter.count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_increment_discards_expired_entries() {
        let store = InMemoryCounterStore::new();

        store
            .increment_and_expire(&key("burst", "tenant-a"), Duration::from_secs(60))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(61)).await;

        // Touching a different key is enough to evict the dead entry.
        store
            .increment_and_expire(&key("burst", "tenant-b"), Duration::from_secs(60))
            .await
            .unwrap();

        let counters = store.counters.read().await;
        assert_eq!(counters.len(), 1);
        assert!(counters.contains_key(&key("burst", "tenant-b")));
    }

    #[tokio::test]
    async fn test_counters_are_isolated_per_key() {
        let store = InMemoryCounterStore::new();

        store
            .increment_and_expire(&key("burst", "tenant-a"), Duration::from_secs(60))
            .await
            .unwrap();
        let other = store
            .increment_and_expire(&key("burst", "tenant-b"), Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(other.count, 1);
    }
}
