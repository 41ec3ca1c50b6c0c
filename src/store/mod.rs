//! Counter Store Adapters
//!
//! A [`CounterStore`] is a thin, swappable interface over an atomic counter
//! backend. It owns counter storage and TTL enforcement and nothing else;
//! all quota logic lives in [`crate::controller`].
//!
//! The one non-negotiable property of an adapter is that
//! [`increment_and_expire`](CounterStore::increment_and_expire) sets the TTL
//! of a freshly created counter in the *same atomic step* as the creation.
//! Any two-step increment-then-expire sequence has a crash window that
//! leaves a counter with no expiry, permanently denying the tenant.
//!
//! Adapters never retry. Connectivity and timeout failures map to
//! [`StoreUnavailable`]; retry policy belongs to the caller.

pub mod memory;
pub mod redis;

use async_trait::async_trait;
use std::time::Duration;

use crate::key::CounterKey;

pub use self::memory::InMemoryCounterStore;
pub use self::redis::RedisCounterStore;

/// The counter store could not be reached or timed out
#[derive(Debug, thiserror::Error)]
#[error("Counter store unavailable: {source}")]
pub struct StoreUnavailable {
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
}

impl StoreUnavailable {
    /// Wrap an underlying backend error
    pub fn new(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

/// State of one window counter as reported by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowCounter {
    /// Current count (post-increment for `increment_and_expire`)
    pub count: u64,

    /// Remaining time until the store deletes the counter; zero when the
    /// counter is absent
    pub ttl: Duration,
}

impl WindowCounter {
    /// Counter state for a key with no prior activity
    pub fn absent() -> Self {
        Self {
            count: 0,
            ttl: Duration::ZERO,
        }
    }
}

/// Atomic counter backend shared across service instances
#[async_trait]
pub trait CounterStore: Send + Sync + std::fmt::Debug {
    /// Increment the counter by 1, creating it with `count = 1` and
    /// TTL = `window` if it did not exist. Creation and TTL arming happen in
    /// one atomic store-side step. Returns the post-increment count and the
    /// TTL now in effect.
    async fn increment_and_expire(
        &self,
        key: &CounterKey,
        window: Duration,
    ) -> Result<WindowCounter, StoreUnavailable>;

    /// Read the counter without mutating it. Absent counters read as
    /// `count = 0, ttl = 0`.
    async fn peek(&self, key: &CounterKey) -> Result<WindowCounter, StoreUnavailable>;

    /// Delete the counter unconditionally. Idempotent.
    async fn reset(&self, key: &CounterKey) -> Result<(), StoreUnavailable>;
}
