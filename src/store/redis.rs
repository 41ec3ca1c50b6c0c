//! Redis-Backed Counter Store
//!
//! Distributed [`CounterStore`] backend. All service instances share one
//! Redis (or Redis-compatible) keyspace, so a quota decision is consistent
//! regardless of which instance handles the request.
//!
//! The increment/expire protocol runs as a single Lua script: one EVAL
//! round trip increments the counter and, when the counter was just created
//! (or has somehow lost its TTL), arms the expiry. Redis executes scripts
//! atomically, which closes the crash window a client-side INCR followed by
//! EXPIRE would leave open.
//!
//! Connections go through `redis::aio::ConnectionManager`, which multiplexes
//! one connection and reconnects on failure. Errors are never retried here;
//! they surface as [`StoreUnavailable`] and the controller applies its
//! outage policy.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, Script};
use std::time::Duration;

use super::{CounterStore, StoreUnavailable, WindowCounter};
use crate::key::CounterKey;

/// Increment the counter and arm its TTL in one atomic step.
///
/// `TTL < 0` covers both the freshly created key (`count == 1`, TTL not yet
/// set within this script) and a leaked counter that lost its expiry; either
/// way the window is (re)armed so no counter can block a tenant forever.
const INCREMENT_AND_EXPIRE: &str = r"
local count = redis.call('INCR', KEYS[1])
local ttl = redis.call('TTL', KEYS[1])
if ttl < 0 then
    redis.call('EXPIRE', KEYS[1], ARGV[1])
    ttl = tonumber(ARGV[1])
end
return {count, ttl}
";

/// Redis-backed counter store
#[derive(Clone)]
pub struct RedisCounterStore {
    manager: ConnectionManager,
    script: Script,
}

impl std::fmt::Debug for RedisCounterStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCounterStore").finish_non_exhaustive()
    }
}

impl RedisCounterStore {
    /// Connect to Redis.
    ///
    /// # Arguments
    /// * `url` - Redis connection URL (e.g., "redis://127.0.0.1/")
    pub async fn connect(url: &str) -> Result<Self, StoreUnavailable> {
        let client = Client::open(url).map_err(StoreUnavailable::new)?;
        let manager = ConnectionManager::new(client)
            .await
            .map_err(StoreUnavailable::new)?;

        Ok(Self::with_manager(manager))
    }

    /// Build a store on an existing connection manager
    pub fn with_manager(manager: ConnectionManager) -> Self {
        Self {
            manager,
            script: Script::new(INCREMENT_AND_EXPIRE),
        }
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn increment_and_expire(
        &self,
        key: &CounterKey,
        window: Duration,
    ) -> Result<WindowCounter, StoreUnavailable> {
        let mut conn = self.manager.clone();

        let (count, ttl): (u64, i64) = self
            .script
            .key(key.as_str())
            .arg(window.as_secs())
            .invoke_async(&mut conn)
            .await
            .map_err(StoreUnavailable::new)?;

        Ok(WindowCounter {
            count,
            ttl: Duration::from_secs(ttl.max(0) as u64),
        })
    }

    async fn peek(&self, key: &CounterKey) -> Result<WindowCounter, StoreUnavailable> {
        let mut conn = self.manager.clone();

        // MULTI/EXEC so count and TTL come from one consistent snapshot.
        let (count, ttl): (Option<u64>, i64) = redis::pipe()
            .atomic()
            .get(key.as_str())
            .ttl(key.as_str())
            .query_async(&mut conn)
            .await
            .map_err(StoreUnavailable::new)?;

        Ok(match count {
            Some(count) => WindowCounter {
                count,
                ttl: Duration::from_secs(ttl.max(0) as u64),
            },
            None => WindowCounter::absent(),
        })
    }

    async fn reset(&self, key: &CounterKey) -> Result<(), StoreUnavailable> {
        let mut conn = self.manager.clone();

        conn.del::<_, ()>(key.as_str())
            .await
            .map_err(StoreUnavailable::new)?;

        Ok(())
    }
}
