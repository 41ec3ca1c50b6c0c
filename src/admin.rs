//! Status/Reset Façade
//!
//! Read-only quota inspection and administrative reset, built entirely on
//! the counter store adapter. The façade never increments anything, so it
//! can back operator dashboards and quota-reporting endpoints without
//! spending tenant quota.
//!
//! Unlike `check`/`check_all`, these operations surface
//! [`StoreUnavailable`](crate::store::StoreUnavailable) to the caller: they
//! are operator-facing, not in the request path of the protected resource,
//! so the outage policy does not apply. Resets can bypass limits and are
//! expected to be audited by the caller.

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::QuotaConfig;
use crate::error::QuotaError;
use crate::key::CounterKey;
use crate::store::CounterStore;

/// Read-only view of one window's quota for a tenant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowStatus {
    /// Count currently recorded in the window
    pub current_count: u64,

    /// Requests left before the window is exhausted
    pub remaining_count: u64,

    /// Seconds until the window resets; zero when no window is active
    pub reset_secs: u64,
}

/// Status/reset façade over the counter store
#[derive(Debug, Clone)]
pub struct QuotaAdmin {
    store: Arc<dyn CounterStore>,
    config: Arc<QuotaConfig>,
}

impl QuotaAdmin {
    /// Create a façade sharing a controller's store and configuration
    pub fn new(store: Arc<dyn CounterStore>, config: Arc<QuotaConfig>) -> Self {
        Self { store, config }
    }

    /// Report the named windows for a tenant without consuming quota
    pub async fn status(
        &self,
        tenant: &str,
        windows: &[&str],
    ) -> Result<HashMap<String, WindowStatus>, QuotaError> {
        let mut resolved = Vec::with_capacity(windows.len());
        for window in windows {
            let policy = self.config.policy_for(tenant, window)?;
            let key = CounterKey::new(&self.config.namespace, window, tenant)?;
            resolved.push((*window, policy, key));
        }

        let counters = join_all(resolved.iter().map(|(_, _, key)| self.store.peek(key))).await;

        let mut statuses = HashMap::with_capacity(windows.len());
        for ((window, policy, _), counter) in resolved.iter().zip(counters) {
            let counter = counter?;
            statuses.insert(
                (*window).to_string(),
                WindowStatus {
                    current_count: counter.count,
                    remaining_count: policy.max_count.saturating_sub(counter.count),
                    reset_secs: counter.ttl.as_secs(),
                },
            );
        }

        Ok(statuses)
    }

    /// Delete the named windows' counters for a tenant. Idempotent.
    pub async fn reset(&self, tenant: &str, windows: &[&str]) -> Result<(), QuotaError> {
        let mut keys = Vec::with_capacity(windows.len());
        for window in windows {
            keys.push(CounterKey::new(&self.config.namespace, window, tenant)?);
        }

        let results = join_all(keys.iter().map(|key| self.store.reset(key))).await;
        for result in results {
            result?;
        }

        Ok(())
    }
}
