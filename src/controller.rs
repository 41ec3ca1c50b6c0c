//! Quota Controller
//!
//! The core decision pipeline: given a tenant and one or more window names,
//! run the increment/expire protocol against the counter store and turn the
//! result into [`RateLimitDecision`]s. The controller holds no counter
//! state and no locks; correctness rests entirely on the store's atomic
//! increment-and-expire step, so the controller is freely restartable and
//! any number of instances may run concurrently.

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, warn};

use crate::admin::{QuotaAdmin, WindowStatus};
use crate::config::{OutagePolicy, QuotaConfig};
use crate::error::QuotaError;
use crate::key::CounterKey;
use crate::policy::WindowPolicy;
use crate::store::{CounterStore, WindowCounter};

/// Decision for one rate window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitDecision {
    /// Whether the request may proceed against this window
    pub allowed: bool,

    /// Count now recorded in the window (0 when the store was unreachable)
    pub current_count: u64,

    /// Requests left before the window is exhausted
    pub remaining_count: u64,

    /// Seconds until the window resets
    pub reset_secs: u64,
}

impl RateLimitDecision {
    /// Evaluate a policy against the post-increment counter state
    fn evaluate(policy: WindowPolicy, counter: WindowCounter) -> Self {
        let ttl_secs = counter.ttl.as_secs();

        Self {
            allowed: counter.count <= policy.max_count,
            current_count: counter.count,
            remaining_count: policy.max_count.saturating_sub(counter.count),
            reset_secs: if ttl_secs > 0 {
                ttl_secs
            } else {
                policy.window_secs
            },
        }
    }

    /// Decision returned when the store is down and the outage policy admits
    fn fail_open(policy: WindowPolicy) -> Self {
        Self {
            allowed: true,
            current_count: 0,
            remaining_count: policy.max_count,
            reset_secs: policy.window_secs,
        }
    }

    /// Decision returned when the store is down and the outage policy denies
    fn fail_closed(policy: WindowPolicy) -> Self {
        Self {
            allowed: false,
            current_count: 0,
            remaining_count: 0,
            reset_secs: policy.window_secs,
        }
    }
}

/// Combined decision across a set of windows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckOutcome {
    /// Allowed only if every window allowed
    pub allowed: bool,

    /// Per-window decisions
    pub per_window: HashMap<String, RateLimitDecision>,
}

/// Multi-window, tenant-scoped quota controller
#[derive(Debug, Clone)]
pub struct QuotaController {
    store: Arc<dyn CounterStore>,
    config: Arc<QuotaConfig>,
    admin: QuotaAdmin,
}

impl QuotaController {
    /// Create a controller over a counter store.
    ///
    /// Validates the configuration up front; a controller never exists with
    /// policies that violate the window invariants.
    pub fn new(store: Arc<dyn CounterStore>, config: QuotaConfig) -> Result<Self, QuotaError> {
        config.validate()?;
        let config = Arc::new(config);

        Ok(Self {
            admin: QuotaAdmin::new(Arc::clone(&store), Arc::clone(&config)),
            store,
            config,
        })
    }

    /// The controller's configuration
    pub fn config(&self) -> &QuotaConfig {
        &self.config
    }

    /// The status/reset façade sharing this controller's store
    pub fn admin(&self) -> &QuotaAdmin {
        &self.admin
    }

    /// Check one window for a tenant, consuming one unit of quota.
    ///
    /// Quota is charged on every attempt, allowed or not; a caller cannot
    /// probe its own limit without spending from it. Store outages never
    /// surface as errors here; the configured [`OutagePolicy`] decides the
    /// outcome and an error event is emitted for operators.
    pub async fn check(
        &self,
        tenant: &str,
        window: &str,
    ) -> Result<RateLimitDecision, QuotaError> {
        let policy = self.config.policy_for(tenant, window)?;
        let key = CounterKey::new(&self.config.namespace, window, tenant)?;

        Ok(self.charge_window(tenant, window, policy, &key).await)
    }

    /// Check several windows concurrently, consuming one unit from each.
    ///
    /// Every window is always checked and always charged, even when another
    /// window has already failed; otherwise a tenant could preserve
    /// sustained-window quota by deliberately tripping the burst window.
    /// The aggregate is the logical AND of the per-window decisions.
    ///
    /// Configuration and tenant errors surface before anything is charged.
    pub async fn check_all(
        &self,
        tenant: &str,
        windows: &[&str],
    ) -> Result<CheckOutcome, QuotaError> {
        let mut resolved = Vec::with_capacity(windows.len());
        for window in windows {
            let policy = self.config.policy_for(tenant, window)?;
            let key = CounterKey::new(&self.config.namespace, window, tenant)?;
            resolved.push((*window, policy, key));
        }

        let decisions = join_all(
            resolved
                .iter()
                .map(|(window, policy, key)| self.charge_window(tenant, window, *policy, key)),
        )
        .await;

        let mut per_window = HashMap::with_capacity(decisions.len());
        let mut allowed = true;
        for ((window, _, _), decision) in resolved.iter().zip(decisions) {
            allowed &= decision.allowed;
            per_window.insert((*window).to_string(), decision);
        }

        Ok(CheckOutcome { allowed, per_window })
    }

    /// Report remaining quota without consuming any.
    ///
    /// See [`QuotaAdmin::status`].
    pub async fn status(
        &self,
        tenant: &str,
        windows: &[&str],
    ) -> Result<HashMap<String, WindowStatus>, QuotaError> {
        self.admin.status(tenant, windows).await
    }

    /// Administratively reset a tenant's windows.
    ///
    /// See [`QuotaAdmin::reset`].
    pub async fn reset(&self, tenant: &str, windows: &[&str]) -> Result<(), QuotaError> {
        self.admin.reset(tenant, windows).await
    }

    /// Run the increment/expire protocol for one window and classify the
    /// result. Infallible: store outages resolve via the outage policy.
    async fn charge_window(
        &self,
        tenant: &str,
        window: &str,
        policy: WindowPolicy,
        key: &CounterKey,
    ) -> RateLimitDecision {
        match self.store.increment_and_expire(key, policy.window()).await {
            Ok(counter) => {
                let decision = RateLimitDecision::evaluate(policy, counter);

                if !decision.allowed {
                    warn!(
                        tenant,
                        window,
                        count = decision.current_count,
                        max = policy.max_count,
                        reset_secs = decision.reset_secs,
                        "quota window exceeded"
                    );
                }

                decision
            }
            Err(e) => {
                error!(
                    tenant,
                    window,
                    error = %e,
                    "counter store unavailable"
                );

                match self.config.outage_policy {
                    OutagePolicy::FailOpen => RateLimitDecision::fail_open(policy),
                    OutagePolicy::FailClosed => RateLimitDecision::fail_closed(policy),
                }
            }
        }
    }
}
