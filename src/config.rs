//! Quota Configuration
//!
//! Process-wide configuration for the quota controller: default window
//! policies, per-tenant overrides, the counter key namespace, and the
//! behavior on counter store outages. Loaded once at startup (optionally
//! from environment variables) and immutable thereafter.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::QuotaError;
use crate::policy::{WindowPolicy, BURST_WINDOW, SUSTAINED_WINDOW};

/// Default burst window length (seconds)
pub const DEFAULT_BURST_WINDOW_SECS: u64 = 60;
/// Default burst window limit
pub const DEFAULT_BURST_MAX_COUNT: u64 = 20;
/// Default sustained window length (seconds)
pub const DEFAULT_SUSTAINED_WINDOW_SECS: u64 = 3600;
/// Default sustained window limit
pub const DEFAULT_SUSTAINED_MAX_COUNT: u64 = 500;
/// Default counter key namespace
pub const DEFAULT_KEY_NAMESPACE: &str = "quota";

/// Behavior when the counter store is unavailable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutagePolicy {
    /// Admit the request. A limiter outage must not become a full outage of
    /// the protected resource; traffic is admitted until the store recovers.
    FailOpen,

    /// Deny the request. Stricter posture for deployments where enforcement
    /// matters more than availability.
    FailClosed,
}

/// Quota controller configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuotaConfig {
    /// Namespace prefix for counter keys, isolating this controller's
    /// counters from unrelated data in a shared store
    pub namespace: String,

    /// Behavior when the counter store is unavailable
    pub outage_policy: OutagePolicy,

    /// Default policy per window name
    pub default_policies: HashMap<String, WindowPolicy>,

    /// Per-tenant policy overrides, keyed by tenant then window name
    pub tenant_overrides: HashMap<String, HashMap<String, WindowPolicy>>,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        let mut default_policies = HashMap::new();
        default_policies.insert(
            BURST_WINDOW.to_string(),
            WindowPolicy::new(DEFAULT_BURST_WINDOW_SECS, DEFAULT_BURST_MAX_COUNT),
        );
        default_policies.insert(
            SUSTAINED_WINDOW.to_string(),
            WindowPolicy::new(DEFAULT_SUSTAINED_WINDOW_SECS, DEFAULT_SUSTAINED_MAX_COUNT),
        );

        Self {
            namespace: DEFAULT_KEY_NAMESPACE.to_string(),
            outage_policy: OutagePolicy::FailOpen,
            default_policies,
            tenant_overrides: HashMap::new(),
        }
    }
}

impl QuotaConfig {
    /// Create configuration with built-in defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables, starting from defaults
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("QUOTAGUARD_KEY_NAMESPACE") {
            if !val.is_empty() {
                config.namespace = val;
            }
        }

        if let Ok(val) = std::env::var("QUOTAGUARD_OUTAGE_POLICY") {
            match val.as_str() {
                "fail_closed" => config.outage_policy = OutagePolicy::FailClosed,
                "fail_open" => config.outage_policy = OutagePolicy::FailOpen,
                _ => {}
            }
        }

        config.window_from_env(
            BURST_WINDOW,
            "QUOTAGUARD_BURST_WINDOW_SECS",
            "QUOTAGUARD_BURST_MAX_COUNT",
        );
        config.window_from_env(
            SUSTAINED_WINDOW,
            "QUOTAGUARD_SUSTAINED_WINDOW_SECS",
            "QUOTAGUARD_SUSTAINED_MAX_COUNT",
        );

        config
    }

    fn window_from_env(&mut self, window: &str, secs_var: &str, count_var: &str) {
        let mut policy = match self.default_policies.get(window) {
            Some(policy) => *policy,
            None => return,
        };

        if let Ok(val) = std::env::var(secs_var) {
            if let Ok(secs) = val.parse() {
                policy.window_secs = secs;
            }
        }

        if let Ok(val) = std::env::var(count_var) {
            if let Ok(count) = val.parse() {
                policy.max_count = count;
            }
        }

        self.default_policies.insert(window.to_string(), policy);
    }

    /// Add or replace a default policy for a window name
    pub fn with_default_policy(mut self, window: &str, policy: WindowPolicy) -> Self {
        self.default_policies.insert(window.to_string(), policy);
        self
    }

    /// Add or replace a per-tenant override for a window name
    pub fn with_tenant_override(mut self, tenant: &str, window: &str, policy: WindowPolicy) -> Self {
        self.tenant_overrides
            .entry(tenant.to_string())
            .or_default()
            .insert(window.to_string(), policy);
        self
    }

    /// Set the outage policy
    pub fn with_outage_policy(mut self, policy: OutagePolicy) -> Self {
        self.outage_policy = policy;
        self
    }

    /// Set the counter key namespace
    pub fn with_namespace(mut self, namespace: &str) -> Self {
        self.namespace = namespace.to_string();
        self
    }

    /// Resolve the effective policy for a tenant and window name.
    ///
    /// Tenant override if present, else the default for that window name.
    pub fn policy_for(&self, tenant: &str, window: &str) -> Result<WindowPolicy, QuotaError> {
        self.tenant_overrides
            .get(tenant)
            .and_then(|overrides| overrides.get(window))
            .or_else(|| self.default_policies.get(window))
            .copied()
            .ok_or_else(|| {
                QuotaError::InvalidConfiguration(format!(
                    "no policy configured for window {window:?}"
                ))
            })
    }

    /// Validate the configuration.
    ///
    /// Window names must be non-empty and colon-free: counter keys are
    /// `namespace:window:tenant`, and a colon inside a window name would let
    /// distinct window/tenant pairs resolve to the same counter.
    pub fn validate(&self) -> Result<(), QuotaError> {
        if self.namespace.is_empty() || self.namespace.contains(':') {
            return Err(QuotaError::InvalidConfiguration(format!(
                "invalid key namespace {:?}",
                self.namespace
            )));
        }

        let overrides = self
            .tenant_overrides
            .values()
            .flat_map(|windows| windows.iter());
        for (window, policy) in self.default_policies.iter().chain(overrides) {
            if window.is_empty() || window.contains(':') {
                return Err(QuotaError::InvalidConfiguration(format!(
                    "invalid window name {window:?}"
                )));
            }
            if !policy.is_valid() {
                return Err(QuotaError::InvalidConfiguration(format!(
                    "window {window:?} requires positive window_secs and max_count"
                )));
            }
        }

        Ok(())
    }
}
