//! Window Policy Types
//!
//! A [`WindowPolicy`] describes one rate window: its length in seconds and
//! the maximum permitted count within that length. Pure data; resolution of
//! which policy applies to a tenant lives in [`crate::config`].

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Conventional name for the short, high-sensitivity window
pub const BURST_WINDOW: &str = "burst";

/// Conventional name for the long, low-sensitivity window
pub const SUSTAINED_WINDOW: &str = "sustained";

/// A single rate window: length and maximum permitted count.
///
/// Invariant: `window_secs > 0` and `max_count > 0`, enforced by
/// [`QuotaConfig::validate`](crate::config::QuotaConfig::validate).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowPolicy {
    /// Window length in seconds
    pub window_secs: u64,

    /// Maximum permitted count within the window
    pub max_count: u64,
}

impl WindowPolicy {
    /// Create a new window policy
    pub fn new(window_secs: u64, max_count: u64) -> Self {
        Self {
            window_secs,
            max_count,
        }
    }

    /// Window length as a [`Duration`]
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    /// Check the policy invariants
    pub fn is_valid(&self) -> bool {
        self.window_secs > 0 && self.max_count > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_window_duration() {
        let policy = WindowPolicy::new(60, 20);
        assert_eq!(policy.window(), Duration::from_secs(60));
        assert_eq!(policy.max_count, 20);
    }

    #[test]
    fn test_policy_validity() {
        assert!(WindowPolicy::new(60, 20).is_valid());
        assert!(!WindowPolicy::new(0, 20).is_valid());
        assert!(!WindowPolicy::new(60, 0).is_valid());
    }

    #[test]
    fn test_policy_serialization() {
        let policy = WindowPolicy::new(3600, 500);
        let json = serde_json::to_string(&policy).unwrap();
        let parsed: WindowPolicy = serde_json::from_str(&json).unwrap();
        assert_eq!(policy, parsed);
    }
}
