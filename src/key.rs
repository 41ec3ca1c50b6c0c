//! Counter Keys
//!
//! A [`CounterKey`] is the deterministic identity of a tenant+window counter
//! in the shared store: `namespace:window:tenant`. The same tenant and
//! window always resolve to the same key; distinct pairs never collide
//! (window names are validated to be colon-free, so the encoding is
//! unambiguous).

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::QuotaError;

/// Identity of a tenant+window counter in the shared store
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct CounterKey(String);

impl CounterKey {
    /// Derive the key for `(namespace, window, tenant)`.
    ///
    /// Rejects empty or blank tenants: building a key for an unidentified
    /// caller would silently share one counter across all such callers.
    pub fn new(namespace: &str, window: &str, tenant: &str) -> Result<Self, QuotaError> {
        if tenant.trim().is_empty() {
            return Err(QuotaError::InvalidTenant(tenant.to_string()));
        }

        Ok(Self(format!("{namespace}:{window}:{tenant}")))
    }

    /// The key as stored in the backend
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CounterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
