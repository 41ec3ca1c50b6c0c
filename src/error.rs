//! Quota Controller Error Types
//!
//! This module defines the errors surfaced by the quota controller and the
//! status/reset façade. Counter store connectivity failures carry their own
//! type ([`StoreUnavailable`](crate::store::StoreUnavailable)) because the
//! controller recovers from them locally; they only appear here when an
//! administrative operation surfaces them to the caller.

use crate::store::StoreUnavailable;

/// Error types for quota operations
#[derive(Debug, thiserror::Error)]
pub enum QuotaError {
    /// Empty or malformed tenant identifier. Refusing to build a counter key
    /// for an unidentified caller prevents all such callers from silently
    /// sharing one counter.
    #[error("Invalid tenant identifier: {0:?}")]
    InvalidTenant(String),

    /// A requested window has no resolvable policy, or configured values
    /// violate policy invariants. This is a programming error at the call
    /// site and is never swallowed.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The counter store could not be reached. Only surfaced by the
    /// status/reset façade; `check`/`check_all` recover via the configured
    /// outage policy instead.
    #[error(transparent)]
    Store(#[from] StoreUnavailable),
}
