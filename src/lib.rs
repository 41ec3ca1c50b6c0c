//! Multi-Window Tenant Quota Controller
//!
//! This crate decides, for each incoming unit of work attributed to a
//! tenant, whether it may proceed against one or more independent rate
//! windows (e.g., a short "burst" window and a longer "sustained" window).
//! Counters live in a store shared across all service instances, so the
//! decision is consistent regardless of which instance handles the request.
//!
//! # Features
//!
//! - Fixed-window counters with store-enforced TTL expiry
//! - Atomic increment-and-expire in one store-side step (no leaked counters)
//! - Concurrent multi-window checks combined with logical AND
//! - Per-tenant policy overrides over process-wide defaults
//! - Fail-open (default) or fail-closed behavior on store outages
//! - Read-only status and administrative reset façade
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Quota Controller                        │
//! │     check(tenant, window)  /  check_all(tenant, windows)     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐  ┌──────────────┐  ┌───────────────────┐   │
//! │  │ QuotaConfig │  │ CounterKey   │  │ QuotaAdmin        │   │
//! │  │ (policies)  │  │ (identity)   │  │ (status / reset)  │   │
//! │  └─────────────┘  └──────────────┘  └───────────────────┘   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────┐    │
//! │  │    CounterStore (Redis-backed or in-memory)         │    │
//! │  └─────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use quotaguard::{InMemoryCounterStore, QuotaConfig, QuotaController, BURST_WINDOW};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), quotaguard::QuotaError> {
//! let store = Arc::new(InMemoryCounterStore::new());
//! let controller = QuotaController::new(store, QuotaConfig::default())?;
//!
//! let decision = controller.check("tenant-a", BURST_WINDOW).await?;
//! assert!(decision.allowed);
//! # Ok(())
//! # }
//! ```
//!
//! # Operator notes
//!
//! By default the controller **fails open**: when the counter store is
//! unreachable, requests are admitted and an error-level event is emitted.
//! A limiter outage must never become a full outage of the protected
//! resource; the trade-off is that a flapping store admits all traffic
//! until it recovers. Deployments that need strict enforcement can opt into
//! [`OutagePolicy::FailClosed`].

pub mod admin;
pub mod config;
pub mod controller;
pub mod error;
pub mod key;
pub mod policy;
pub mod store;

pub use admin::{QuotaAdmin, WindowStatus};
pub use config::{OutagePolicy, QuotaConfig};
pub use controller::{CheckOutcome, QuotaController, RateLimitDecision};
pub use error::QuotaError;
pub use key::CounterKey;
pub use policy::{WindowPolicy, BURST_WINDOW, SUSTAINED_WINDOW};
pub use store::{
    CounterStore, InMemoryCounterStore, RedisCounterStore, StoreUnavailable, WindowCounter,
};
