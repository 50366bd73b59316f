//! # LRU Reaper
//!
//! Least-recently-used reclamation of host handles (tabs, sessions,
//! connections), with a grace period between eviction and destruction.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Lifecycle events                        │
//! │  • Created / Activated / Removed from the host             │
//! │  • Manual exclusion toggle for the active handle           │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 BoundedRecencyTracker                       │
//! │  • At most `capacity` recently used handles                │
//! │  • Overflow evicts the least recently used                 │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                       (eviction)
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   GracePeriodQueue                          │
//! │  • Evicted handles wait out `grace_period`                 │
//! │  • Reactivation cancels the pending removal                │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                   (periodic sweep, re-validated)
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     ResourceHost::destroy                   │
//! │  • Bounded retries, cut short on shutdown                  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use lru_reaper::{EvictionCoordinator, HandleId, InMemoryHost, ReaperConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ReaperConfig::from_json(r#"{ "maxTabs": "3", "grace_period_ms": 60000 }"#)
//!         .expect("valid config");
//!
//!     let host = Arc::new(InMemoryHost::new());
//!     let coordinator = EvictionCoordinator::new(config, host.clone()).expect("valid config");
//!
//!     let shutdown = CancellationToken::new();
//!     let (handle, task) = coordinator.spawn(shutdown.clone());
//!
//!     for raw in 1..=5 {
//!         host.open(HandleId::new(raw));
//!         handle.activated(HandleId::new(raw)).await.unwrap();
//!     }
//!     println!("{:?}", handle.snapshot().await.unwrap());
//!
//!     shutdown.cancel();
//!     task.await.unwrap();
//! }
//! ```
//!
//! ## Modules
//!
//! - [`coordinator`]: The [`EvictionCoordinator`] and its run loop
//! - [`eviction`]: Recency tracker and grace queue
//! - [`host`]: The [`ResourceHost`] seam and an in-memory host
//! - [`resilience`]: Bounded retry for destroy commands
//! - [`config`]: [`ReaperConfig`]
//! - [`metrics`]: Counters, gauges and histograms

pub mod config;
pub mod coordinator;
pub mod eviction;
pub mod handle;
pub mod host;
pub mod metrics;
pub mod resilience;

pub use config::{ConfigError, ReaperConfig};
pub use coordinator::{
    Command, CoordinatorGone, CoordinatorHandle, CoordinatorSnapshot, DestroyOutcome,
    EvictionCoordinator, HandleState, LifecycleEvent, SkipReason, SweepReport, Transition,
};
pub use eviction::{BoundedRecencyTracker, GracePeriodQueue};
pub use handle::HandleId;
pub use host::{HostError, InMemoryHost, ResourceHost};
pub use metrics::LatencyTimer;
pub use resilience::retry::{RetryConfig, RetryError};
