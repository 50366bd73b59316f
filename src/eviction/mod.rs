//! Two-tier eviction cache.
//!
//! Eviction (recency pressure) is decoupled from destruction (grace timer):
//! a handle pushed out of the recency tracker only becomes eligible for
//! destruction after sitting in the grace queue for the configured period.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Eviction Module                           │
//! ├──────────────────────────────────────────────────────────────┤
//! │  recency.rs  - BoundedRecencyTracker                         │
//! │  └─ touch() returns the evicted handle, if any               │
//! │  └─ contains() refreshes recency like a touch                │
//! ├──────────────────────────────────────────────────────────────┤
//! │  grace.rs    - GracePeriodQueue                              │
//! │  └─ enqueue() stamps evicted handles                         │
//! │  └─ sweep_expired(now) drains handles past the grace period  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Neither structure knows about the other; the coordinator moves evicted
//! handles from one to the other.

pub mod grace;
pub mod recency;

pub use grace::GracePeriodQueue;
pub use recency::BoundedRecencyTracker;
