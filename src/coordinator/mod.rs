// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Eviction coordinator.
//!
//! The [`EvictionCoordinator`] owns every piece of mutable reaper state:
//! - the recency tracker (who was used recently)
//! - the grace queue (who was evicted, and when)
//! - the exclusion set (who the user pinned)
//!
//! It consumes lifecycle events, consults the host for existence and
//! protection, and turns expired grace entries into destroy commands.
//!
//! # Handle lifecycle
//!
//! ```text
//! Untracked → Active → PendingRemoval → Removed
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use lru_reaper::{EvictionCoordinator, InMemoryHost, LifecycleEvent, HandleId, ReaperConfig};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let host = Arc::new(InMemoryHost::new());
//! let mut coordinator = EvictionCoordinator::new(ReaperConfig::default(), host.clone()).unwrap();
//!
//! host.open(HandleId::new(1));
//! coordinator.handle_event(LifecycleEvent::Created(HandleId::new(1))).await;
//! coordinator.tick().await;
//! # }
//! ```

mod events;
mod lifecycle;
mod sweep;
mod types;

pub use lifecycle::{Command, CoordinatorGone, CoordinatorHandle};
pub use types::{
    CoordinatorSnapshot, DestroyOutcome, HandleState, LifecycleEvent, SkipReason, SweepReport,
    Transition,
};

use std::collections::HashSet;
use std::sync::Arc;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::{ConfigError, ReaperConfig};
use crate::eviction::{BoundedRecencyTracker, GracePeriodQueue};
use crate::handle::HandleId;
use crate::host::ResourceHost;
use crate::resilience::retry::RetryConfig;

/// Owner of the recency tracker, grace queue and exclusion set.
///
/// Constructed once from config. All mutation goes through `&mut self`, so
/// operations are applied one at a time in arrival order.
pub struct EvictionCoordinator {
    pub(super) config: ReaperConfig,

    /// The resource manager being reaped
    pub(super) host: Arc<dyn ResourceHost>,

    /// Recently used handles
    pub(super) tracker: BoundedRecencyTracker,

    /// Evicted handles waiting out the grace period
    pub(super) grace: GracePeriodQueue,

    /// Handles the user pinned
    pub(super) exclusions: HashSet<HandleId>,

    /// Destroy retry policy
    pub(super) destroy_retry: RetryConfig,

    /// Interrupts retry delays of in-flight destroys on shutdown
    pub(super) cancel: CancellationToken,

    /// Destroy commands spawned by the run loop
    pub(super) in_flight: JoinSet<(HandleId, DestroyOutcome)>,

    /// Handles whose spawned destroy has not settled yet
    pub(super) destroying: HashSet<HandleId>,
}

impl EvictionCoordinator {
    /// Create a coordinator. Fails if `config` does not validate.
    pub fn new(config: ReaperConfig, host: Arc<dyn ResourceHost>) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self {
            tracker: BoundedRecencyTracker::new(config.capacity),
            grace: GracePeriodQueue::new(config.grace_period()),
            exclusions: HashSet::new(),
            destroy_retry: config.destroy_retry(),
            cancel: CancellationToken::new(),
            in_flight: JoinSet::new(),
            destroying: HashSet::new(),
            host,
            config,
        })
    }

    #[must_use]
    pub fn config(&self) -> &ReaperConfig {
        &self.config
    }

    /// Current state of `id`. Never reorders the tracker.
    #[must_use]
    pub fn state(&self, id: HandleId) -> HandleState {
        if self.exclusions.contains(&id) {
            HandleState::Excluded
        } else if self.tracker.peek(id) {
            HandleState::Active
        } else if self.grace.contains(id) {
            HandleState::PendingRemoval
        } else {
            HandleState::Untracked
        }
    }

    #[must_use]
    pub fn is_excluded(&self, id: HandleId) -> bool {
        self.exclusions.contains(&id)
    }

    #[must_use]
    pub fn snapshot(&self) -> CoordinatorSnapshot {
        let mut excluded: Vec<_> = self.exclusions.iter().copied().collect();
        excluded.sort_unstable();

        CoordinatorSnapshot {
            tracked: self.tracker.snapshot(),
            pending: self.grace.pending(),
            excluded,
            in_flight: self.in_flight.len(),
        }
    }

    /// Drop `id` from the tracker and the grace queue. Exclusion is untouched.
    pub(super) fn untrack(&mut self, id: HandleId, reason: &'static str) {
        let was_tracked = self.tracker.remove(id);
        let was_pending = self.grace.remove(id);
        if was_pending {
            crate::metrics::record_grace_cancelled(reason);
        }
        if was_tracked || was_pending {
            debug!(id = %id, reason, "Handle untracked");
        }
    }

    pub(super) fn publish_sizes(&self) {
        crate::metrics::set_structure_sizes(
            self.tracker.len(),
            self.grace.len(),
            self.exclusions.len(),
        );
    }
}
