//! Lifecycle event handling and exclusion toggles.

use tracing::{debug, info, warn};

use crate::handle::HandleId;
use crate::host::HostError;

use super::{EvictionCoordinator, HandleState, LifecycleEvent, Transition};

/// Result of probing the host about one handle.
enum Presence {
    Present,
    /// The host says the resource is gone
    Gone,
    /// The host could not answer; treated as gone for tracking purposes
    Unknown,
}

impl EvictionCoordinator {
    /// Apply one lifecycle event, then refresh the exclusion status display.
    #[tracing::instrument(skip_all, fields(id = %event.id(), kind = event.kind()))]
    pub async fn handle_event(&mut self, event: LifecycleEvent) -> Transition {
        crate::metrics::record_event(event.kind());

        let transition = match event {
            LifecycleEvent::Created(id) | LifecycleEvent::Activated(id) => self.activate(id).await,
            LifecycleEvent::Removed(id) => self.forget(id),
        };

        self.publish_sizes();
        self.refresh_status().await;
        transition
    }

    /// Adopt handles that already exist at startup, oldest first.
    ///
    /// Each id goes through the same eligibility checks as an activation,
    /// so seeding more than `capacity` handles queues the oldest for removal.
    pub async fn seed<I>(&mut self, ids: I) -> Vec<Transition>
    where
        I: IntoIterator<Item = HandleId>,
    {
        let mut transitions = Vec::new();
        for id in ids {
            transitions.push(self.activate(id).await);
        }
        self.publish_sizes();
        info!(tracked = self.tracker.len(), pending = self.grace.len(), "Seeded existing handles");
        transitions
    }

    /// Flip exclusion of whatever handle the host reports as active.
    ///
    /// Returns the new membership, or `None` when there is no active handle
    /// (the toggle is silently skipped).
    pub async fn toggle_exclusion(&mut self) -> Option<bool> {
        let id = match self.host.current_active().await {
            Ok(id) => id,
            Err(HostError::NotFound) => {
                debug!("No active handle, exclusion toggle skipped");
                return None;
            }
            Err(e) => {
                debug!(error = %e, "Active handle unavailable, exclusion toggle skipped");
                crate::metrics::record_host_error("current_active");
                return None;
            }
        };
        Some(self.toggle_exclusion_for(id).await)
    }

    /// Flip exclusion of `id`. Returns `true` if it is now excluded.
    pub async fn toggle_exclusion_for(&mut self, id: HandleId) -> bool {
        let excluded = if self.exclusions.remove(&id) {
            info!(id = %id, "Handle no longer excluded");
            self.activate(id).await;
            false
        } else {
            info!(id = %id, "Handle excluded from eviction");
            self.exclusions.insert(id);
            self.untrack(id, "excluded");
            true
        };

        crate::metrics::record_exclusion_toggle(excluded);
        self.publish_sizes();
        self.refresh_status().await;
        excluded
    }

    /// Push the active handle's exclusion membership to the host UI.
    /// Silently does nothing when there is no active handle.
    pub async fn refresh_status(&self) {
        let id = match self.host.current_active().await {
            Ok(id) => id,
            Err(HostError::NotFound) => return,
            Err(e) => {
                debug!(error = %e, "Could not resolve active handle for status display");
                return;
            }
        };

        let excluded = self.exclusions.contains(&id);
        if let Err(e) = self.host.show_exclusion(id, excluded).await {
            debug!(id = %id, error = %e, "Failed to update exclusion status display");
        }
    }

    /// Created/activated: decide whether `id` is tracked, and touch it.
    pub(super) async fn activate(&mut self, id: HandleId) -> Transition {
        // A handle with a destroy in flight is never tracked again
        if self.destroying.contains(&id) {
            debug!(id = %id, "Destroy in flight, activation ignored");
            return Transition::to(id, HandleState::Untracked);
        }

        match self.check_presence(id).await {
            Presence::Present => {}
            Presence::Gone => return self.forget(id),
            Presence::Unknown => {
                self.untrack(id, "unknown");
                return Transition::to(id, HandleState::Untracked);
            }
        }

        if self.exclusions.contains(&id) {
            self.untrack(id, "excluded");
            return Transition::to(id, HandleState::Excluded);
        }

        if self.check_protected(id).await {
            self.untrack(id, "protected");
            return Transition::to(id, HandleState::Untracked);
        }

        // A handle used again during its grace period escapes destruction
        if self.grace.remove(id) {
            info!(id = %id, "Pending removal cancelled, handle active again");
            crate::metrics::record_grace_cancelled("reactivated");
        }

        let evicted = self.tracker.touch(id);
        if let Some(victim) = evicted {
            self.grace.enqueue(victim);
            crate::metrics::record_eviction();
            info!(
                id = %victim,
                grace_ms = self.config.grace_period().as_millis() as u64,
                "Handle evicted, pending removal"
            );
        }
        debug!(id = %id, tracked = self.tracker.len(), "Handle touched");

        Transition { id, state: HandleState::Active, evicted }
    }

    /// The resource is gone: purge it from every structure. Idempotent.
    pub(super) fn forget(&mut self, id: HandleId) -> Transition {
        self.untrack(id, "removed");
        if self.exclusions.remove(&id) {
            debug!(id = %id, "Dropped exclusion of removed handle");
        }
        Transition::to(id, HandleState::Removed)
    }

    async fn check_presence(&self, id: HandleId) -> Presence {
        let _timer = crate::metrics::LatencyTimer::new("exists");
        match self.host.exists(id).await {
            Ok(true) => Presence::Present,
            Ok(false) => Presence::Gone,
            Err(e) => {
                warn!(id = %id, error = %e, "Existence check failed, treating handle as absent");
                crate::metrics::record_host_error("exists");
                Presence::Unknown
            }
        }
    }

    /// Unevaluable protection counts as "not protected".
    async fn check_protected(&self, id: HandleId) -> bool {
        let _timer = crate::metrics::LatencyTimer::new("is_protected");
        match self.host.is_protected(id).await {
            Ok(protected) => protected,
            Err(e) => {
                warn!(id = %id, error = %e, "Protection check failed, treating handle as unprotected");
                crate::metrics::record_host_error("is_protected");
                false
            }
        }
    }
}
