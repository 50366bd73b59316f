//! Grace-queue sweeps and destroy commands.

use std::sync::Arc;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::handle::HandleId;
use crate::host::{HostError, ResourceHost};
use crate::resilience::retry::{retry, RetryConfig, RetryError};

use super::{DestroyOutcome, EvictionCoordinator, SkipReason, SweepReport};

impl EvictionCoordinator {
    /// Drain grace entries expired at `now`, without destroying anything.
    pub fn collect_expired(&mut self, now: Instant) -> Vec<HandleId> {
        let expired = self.grace.sweep_expired(now);
        crate::metrics::record_sweep(expired.len());
        if !expired.is_empty() {
            debug!(count = expired.len(), pending = self.grace.len(), "Grace period elapsed");
        }
        self.publish_sizes();
        expired
    }

    /// Sweep at `now` and destroy every expired handle, awaiting each
    /// destroy (retries included) before returning.
    #[tracing::instrument(skip(self))]
    pub async fn sweep_at(&mut self, now: Instant) -> SweepReport {
        let start = std::time::Instant::now();
        let expired = self.collect_expired(now);
        let mut report = SweepReport::default();

        for &id in &expired {
            let outcome = destroy_handle(
                self.host.clone(),
                id,
                self.destroy_retry.clone(),
                self.cancel.clone(),
            )
            .await;
            report.record(id, &outcome);
        }
        report.expired = expired;

        crate::metrics::record_sweep_duration(start.elapsed());
        report
    }

    /// One manual maintenance pass at the current time.
    pub async fn tick(&mut self) -> SweepReport {
        self.sweep_at(Instant::now()).await
    }

    /// Sweep at `now` and hand each destroy to a background task so the
    /// event stream keeps flowing during retries.
    pub(super) fn spawn_sweep(&mut self, now: Instant) {
        for id in self.collect_expired(now) {
            let host = self.host.clone();
            let policy = self.destroy_retry.clone();
            let cancel = self.cancel.clone();
            self.destroying.insert(id);
            self.in_flight.spawn(async move {
                (id, destroy_handle(host, id, policy, cancel).await)
            });
        }
        crate::metrics::set_in_flight_destroys(self.in_flight.len());
    }
}

/// Issue one destroy command, re-validating eligibility first.
///
/// Once this starts the handle is out of every structure; nothing the
/// coordinator sees later can cancel it, only `cancel` (shutdown) can cut
/// the retry delays short.
pub(super) async fn destroy_handle(
    host: Arc<dyn ResourceHost>,
    id: HandleId,
    policy: RetryConfig,
    cancel: CancellationToken,
) -> DestroyOutcome {
    // Unevaluable existence counts as absent: never destroy blind.
    match host.exists(id).await {
        Ok(true) => {}
        Ok(false) => {
            debug!(id = %id, "Expired handle already gone");
            return finish(id, DestroyOutcome::Skipped(SkipReason::Gone));
        }
        Err(e) => {
            warn!(id = %id, error = %e, "Existence check failed, skipping destroy");
            crate::metrics::record_host_error("exists");
            return finish(id, DestroyOutcome::Skipped(SkipReason::Gone));
        }
    }

    match host.is_protected(id).await {
        Ok(false) => {}
        Ok(true) => {
            info!(id = %id, "Expired handle is protected, not destroying");
            return finish(id, DestroyOutcome::Skipped(SkipReason::Protected));
        }
        Err(e) => {
            warn!(id = %id, error = %e, "Protection check failed, treating handle as unprotected");
            crate::metrics::record_host_error("is_protected");
        }
    }

    let _timer = crate::metrics::LatencyTimer::new("destroy");
    let mut attempts = 0;
    let result = retry("destroy", &policy, &cancel, || {
        attempts += 1;
        let host = host.clone();
        async move {
            match host.destroy(id).await {
                Ok(()) => Ok(true),
                // Closed underneath us; nothing left to do
                Err(HostError::NotFound) => Ok(false),
                Err(e) => Err(e),
            }
        }
    })
    .await;

    let outcome = match result {
        Ok(true) => DestroyOutcome::Destroyed { attempts },
        Ok(false) => DestroyOutcome::Skipped(SkipReason::Gone),
        Err(RetryError::Exhausted { attempts, last }) => DestroyOutcome::Exhausted { attempts, error: last },
        Err(RetryError::Cancelled { attempts, .. }) => DestroyOutcome::Cancelled { attempts },
    };
    finish(id, outcome)
}

fn finish(id: HandleId, outcome: DestroyOutcome) -> DestroyOutcome {
    match &outcome {
        DestroyOutcome::Destroyed { attempts } => {
            info!(id = %id, attempts, "Destroyed expired handle");
        }
        DestroyOutcome::Skipped(reason) => {
            debug!(id = %id, ?reason, "Destroy skipped");
        }
        DestroyOutcome::Exhausted { attempts, error } => {
            error!(id = %id, attempts, error = %error, "Giving up on destroying handle; dropping it");
        }
        DestroyOutcome::Cancelled { attempts } => {
            warn!(id = %id, attempts, "Destroy cancelled by shutdown");
        }
    }
    crate::metrics::record_destroy(outcome.label(), outcome.attempts());
    outcome
}
