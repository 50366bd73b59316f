// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics instrumentation for the reaper.
//!
//! Uses the `metrics` crate for backend-agnostic metrics collection.
//! The embedding process is responsible for choosing the exporter.
//!
//! # Metric Naming Convention
//! - `lru_reaper_` prefix for all metrics
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Labels
//! - `kind`: created, activated, removed
//! - `reason`: why a grace entry was cancelled
//! - `outcome`: destroyed, skipped, exhausted, cancelled

use metrics::{counter, gauge, histogram};
use std::time::{Duration, Instant};

/// Record a lifecycle event entering the coordinator
pub fn record_event(kind: &str) {
    counter!(
        "lru_reaper_events_total",
        "kind" => kind.to_string()
    )
    .increment(1);
}

/// Record a handle pushed out of the recency tracker
pub fn record_eviction() {
    counter!("lru_reaper_evictions_total").increment(1);
}

/// Record a grace entry cancelled before expiry
pub fn record_grace_cancelled(reason: &str) {
    counter!(
        "lru_reaper_grace_cancelled_total",
        "reason" => reason.to_string()
    )
    .increment(1);
}

/// Record handles returned by a sweep
pub fn record_sweep(expired: usize) {
    counter!("lru_reaper_sweeps_total").increment(1);
    counter!("lru_reaper_expired_total").increment(expired as u64);
}

/// Record sweep duration (including awaited destroys)
pub fn record_sweep_duration(duration: Duration) {
    histogram!("lru_reaper_sweep_seconds").record(duration.as_secs_f64());
}

/// Record how a destroy command ended
pub fn record_destroy(outcome: &str, attempts: usize) {
    counter!(
        "lru_reaper_destroys_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);
    histogram!("lru_reaper_destroy_attempts").record(attempts as f64);
}

/// Record a host call that could not be evaluated
pub fn record_host_error(operation: &str) {
    counter!(
        "lru_reaper_host_errors_total",
        "operation" => operation.to_string()
    )
    .increment(1);
}

/// Record an exclusion toggle
pub fn record_exclusion_toggle(excluded: bool) {
    let direction = if excluded { "excluded" } else { "included" };
    counter!(
        "lru_reaper_exclusion_toggles_total",
        "direction" => direction
    )
    .increment(1);
}

/// Set structure sizes
pub fn set_structure_sizes(tracked: usize, pending: usize, excluded: usize) {
    gauge!("lru_reaper_tracked_handles").set(tracked as f64);
    gauge!("lru_reaper_pending_handles").set(pending as f64);
    gauge!("lru_reaper_excluded_handles").set(excluded as f64);
}

/// Set destroys currently in flight
pub fn set_in_flight_destroys(count: usize) {
    gauge!("lru_reaper_in_flight_destroys").set(count as f64);
}

/// Record host call latency
pub fn record_host_latency(operation: &str, duration: Duration) {
    histogram!(
        "lru_reaper_host_seconds",
        "operation" => operation.to_string()
    )
    .record(duration.as_secs_f64());
}

/// A timing guard that records host latency on drop
pub struct LatencyTimer {
    operation: &'static str,
    start: Instant,
}

impl LatencyTimer {
    /// Start a new latency timer
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            start: Instant::now(),
        }
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        record_host_latency(self.operation, self.start.elapsed());
    }
}
