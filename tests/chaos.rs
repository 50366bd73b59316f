//! Chaos testing for the reaper.
//!
//! Exercises failure paths with:
//! 1. **FlakyHost wrapper** - precise error injection per host operation
//! 2. **Host outages** - every call failing while the host is offline
//! 3. **Shutdown mid-retry** - cancellation while destroys are backing off
//!
//! # Running Chaos Tests
//! ```bash
//! cargo test --test chaos -- --nocapture
//! ```

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use lru_reaper::{
    EvictionCoordinator, HandleId, HandleState, HostError, InMemoryHost, LifecycleEvent,
    ReaperConfig, ResourceHost,
};

// =============================================================================
// Flaky Host Wrapper - Precise Error Injection
// =============================================================================

/// Host operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Op {
    Exists,
    IsProtected,
    CurrentActive,
    Destroy,
    ShowExclusion,
}

/// Wraps an [`InMemoryHost`] and fails chosen operations.
struct FlakyHost {
    inner: Arc<InMemoryHost>,
    failing: Mutex<HashSet<Op>>,
}

impl FlakyHost {
    fn new(inner: Arc<InMemoryHost>) -> Self {
        Self {
            inner,
            failing: Mutex::new(HashSet::new()),
        }
    }

    fn fail(&self, op: Op) {
        self.failing.lock().insert(op);
    }

    fn heal(&self, op: Op) {
        self.failing.lock().remove(&op);
    }

    fn maybe_fail(&self, op: Op) -> Result<(), HostError> {
        if self.failing.lock().contains(&op) {
            Err(HostError::Unavailable(format!("{:?} injected failure", op)))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ResourceHost for FlakyHost {
    async fn exists(&self, id: HandleId) -> Result<bool, HostError> {
        self.maybe_fail(Op::Exists)?;
        self.inner.exists(id).await
    }

    async fn is_protected(&self, id: HandleId) -> Result<bool, HostError> {
        self.maybe_fail(Op::IsProtected)?;
        self.inner.is_protected(id).await
    }

    async fn current_active(&self) -> Result<HandleId, HostError> {
        self.maybe_fail(Op::CurrentActive)?;
        self.inner.current_active().await
    }

    async fn destroy(&self, id: HandleId) -> Result<(), HostError> {
        self.maybe_fail(Op::Destroy)?;
        self.inner.destroy(id).await
    }

    async fn show_exclusion(&self, id: HandleId, excluded: bool) -> Result<(), HostError> {
        self.maybe_fail(Op::ShowExclusion)?;
        self.inner.show_exclusion(id, excluded).await
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn h(raw: u64) -> HandleId {
    HandleId::new(raw)
}

fn chaos_config(capacity: usize) -> ReaperConfig {
    ReaperConfig {
        capacity,
        grace_period_ms: 1000,
        sweep_interval_ms: 100,
        destroy_max_attempts: 3,
        destroy_retry_delay_ms: 500,
        ..Default::default()
    }
}

fn setup(capacity: usize) -> (EvictionCoordinator, Arc<FlakyHost>, Arc<InMemoryHost>) {
    let inner = Arc::new(InMemoryHost::new());
    let flaky = Arc::new(FlakyHost::new(inner.clone()));
    let coordinator = EvictionCoordinator::new(chaos_config(capacity), flaky.clone()).unwrap();
    (coordinator, flaky, inner)
}

async fn open_and_activate(coordinator: &mut EvictionCoordinator, host: &InMemoryHost, raw: u64) {
    host.open(h(raw));
    host.activate(h(raw));
    coordinator.handle_event(LifecycleEvent::Activated(h(raw))).await;
}

// =============================================================================
// Destroy Failures
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_exhausted_destroy_is_dropped_not_requeued() {
    let (mut coordinator, flaky, inner) = setup(1);
    let t0 = Instant::now();
    open_and_activate(&mut coordinator, &inner, 1).await;
    open_and_activate(&mut coordinator, &inner, 2).await;

    flaky.fail(Op::Destroy);
    let report = coordinator.sweep_at(t0 + Duration::from_secs(2)).await;
    assert_eq!(report.failed, vec![h(1)]);
    assert_eq!(coordinator.state(h(1)), HandleState::Untracked);

    flaky.heal(Op::Destroy);
    let later = coordinator.sweep_at(t0 + Duration::from_secs(60)).await;
    assert!(later.expired.is_empty());
    assert!(inner.contains(h(1)), "exhausted handle is left alone");
}

#[tokio::test(start_paused = true)]
async fn test_refused_destroy_uses_every_attempt() {
    let (mut coordinator, _flaky, inner) = setup(1);
    let t0 = Instant::now();
    open_and_activate(&mut coordinator, &inner, 1).await;
    open_and_activate(&mut coordinator, &inner, 2).await;

    inner.refuse_destroys(true);
    let started = Instant::now();
    let report = coordinator.sweep_at(t0 + Duration::from_secs(2)).await;

    assert_eq!(report.failed, vec![h(1)]);
    assert_eq!(inner.destroy_attempts(h(1)), 3);
    // Two 500ms delays between three attempts
    assert!(started.elapsed() >= Duration::from_millis(1000));
}

#[tokio::test(start_paused = true)]
async fn test_events_flow_while_destroy_backs_off() {
    let (coordinator, _flaky, inner) = setup(1);
    inner.fail_destroys(h(1), 2);
    let (handle, task) = coordinator.spawn(CancellationToken::new());

    for raw in 1..=2 {
        inner.open(h(raw));
        handle.activated(h(raw)).await.unwrap();
    }
    // Grace elapses, first attempt fails, coordinator is in the retry delay
    tokio::time::sleep(Duration::from_millis(1150)).await;
    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.in_flight, 1);

    inner.open(h(3));
    handle.activated(h(3)).await.unwrap();
    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.tracked, vec![h(3)]);
    assert_eq!(snapshot.pending, vec![h(2)]);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(inner.destroy_attempts(h(1)), 3);
    assert!(!inner.contains(h(1)));

    drop(handle);
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_reactivation_during_destroy_retry_is_ignored() {
    let inner = Arc::new(InMemoryHost::new());
    let config = ReaperConfig {
        capacity: 1,
        grace_period_ms: 100,
        sweep_interval_ms: 50,
        destroy_retry_delay_ms: 1000,
        ..Default::default()
    };
    let coordinator = EvictionCoordinator::new(config, inner.clone()).unwrap();
    inner.fail_destroys(h(1), 1);
    let (handle, task) = coordinator.spawn(CancellationToken::new());

    for raw in 1..=2 {
        inner.open(h(raw));
        handle.activated(h(raw)).await.unwrap();
    }
    // First attempt on 1 has failed, the retry is waiting
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(inner.destroy_attempts(h(1)), 1);

    handle.activated(h(1)).await.unwrap();
    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.tracked, vec![h(2)]);
    assert!(snapshot.pending.is_empty());
    assert_eq!(snapshot.in_flight, 1);

    tokio::time::sleep(Duration::from_millis(1100)).await;
    let snapshot = handle.snapshot().await.unwrap();
    assert!(!snapshot.tracked.contains(&h(1)));
    assert_eq!(snapshot.tracked, vec![h(2)]);
    assert_eq!(snapshot.in_flight, 0);
    assert_eq!(inner.destroyed(), vec![h(1)]);
    assert!(inner.contains(h(2)));

    // Settled: a new resource under the same id is tracked again
    inner.open(h(1));
    handle.activated(h(1)).await.unwrap();
    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.tracked, vec![h(1)]);
    assert_eq!(snapshot.pending, vec![h(2)]);

    drop(handle);
    task.await.unwrap();
}

// =============================================================================
// Predicate Failures
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_existence_outage_untracks_but_keeps_exclusion() {
    let (mut coordinator, flaky, inner) = setup(2);
    open_and_activate(&mut coordinator, &inner, 1).await;
    coordinator.toggle_exclusion().await;
    open_and_activate(&mut coordinator, &inner, 2).await;

    flaky.fail(Op::Exists);
    let t1 = coordinator.handle_event(LifecycleEvent::Activated(h(1))).await;
    let t2 = coordinator.handle_event(LifecycleEvent::Activated(h(2))).await;

    assert_eq!(t1.state, HandleState::Untracked);
    assert_eq!(t2.state, HandleState::Untracked);
    assert_eq!(coordinator.state(h(1)), HandleState::Excluded);
    assert!(coordinator.snapshot().tracked.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_protection_outage_counts_as_unprotected() {
    let (mut coordinator, flaky, inner) = setup(2);
    flaky.fail(Op::IsProtected);
    inner.open_protected(h(1));
    let transition = coordinator.handle_event(LifecycleEvent::Created(h(1))).await;
    assert_eq!(transition.state, HandleState::Active);
}

#[tokio::test(start_paused = true)]
async fn test_existence_outage_at_sweep_skips_destroy() {
    let (mut coordinator, flaky, inner) = setup(1);
    let t0 = Instant::now();
    open_and_activate(&mut coordinator, &inner, 1).await;
    open_and_activate(&mut coordinator, &inner, 2).await;

    flaky.fail(Op::Exists);
    let report = coordinator.sweep_at(t0 + Duration::from_secs(2)).await;
    assert_eq!(report.skipped, vec![h(1)]);
    assert_eq!(inner.total_destroy_calls(), 0);
    assert!(inner.contains(h(1)));
}

#[tokio::test(start_paused = true)]
async fn test_status_display_failure_does_not_block_toggle() {
    let (mut coordinator, flaky, inner) = setup(2);
    open_and_activate(&mut coordinator, &inner, 1).await;

    flaky.fail(Op::ShowExclusion);
    assert_eq!(coordinator.toggle_exclusion().await, Some(true));
    assert!(coordinator.is_excluded(h(1)));
}

#[tokio::test(start_paused = true)]
async fn test_active_lookup_failure_skips_toggle() {
    let (mut coordinator, flaky, inner) = setup(2);
    open_and_activate(&mut coordinator, &inner, 1).await;

    flaky.fail(Op::CurrentActive);
    assert_eq!(coordinator.toggle_exclusion().await, None);
    assert!(!coordinator.is_excluded(h(1)));
    assert_eq!(coordinator.state(h(1)), HandleState::Active);
}

// =============================================================================
// Host Outage and Shutdown
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_host_offline_during_sweep_destroys_nothing() {
    let inner = Arc::new(InMemoryHost::new());
    let mut coordinator = EvictionCoordinator::new(chaos_config(1), inner.clone()).unwrap();
    let t0 = Instant::now();
    open_and_activate(&mut coordinator, &inner, 1).await;
    open_and_activate(&mut coordinator, &inner, 2).await;

    inner.set_available(false);
    let report = coordinator.sweep_at(t0 + Duration::from_secs(2)).await;
    assert_eq!(report.skipped, vec![h(1)]);

    inner.set_available(true);
    assert!(inner.contains(h(1)));
    assert!(inner.destroyed().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_cancels_destroy_backoff() {
    let (coordinator, flaky, inner) = setup(1);
    let config = coordinator.config().clone();
    flaky.fail(Op::Destroy);
    let shutdown = CancellationToken::new();
    let (handle, task) = coordinator.spawn(shutdown.clone());

    for raw in 1..=2 {
        inner.open(h(raw));
        handle.activated(h(raw)).await.unwrap();
    }
    tokio::time::sleep(Duration::from_millis(config.grace_period_ms + 150)).await;
    assert_eq!(handle.snapshot().await.unwrap().in_flight, 1);

    let started = Instant::now();
    shutdown.cancel();
    let coordinator = task.await.unwrap();

    assert!(started.elapsed() < Duration::from_millis(config.destroy_retry_delay_ms));
    assert_eq!(coordinator.snapshot().in_flight, 0);
    assert!(inner.contains(h(1)));
}
