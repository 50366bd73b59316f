//! Public types for the eviction coordinator.

use crate::handle::HandleId;
use crate::host::HostError;

/// Where a handle sits in the reclamation pipeline.
///
/// ```text
/// Untracked → Active → PendingRemoval → Removed
///               ↕
///            Excluded
/// ```
///
/// Any state falls back to `Untracked` once the resource is confirmed gone.
/// Protected handles are not tracked at all and report `Untracked`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    /// Not held by any structure
    Untracked,
    /// Resident in the recency tracker
    Active,
    /// Evicted, waiting out the grace period
    PendingRemoval,
    /// Manually excluded from eviction
    Excluded,
    /// Resource destroyed; terminal
    Removed,
}

impl std::fmt::Display for HandleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Untracked => write!(f, "Untracked"),
            Self::Active => write!(f, "Active"),
            Self::PendingRemoval => write!(f, "PendingRemoval"),
            Self::Excluded => write!(f, "Excluded"),
            Self::Removed => write!(f, "Removed"),
        }
    }
}

/// Lifecycle notifications from the host, in arrival order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    Created(HandleId),
    Activated(HandleId),
    Removed(HandleId),
}

impl LifecycleEvent {
    #[must_use]
    pub fn id(&self) -> HandleId {
        match self {
            Self::Created(id) | Self::Activated(id) | Self::Removed(id) => *id,
        }
    }

    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Created(_) => "created",
            Self::Activated(_) => "activated",
            Self::Removed(_) => "removed",
        }
    }
}

/// What handling one event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub id: HandleId,
    /// State of `id` after the event
    pub state: HandleState,
    /// Another handle pushed into the grace queue by this event
    pub evicted: Option<HandleId>,
}

impl Transition {
    pub(super) fn to(id: HandleId, state: HandleState) -> Self {
        Self { id, state, evicted: None }
    }
}

/// Why a destroy command was never sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The resource was already gone (or its existence could not be checked)
    Gone,
    /// The resource became protected during the grace period
    Protected,
}

/// How a destroy command ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestroyOutcome {
    Destroyed { attempts: usize },
    Skipped(SkipReason),
    /// Every attempt failed; the handle is dropped, not re-enqueued
    Exhausted { attempts: usize, error: HostError },
    /// Shutdown interrupted the retry delay
    Cancelled { attempts: usize },
}

impl DestroyOutcome {
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Destroyed { .. } => "destroyed",
            Self::Skipped(_) => "skipped",
            Self::Exhausted { .. } => "exhausted",
            Self::Cancelled { .. } => "cancelled",
        }
    }

    #[must_use]
    pub fn attempts(&self) -> usize {
        match self {
            Self::Destroyed { attempts }
            | Self::Exhausted { attempts, .. }
            | Self::Cancelled { attempts } => *attempts,
            Self::Skipped(_) => 0,
        }
    }
}

/// Result of an awaited sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Handles whose grace period had run out, oldest first
    pub expired: Vec<HandleId>,
    pub destroyed: Vec<HandleId>,
    pub skipped: Vec<HandleId>,
    pub failed: Vec<HandleId>,
}

impl SweepReport {
    pub(super) fn record(&mut self, id: HandleId, outcome: &DestroyOutcome) {
        match outcome {
            DestroyOutcome::Destroyed { .. } => self.destroyed.push(id),
            DestroyOutcome::Skipped(_) => self.skipped.push(id),
            DestroyOutcome::Exhausted { .. } | DestroyOutcome::Cancelled { .. } => self.failed.push(id),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.expired.is_empty()
    }
}

/// Point-in-time view of the coordinator's structures.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoordinatorSnapshot {
    /// Recency order, oldest first
    pub tracked: Vec<HandleId>,
    /// Grace queue, oldest first
    pub pending: Vec<HandleId>,
    /// Exclusion set, ascending
    pub excluded: Vec<HandleId>,
    /// Destroy commands issued but not yet settled
    pub in_flight: usize,
}
