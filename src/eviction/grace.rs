// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

use crate::handle::HandleId;

#[derive(Debug, Clone, Copy)]
struct GraceEntry {
    enqueued_at: Instant,
    seq: u64,
}

/// Evicted handles waiting out their grace period.
///
/// Expiry is checked, not scheduled: nothing happens until
/// [`sweep_expired`](Self::sweep_expired) is called.
#[derive(Debug, Clone)]
pub struct GracePeriodQueue {
    grace_period: Duration,
    next_seq: u64,
    entries: HashMap<HandleId, GraceEntry>,
}

impl GracePeriodQueue {
    #[must_use]
    pub fn new(grace_period: Duration) -> Self {
        Self {
            grace_period,
            next_seq: 0,
            entries: HashMap::new(),
        }
    }

    #[must_use]
    pub fn grace_period(&self) -> Duration {
        self.grace_period
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stamp `id` with the current time, replacing any earlier entry.
    pub fn enqueue(&mut self, id: HandleId) {
        self.enqueue_at(id, Instant::now());
    }

    /// Stamp `id` with `now`. A re-enqueue never moves a timestamp backwards.
    pub fn enqueue_at(&mut self, id: HandleId, now: Instant) {
        let enqueued_at = match self.entries.get(&id) {
            Some(prev) if prev.enqueued_at > now => prev.enqueued_at,
            _ => now,
        };
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert(id, GraceEntry { enqueued_at, seq });
    }

    /// Remove and return every handle whose age at `now` has reached the
    /// grace period, oldest first.
    pub fn sweep_expired(&mut self, now: Instant) -> Vec<HandleId> {
        let mut expired: Vec<(HandleId, GraceEntry)> = self
            .entries
            .iter()
            .filter(|(_, entry)| now.saturating_duration_since(entry.enqueued_at) >= self.grace_period)
            .map(|(id, entry)| (*id, *entry))
            .collect();

        expired.sort_by_key(|(_, entry)| (entry.enqueued_at, entry.seq));
        for (id, _) in &expired {
            self.entries.remove(id);
        }
        expired.into_iter().map(|(id, _)| id).collect()
    }

    /// Cancel a pending entry.
    pub fn remove(&mut self, id: HandleId) -> bool {
        self.entries.remove(&id).is_some()
    }

    #[must_use]
    pub fn contains(&self, id: HandleId) -> bool {
        self.entries.contains_key(&id)
    }

    #[must_use]
    pub fn enqueued_at(&self, id: HandleId) -> Option<Instant> {
        self.entries.get(&id).map(|entry| entry.enqueued_at)
    }

    /// Pending handles in enqueue order.
    #[must_use]
    pub fn pending(&self) -> Vec<HandleId> {
        let mut pending: Vec<_> = self.entries.iter().collect();
        pending.sort_by_key(|(_, entry)| (entry.enqueued_at, entry.seq));
        pending.into_iter().map(|(id, _)| *id).collect()
    }
}
