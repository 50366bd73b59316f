// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use std::num::NonZeroUsize;

use lru::LruCache;

use crate::handle::HandleId;

/// Fixed-capacity set of handles ordered by recency of touch.
#[derive(Debug)]
pub struct BoundedRecencyTracker {
    lru: LruCache<HandleId, ()>,
}

impl BoundedRecencyTracker {
    /// Create a tracker holding at most `capacity` handles (minimum 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            lru: LruCache::new(capacity),
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.lru.cap().get()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lru.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lru.is_empty()
    }

    /// Mark `id` as most recently used.
    ///
    /// Returns the handle pushed out to make room, if any. Re-touching a
    /// resident handle never evicts.
    pub fn touch(&mut self, id: HandleId) -> Option<HandleId> {
        if self.lru.get(&id).is_some() {
            return None;
        }
        // Absent key: anything handed back is the LRU entry
        self.lru.push(id, ()).map(|(evicted, ())| evicted)
    }

    /// Membership test that also refreshes a resident `id` to newest.
    ///
    /// A membership check counts as use: after `contains(a)` returns `true`,
    /// `a` is the last candidate for eviction. Use [`peek`](Self::peek) to
    /// observe without reordering.
    pub fn contains(&mut self, id: HandleId) -> bool {
        self.lru.get(&id).is_some()
    }

    /// Membership test without side effects.
    #[must_use]
    pub fn peek(&self, id: HandleId) -> bool {
        self.lru.contains(&id)
    }

    /// Drop `id` if resident. Never counts as an eviction.
    pub fn remove(&mut self, id: HandleId) -> bool {
        self.lru.pop(&id).is_some()
    }

    /// Resident handles, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<HandleId> {
        self.lru.iter().rev().map(|(id, _)| *id).collect()
    }
}
