use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};

use crate::handle::HandleId;
use super::traits::{HostError, ResourceHost};

#[derive(Debug, Clone, Copy, Default)]
struct ResourceInfo {
    protected: bool,
}

/// Simulated resource manager.
///
/// Behaves like a browser window: resources are opened, activated and
/// closed by the embedder, while the reaper may ask for them to be
/// destroyed. Failure knobs let tests make destroys fail a set number of
/// times, refuse outright, or take the whole host offline.
pub struct InMemoryHost {
    resources: DashMap<HandleId, ResourceInfo>,
    active: RwLock<Option<HandleId>>,
    destroyed: Mutex<Vec<HandleId>>,
    destroy_attempts: DashMap<HandleId, usize>,
    pending_failures: DashMap<HandleId, usize>,
    status_log: Mutex<Vec<(HandleId, bool)>>,
    total_destroy_calls: AtomicU64,
    refuse_destroys: AtomicBool,
    available: AtomicBool,
}

impl InMemoryHost {
    #[must_use]
    pub fn new() -> Self {
        Self {
            resources: DashMap::new(),
            active: RwLock::new(None),
            destroyed: Mutex::new(Vec::new()),
            destroy_attempts: DashMap::new(),
            pending_failures: DashMap::new(),
            status_log: Mutex::new(Vec::new()),
            total_destroy_calls: AtomicU64::new(0),
            refuse_destroys: AtomicBool::new(false),
            available: AtomicBool::new(true),
        }
    }

    /// Open a resource without making it active.
    pub fn open(&self, id: HandleId) {
        self.resources.insert(id, ResourceInfo::default());
    }

    /// Open a resource that must not be destroyed.
    pub fn open_protected(&self, id: HandleId) {
        self.resources.insert(id, ResourceInfo { protected: true });
    }

    /// Close a resource from outside the reaper.
    pub fn close(&self, id: HandleId) -> bool {
        let removed = self.resources.remove(&id).is_some();
        let mut active = self.active.write();
        if *active == Some(id) {
            *active = None;
        }
        removed
    }

    /// Make `id` the active resource. Ignored if it does not exist.
    pub fn activate(&self, id: HandleId) {
        if self.resources.contains_key(&id) {
            *self.active.write() = Some(id);
        }
    }

    pub fn deactivate(&self) {
        *self.active.write() = None;
    }

    pub fn set_protected(&self, id: HandleId, protected: bool) {
        if let Some(mut info) = self.resources.get_mut(&id) {
            info.protected = protected;
        }
    }

    /// Make the next `times` destroy calls for `id` fail.
    pub fn fail_destroys(&self, id: HandleId, times: usize) {
        self.pending_failures.insert(id, times);
    }

    /// Refuse every destroy call until switched back.
    pub fn refuse_destroys(&self, refuse: bool) {
        self.refuse_destroys.store(refuse, Ordering::SeqCst);
    }

    /// Take the host offline: every call fails with `Unavailable`.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    #[must_use]
    pub fn contains(&self, id: HandleId) -> bool {
        self.resources.contains_key(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Resources successfully destroyed, in order.
    #[must_use]
    pub fn destroyed(&self) -> Vec<HandleId> {
        self.destroyed.lock().clone()
    }

    /// Destroy calls made for `id`, failed ones included.
    #[must_use]
    pub fn destroy_attempts(&self, id: HandleId) -> usize {
        self.destroy_attempts.get(&id).map(|n| *n).unwrap_or(0)
    }

    #[must_use]
    pub fn total_destroy_calls(&self) -> u64 {
        self.total_destroy_calls.load(Ordering::SeqCst)
    }

    /// Every exclusion status shown, in order.
    #[must_use]
    pub fn status_log(&self) -> Vec<(HandleId, bool)> {
        self.status_log.lock().clone()
    }

    fn check_available(&self) -> Result<(), HostError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(HostError::Unavailable("host offline".into()))
        }
    }

    fn take_injected_failure(&self, id: HandleId) -> bool {
        match self.pending_failures.get_mut(&id) {
            Some(mut remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }
}

impl Default for InMemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResourceHost for InMemoryHost {
    async fn exists(&self, id: HandleId) -> Result<bool, HostError> {
        self.check_available()?;
        Ok(self.resources.contains_key(&id))
    }

    async fn is_protected(&self, id: HandleId) -> Result<bool, HostError> {
        self.check_available()?;
        Ok(self.resources.get(&id).map(|info| info.protected).unwrap_or(false))
    }

    async fn current_active(&self) -> Result<HandleId, HostError> {
        self.check_available()?;
        (*self.active.read()).ok_or(HostError::NotFound)
    }

    async fn destroy(&self, id: HandleId) -> Result<(), HostError> {
        self.total_destroy_calls.fetch_add(1, Ordering::SeqCst);
        *self.destroy_attempts.entry(id).or_insert(0) += 1;

        self.check_available()?;
        if self.refuse_destroys.load(Ordering::SeqCst) {
            return Err(HostError::Refused("destroys disabled".into()));
        }
        if self.take_injected_failure(id) {
            return Err(HostError::Refused("resource busy".into()));
        }
        if !self.close(id) {
            return Err(HostError::NotFound);
        }
        self.destroyed.lock().push(id);
        Ok(())
    }

    async fn show_exclusion(&self, id: HandleId, excluded: bool) -> Result<(), HostError> {
        self.check_available()?;
        self.status_log.lock().push((id, excluded));
        Ok(())
    }
}
