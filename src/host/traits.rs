use async_trait::async_trait;
use thiserror::Error;

use crate::handle::HandleId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    /// The queried resource (or the active resource) does not exist.
    #[error("resource not found")]
    NotFound,
    /// The host could not be reached or could not evaluate the request.
    #[error("host unavailable: {0}")]
    Unavailable(String),
    /// The host declined the request, e.g. because the resource is busy.
    #[error("host refused: {0}")]
    Refused(String),
}

/// The resource manager the reaper acts on.
///
/// Everything here may suspend. Implementations must be cheap to share:
/// the coordinator holds one behind an `Arc` and hands clones to spawned
/// destroy tasks.
#[async_trait]
pub trait ResourceHost: Send + Sync {
    /// Whether the resource behind `id` still exists.
    async fn exists(&self, id: HandleId) -> Result<bool, HostError>;

    /// Whether `id` must not be destroyed right now (e.g. emitting audio).
    async fn is_protected(&self, id: HandleId) -> Result<bool, HostError>;

    /// The handle the user is looking at. [`HostError::NotFound`] if none.
    async fn current_active(&self) -> Result<HandleId, HostError>;

    /// Best-effort destructive removal. May fail transiently.
    async fn destroy(&self, id: HandleId) -> Result<(), HostError>;

    /// Reflect exclusion membership of the current handle in the UI.
    /// Default implementation has no UI.
    async fn show_exclusion(&self, _id: HandleId, _excluded: bool) -> Result<(), HostError> {
        Ok(())
    }
}
