// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Handle identifiers.
//!
//! A [`HandleId`] names one externally-managed resource (a browser tab, a
//! pooled connection, a worker). The reaper never looks inside it; it only
//! orders, queues and eventually asks the host to destroy it.
//!
//! ```
//! use lru_reaper::HandleId;
//!
//! let id = HandleId::new(42);
//! assert_eq!(id.get(), 42);
//! assert_eq!(id.to_string(), "#42");
//! ```

use serde::{Deserialize, Serialize};

/// Opaque positive integer identifying a tracked resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandleId(u64);

impl HandleId {
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for HandleId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl std::fmt::Display for HandleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}
