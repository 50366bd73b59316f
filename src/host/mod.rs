//! The host resource manager seam.
//!
//! [`ResourceHost`] is everything the reaper needs from its environment:
//! existence and protection predicates, the currently active handle, the
//! destructive removal itself and a place to show exclusion status.
//! [`InMemoryHost`] is a simulated host for tests and demos.

pub mod memory;
pub mod traits;

pub use memory::InMemoryHost;
pub use traits::{HostError, ResourceHost};
