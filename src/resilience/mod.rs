//! Resilience helpers for talking to the host.

pub mod retry;
