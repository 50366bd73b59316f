// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Configuration for the reaper.
//!
//! Read once at startup; changing it requires constructing a new
//! coordinator.
//!
//! # Example
//!
//! ```
//! use lru_reaper::ReaperConfig;
//!
//! // Minimal config (uses defaults)
//! let config = ReaperConfig::default();
//! assert_eq!(config.capacity, 15);
//!
//! // Option stores frequently hand back form strings
//! let config = ReaperConfig::from_json(r#"{"maxTabs": "4", "grace_period_ms": 1000}"#).unwrap();
//! assert_eq!(config.capacity, 4);
//! assert_eq!(config.grace_period_ms, 1000);
//! ```

use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Deserializer};
use thiserror::Error;

use crate::resilience::retry::RetryConfig;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("capacity must be at least 1")]
    ZeroCapacity,
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Configuration for the reaper.
///
/// All fields have defaults matching a typical browser profile.
#[derive(Debug, Clone, Deserialize)]
pub struct ReaperConfig {
    /// Max resident handles before LRU eviction kicks in (default: 15)
    #[serde(
        default = "default_capacity",
        alias = "maxTabs",
        deserialize_with = "number_or_string"
    )]
    pub capacity: usize,

    /// Time an evicted handle waits before it may be destroyed (default: 15 min)
    #[serde(default = "default_grace_period_ms", deserialize_with = "number_or_string")]
    pub grace_period_ms: u64,

    /// Grace period in whole minutes, as the options page stores it under
    /// `expiredAfter`. Overrides `grace_period_ms` when present.
    #[serde(
        default,
        alias = "expiredAfter",
        deserialize_with = "optional_number_or_string"
    )]
    pub grace_period_minutes: Option<u64>,

    /// Sweep cadence. Independent of the grace period; keep it well below it
    /// to bound destruction latency.
    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,

    /// Destroy attempts per handle before giving up
    #[serde(default = "default_destroy_max_attempts")]
    pub destroy_max_attempts: usize,

    /// Fixed delay between destroy attempts
    #[serde(default = "default_destroy_retry_delay_ms")]
    pub destroy_retry_delay_ms: u64,

    /// Command channel depth for the run loop
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

fn default_capacity() -> usize { 15 }
fn default_grace_period_ms() -> u64 { 15 * 60 * 1000 } // 15 minutes
fn default_sweep_interval_ms() -> u64 { 10_000 }
fn default_destroy_max_attempts() -> usize { 2 }
fn default_destroy_retry_delay_ms() -> u64 { 1000 }
fn default_event_buffer() -> usize { 256 }

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            grace_period_ms: default_grace_period_ms(),
            grace_period_minutes: None,
            sweep_interval_ms: default_sweep_interval_ms(),
            destroy_max_attempts: default_destroy_max_attempts(),
            destroy_retry_delay_ms: default_destroy_retry_delay_ms(),
            event_buffer: default_event_buffer(),
        }
    }
}

impl ReaperConfig {
    /// Parse and validate a JSON config document.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.destroy_max_attempts == 0 {
            return Err(ConfigError::Zero("destroy_max_attempts"));
        }
        if self.sweep_interval_ms == 0 {
            return Err(ConfigError::Zero("sweep_interval_ms"));
        }
        if self.event_buffer == 0 {
            return Err(ConfigError::Zero("event_buffer"));
        }
        Ok(())
    }

    #[must_use]
    pub fn grace_period(&self) -> Duration {
        match self.grace_period_minutes {
            Some(minutes) => Duration::from_secs(minutes.saturating_mul(60)),
            None => Duration::from_millis(self.grace_period_ms),
        }
    }

    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    /// Retry policy for destroy commands: fixed delay, bounded attempts.
    #[must_use]
    pub fn destroy_retry(&self) -> RetryConfig {
        RetryConfig::fixed(
            self.destroy_max_attempts,
            Duration::from_millis(self.destroy_retry_delay_ms),
        )
    }
}

/// Accepts `15` as well as `"15"`.
fn number_or_string<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + FromStr,
    T::Err: Display,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw<T> {
        Number(T),
        Text(String),
    }

    match Raw::<T>::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

fn optional_number_or_string<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + FromStr,
    T::Err: Display,
{
    number_or_string(deserializer).map(Some)
}
