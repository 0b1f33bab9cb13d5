//! Event store configuration
//!
//! Configuration comes from an optional TOML file and is then overridden by
//! `STREAMLOG_*` environment variables. Every field has a default, so an
//! empty file (or no file at all) is a valid configuration.
//!
//! ```toml
//! event_table = "events"
//! position_index = "active-position-index"
//! counter_table = "counters"
//! counter_name = "messages"
//! request_timeout_ms = 2000
//!
//! [retry]
//! max_retries = 50
//! base_delay_ms = 1
//! max_delay_ms = 50
//! ```

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Prefix of every environment override
pub const ENV_PREFIX: &str = "STREAMLOG_";

/// Backoff policy for the sequence allocator's compare-and-swap loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt before giving up
    pub max_retries: u32,
    /// Delay before the first retry, doubled on each subsequent retry
    pub base_delay_ms: u64,
    /// Upper bound on any single delay
    pub max_delay_ms: u64,
}

impl RetryConfig {
    /// Set the retry budget
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the initial backoff delay
    pub fn with_base_delay_ms(mut self, base_delay_ms: u64) -> Self {
        self.base_delay_ms = base_delay_ms;
        self
    }

    /// Set the backoff ceiling
    pub fn with_max_delay_ms(mut self, max_delay_ms: u64) -> Self {
        self.max_delay_ms = max_delay_ms;
        self
    }

    /// No backoff between retries
    pub fn no_delay(self) -> Self {
        self.with_base_delay_ms(0).with_max_delay_ms(0)
    }

    /// Delay before retry number `retry` (0-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 1u64.checked_shl(retry.min(32)).unwrap_or(u64::MAX);
        let ms = self.base_delay_ms.saturating_mul(factor).min(self.max_delay_ms);
        Duration::from_millis(ms)
    }

    /// Total attempts including the first
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 50,
            base_delay_ms: 1,
            max_delay_ms: 50,
        }
    }
}

/// Event store configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EventStoreConfig {
    /// Table holding event rows
    pub event_table: String,
    /// Sparse index over active rows ordered by global position
    pub position_index: String,
    /// Table holding sequence counters
    pub counter_table: String,
    /// Name of the global sequence counter
    pub counter_name: String,
    /// Per round-trip timeout in milliseconds
    pub request_timeout_ms: Option<u64>,
    /// Guard each append against a global position collision
    pub position_guard: bool,
    /// Allocator backoff
    pub retry: RetryConfig,
}

impl Default for EventStoreConfig {
    fn default() -> Self {
        Self {
            event_table: "events".to_string(),
            position_index: "active-position-index".to_string(),
            counter_table: "counters".to_string(),
            counter_name: "messages".to_string(),
            request_timeout_ms: None,
            position_guard: true,
            retry: RetryConfig::default(),
        }
    }
}

impl EventStoreConfig {
    /// Parse from a TOML document
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Parse from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    /// Load from an optional file, then apply environment overrides
    ///
    /// A path that does not exist is not an error; not every deployment
    /// ships a config file.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(p) if p.exists() => Self::from_file(p)?,
            _ => Self::default(),
        };
        config.with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Apply `STREAMLOG_*` overrides read through `lookup`
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));

        if let Some(v) = var("EVENT_TABLE") {
            self.event_table = v;
        }
        if let Some(v) = var("POSITION_INDEX") {
            self.position_index = v;
        }
        if let Some(v) = var("COUNTER_TABLE") {
            self.counter_table = v;
        }
        if let Some(v) = var("COUNTER_NAME") {
            self.counter_name = v;
        }
        if let Some(v) = var("REQUEST_TIMEOUT_MS") {
            self.request_timeout_ms = Some(parse_env("REQUEST_TIMEOUT_MS", &v)?);
        }
        if let Some(v) = var("POSITION_GUARD") {
            self.position_guard = parse_env("POSITION_GUARD", &v)?;
        }
        if let Some(v) = var("RETRY_MAX_RETRIES") {
            self.retry.max_retries = parse_env("RETRY_MAX_RETRIES", &v)?;
        }
        Ok(self)
    }

    /// Per round-trip timeout
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| Error::Config(format!("{}{}={:?}: {}", ENV_PREFIX, name, value, e)))
}
