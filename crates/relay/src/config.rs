//! Relay configuration
//!
//! Read from the `[projections]` table of the event store's TOML file:
//!
//! ```toml
//! [projections]
//! queues = ["orders", "billing"]
//! batch_size = 100
//! ```
//!
//! `STREAMLOG_PROJECTIONS_QUEUES` (comma separated) replaces the queue list.

use crate::error::{RelayError, Result};
use serde::Deserialize;
use std::path::Path;
use streamlog_core::config::ENV_PREFIX;

/// Events per projector batch when not configured
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Change relay and projector settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Queue names every new event is published to
    pub queues: Vec<String>,
    /// Table whose changes are relayed
    pub event_table: String,
    /// Events per projector batch
    pub batch_size: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            queues: Vec::new(),
            event_table: "events".to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

#[derive(Deserialize, Default)]
struct File {
    #[serde(default)]
    projections: RelayConfig,
}

impl RelayConfig {
    /// Parse the `[projections]` table of a TOML document
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let file: File = toml::from_str(s).map_err(|e| RelayError::Config(e.to_string()))?;
        Ok(file.projections)
    }

    /// Load from an optional file, then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(p) if p.exists() => {
                let text = std::fs::read_to_string(p)
                    .map_err(|e| RelayError::Config(format!("{}: {}", p.display(), e)))?;
                Self::from_toml_str(&text)?
            }
            _ => Self::default(),
        };
        Ok(config.with_env_overrides(|key| std::env::var(key).ok()))
    }

    /// Apply `STREAMLOG_PROJECTIONS_*` overrides read through `lookup`
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(&format!("{}PROJECTIONS_QUEUES", ENV_PREFIX)) {
            self.queues = v
                .split(',')
                .map(str::trim)
                .filter(|q| !q.is_empty())
                .map(str::to_string)
                .collect();
        }
        self
    }
}
