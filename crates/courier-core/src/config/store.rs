//! Relational store configuration.
//!
//! The store is an embedded SQLite file reached through a local path. The
//! retry policy here is consumed by the connection provider, which opens a
//! fresh connection for every tool call.

use super::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the SQLite store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path to the SQLite database file. The file must already exist.
    #[serde(default = "default_path")]
    pub path: PathBuf,

    /// Per-attempt connect timeout in seconds. Also used as the busy timeout.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Connection retry policy.
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            connect_timeout_secs: default_connect_timeout(),
            retry: RetryConfig::default(),
        }
    }
}

impl StoreConfig {
    /// Per-attempt connect timeout.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.connect_timeout_secs == 0 {
            return Err(ConfigError::Config(
                "store.connect_timeout_secs must be greater than zero".to_string(),
            ));
        }
        self.retry.validate()
    }
}

/// Linear backoff retry policy for opening store connections.
///
/// Attempt `n` (1-based) that fails is followed by a sleep of
/// `base_delay_ms × n` before attempt `n + 1`. No sleep follows the last
/// attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Attempt ceiling, including the first attempt.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base delay between attempts in milliseconds.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

impl RetryConfig {
    /// Base delay as a `Duration`.
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::Config(
                "store.retry.max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_path() -> PathBuf {
    PathBuf::from("data/logistics.db")
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    500
}
