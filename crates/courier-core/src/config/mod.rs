//! Configuration types for the Courier tool server.
//!
//! Configuration is loaded from a single YAML file (`courier.yaml` by default).
//! Every section and field has a default, so an absent file or an empty
//! document yields a usable configuration.
//!
//! # Sections
//!
//! - **store**: location of the SQLite file and the connection retry policy
//! - **slack**: messaging platform credential source and API endpoint
//! - **mcp**: identity advertised in the `initialize` handshake

pub mod mcp;
pub mod slack;
pub mod store;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub use mcp::McpConfig;
pub use slack::SlackConfig;
pub use store::{RetryConfig, StoreConfig};

/// Complete Courier configuration loaded from a file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CourierConfig {
    /// Relational store settings.
    #[serde(default)]
    pub store: StoreConfig,

    /// Messaging platform settings.
    #[serde(default)]
    pub slack: SlackConfig,

    /// Protocol server identity.
    #[serde(default)]
    pub mcp: McpConfig,
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl CourierConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML content.
    ///
    /// An empty document parses to the default configuration.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(ConfigError::from)
    }

    /// Load configuration from `path` if it exists, otherwise return defaults.
    ///
    /// The returned flag is `true` when the file was found.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<(Self, bool), ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Ok((Self::from_file(path)?, true))
        } else {
            Ok((Self::default(), false))
        }
    }

    /// Check values that deserialize fine but cannot be used.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.store.validate()?;
        self.slack.validate()?;
        Ok(())
    }
}
