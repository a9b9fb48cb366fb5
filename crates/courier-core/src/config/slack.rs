//! Messaging platform (Slack) configuration.
//!
//! The bot credential is resolved on every call and never cached, so a
//! rotated token takes effect on the next tool call without a restart.

use super::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the Slack Web API client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackConfig {
    /// Environment variable holding the bot token.
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// Literal bot token. Takes precedence over `token_env` when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Base URL of the Web API, without a trailing method name.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Request timeout in seconds for each outbound call.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Leading glyphs that mark bot progress chatter in a thread.
    /// Messages starting with any of these are dropped by `read_thread`.
    #[serde(default = "default_status_markers")]
    pub status_markers: Vec<String>,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            token_env: default_token_env(),
            token: None,
            api_base_url: default_api_base_url(),
            request_timeout_secs: default_request_timeout(),
            status_markers: default_status_markers(),
        }
    }
}

impl SlackConfig {
    /// Resolve the bot token: literal value first, then the environment.
    ///
    /// Empty values count as absent.
    pub fn resolve_token(&self) -> Option<String> {
        self.token
            .clone()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| {
                std::env::var(&self.token_env)
                    .ok()
                    .filter(|t| !t.trim().is_empty())
            })
    }

    /// Request timeout as a `Duration`.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.api_base_url.trim().is_empty() {
            return Err(ConfigError::Config(
                "slack.api_base_url must not be empty".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Config(
                "slack.request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_token_env() -> String {
    "SLACK_BOT_TOKEN".to_string()
}

fn default_api_base_url() -> String {
    "https://slack.com/api".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

fn default_status_markers() -> Vec<String> {
    ["⏳", "🔍", "🔄", "⚙️", "💭"]
        .into_iter()
        .map(String::from)
        .collect()
}
