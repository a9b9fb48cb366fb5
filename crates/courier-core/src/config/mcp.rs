//! MCP server configuration.
//!
//! Identity and protocol version advertised in response to `initialize`.

use serde::{Deserialize, Serialize};

/// Configuration for the MCP server handshake.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpConfig {
    /// Server name reported in `serverInfo`.
    #[serde(default = "default_server_name")]
    pub server_name: String,

    /// Protocol version reported in the `initialize` result.
    #[serde(default = "default_protocol_version")]
    pub protocol_version: String,
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            server_name: default_server_name(),
            protocol_version: default_protocol_version(),
        }
    }
}

fn default_server_name() -> String {
    "courier-db".to_string()
}

fn default_protocol_version() -> String {
    "2024-11-05".to_string()
}
