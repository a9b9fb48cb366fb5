//! Error types for the MCP crate.

use crate::protocol::{INTERNAL_ERROR, INVALID_PARAMS, METHOD_NOT_FOUND};
use crate::slack::SlackError;
use crate::store::StoreError;
use thiserror::Error;

/// Errors that can occur while serving a request.
#[derive(Debug, Error)]
pub enum McpError {
    /// Unknown JSON-RPC method.
    #[error("Method not found: {0}")]
    MethodNotFound(String),

    /// Tool name absent from the catalogue.
    #[error("Unknown tool: {name}")]
    ToolNotFound { name: String },

    /// Malformed `params` for a method.
    #[error("Invalid params: {0}")]
    InvalidParams(String),

    /// Arguments failed the tool's input schema.
    #[error("Invalid arguments for tool {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },

    /// The built-in tool catalogue could not be assembled.
    #[error("tool catalogue error: {0}")]
    Catalogue(String),

    /// Store connection or statement failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The messaging client could not be built.
    #[error(transparent)]
    Slack(#[from] SlackError),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error on the transport.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl McpError {
    /// JSON-RPC error code for this error.
    pub fn code(&self) -> i32 {
        match self {
            McpError::MethodNotFound(_) | McpError::ToolNotFound { .. } => METHOD_NOT_FOUND,
            McpError::InvalidParams(_) | McpError::InvalidArguments { .. } => INVALID_PARAMS,
            McpError::Catalogue(_)
            | McpError::Store(_)
            | McpError::Slack(_)
            | McpError::Serialization(_)
            | McpError::Io(_) => INTERNAL_ERROR,
        }
    }
}
