//! # courier-mcp
//!
//! MCP (Model Context Protocol) tool server for the Courier logistics store.
//!
//! The server speaks line-delimited JSON-RPC on stdin/stdout and exposes a
//! fixed catalogue of six tools to a single peer process (its parent):
//!
//! | Tool | Backend | Description |
//! |------|---------|-------------|
//! | `list_tables` | SQLite | Table names, ascending |
//! | `describe_table` | SQLite | Column name, type, not-null and primary-key flags |
//! | `read_query` | SQLite | Run a read-only statement, return columns and rows |
//! | `write_query` | SQLite | Run a statement in a transaction, return affected rows |
//! | `read_thread` | Slack | Recent replies in a thread, minus bot status chatter |
//! | `send_message` | Slack | Post text to a channel |
//!
//! ## Architecture
//!
//! ```text
//! Peer process (agent runtime)
//!       │
//!       │ one JSON object per line
//!       ▼
//! ┌──────────────────────┐
//! │ Transport loop       │  read line → handle → write + flush
//! │ Protocol engine      │  initialize / tools/list / tools/call
//! │ Tool catalogue       │  name → descriptor + input schema
//! │ Tool executor        │  validated arguments → handler
//! └─────────┬────────────┘
//!           │
//!     ┌─────┴──────┐
//!     ▼            ▼
//!  SQLite       Slack Web API
//!  (fresh connection per call, linear-backoff retry)
//! ```
//!
//! Requests are handled strictly one at a time, in the order they are read.
//! Notifications (requests without an `id`) never produce a response line.

pub mod connection;
pub mod diagnostics;
pub mod error;
pub mod executor;
pub mod protocol;
pub mod server;
pub mod slack;
pub mod store;
pub mod tools;

pub use connection::{Access, ConnectionError, ConnectionProvider, RetryPolicy};
pub use diagnostics::{Diagnostic, DiagnosticSink, NullSink, TracingSink};
pub use error::McpError;
pub use executor::{ExecutionOutput, ToolExecutor};
pub use protocol::{
    CallToolParams, CallToolResponse, JsonRpcError, JsonRpcRequest, JsonRpcResponse,
    ToolContent, ToolDefinition,
};
pub use server::McpServer;
pub use slack::{Role, SendResult, SlackClient, SlackError, ThreadMessage, ThreadReadResult};
pub use store::{ColumnInfo, QueryResult, StoreError, WriteResult};
pub use tools::{ToolCall, ToolCatalogue, ToolKind};
