//! Tool catalogue for the MCP server.
//!
//! The catalogue is built once at startup from a fixed table of six tools and
//! is never modified afterwards. Each entry pairs the descriptor advertised by
//! `tools/list` with a compiled JSON schema used to check call arguments, and
//! with a [`ToolKind`] that the executor matches on exhaustively.

use crate::error::McpError;
use crate::protocol::ToolDefinition;
use serde::Deserialize;
use serde_json::{Value, json};

/// Default number of thread replies returned by `read_thread`.
pub const DEFAULT_THREAD_LIMIT: usize = 10;

/// The closed set of tools this server implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    ListTables,
    DescribeTable,
    ReadQuery,
    WriteQuery,
    ReadThread,
    SendMessage,
}

impl ToolKind {
    /// Every tool, in advertised order.
    pub const ALL: [ToolKind; 6] = [
        ToolKind::ListTables,
        ToolKind::DescribeTable,
        ToolKind::ReadQuery,
        ToolKind::WriteQuery,
        ToolKind::ReadThread,
        ToolKind::SendMessage,
    ];

    /// Wire name of the tool.
    pub fn name(self) -> &'static str {
        match self {
            ToolKind::ListTables => "list_tables",
            ToolKind::DescribeTable => "describe_table",
            ToolKind::ReadQuery => "read_query",
            ToolKind::WriteQuery => "write_query",
            ToolKind::ReadThread => "read_thread",
            ToolKind::SendMessage => "send_message",
        }
    }

    fn description(self) -> &'static str {
        match self {
            ToolKind::ListTables => "List all tables in the SQLite database",
            ToolKind::DescribeTable => {
                "Get the schema of a specific table: column names, declared types, \
                 not-null and primary-key flags"
            }
            ToolKind::ReadQuery => "Execute a SELECT query on the SQLite database",
            ToolKind::WriteQuery => "Execute an INSERT, UPDATE, or DELETE query",
            ToolKind::ReadThread => {
                "Read the most recent replies in a Slack thread, oldest first. \
                 Bot status updates are filtered out."
            }
            ToolKind::SendMessage => {
                "Post a message to a Slack channel. Only call this after a human \
                 has approved the exact message text."
            }
        }
    }

    fn input_schema(self) -> Value {
        match self {
            ToolKind::ListTables => json!({
                "type": "object",
                "properties": {}
            }),
            ToolKind::DescribeTable => json!({
                "type": "object",
                "properties": {
                    "table_name": {"type": "string", "description": "Name of the table"}
                },
                "required": ["table_name"]
            }),
            ToolKind::ReadQuery => json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string", "description": "SQL SELECT query to execute"}
                },
                "required": ["query"]
            }),
            ToolKind::WriteQuery => json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string", "description": "SQL query to execute"}
                },
                "required": ["query"]
            }),
            ToolKind::ReadThread => json!({
                "type": "object",
                "properties": {
                    "channel": {"type": "string", "description": "Channel ID containing the thread"},
                    "thread_ts": {"type": "string", "description": "Timestamp of the thread's parent message"},
                    "limit": {
                        "type": "integer",
                        "minimum": 1,
                        "description": "Maximum number of recent replies to return (default 10)"
                    }
                },
                "required": ["channel", "thread_ts"]
            }),
            ToolKind::SendMessage => json!({
                "type": "object",
                "properties": {
                    "channel": {"type": "string", "description": "Channel ID or name to post to"},
                    "message": {"type": "string", "description": "Message text to post"}
                },
                "required": ["channel", "message"]
            }),
        }
    }
}

/// Arguments for `describe_table`.
#[derive(Debug, Clone, Deserialize)]
pub struct DescribeTableParams {
    pub table_name: String,
}

/// Arguments for `read_query` and `write_query`.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryParams {
    pub query: String,
}

/// Arguments for `read_thread`.
#[derive(Debug, Clone, Deserialize)]
pub struct ReadThreadParams {
    pub channel: String,
    pub thread_ts: String,
    #[serde(default = "default_thread_limit")]
    pub limit: usize,
}

/// Arguments for `send_message`.
#[derive(Debug, Clone, Deserialize)]
pub struct SendMessageParams {
    pub channel: String,
    pub message: String,
}

/// A tool invocation with typed arguments.
#[derive(Debug, Clone)]
pub enum ToolCall {
    ListTables,
    DescribeTable(DescribeTableParams),
    ReadQuery(QueryParams),
    WriteQuery(QueryParams),
    ReadThread(ReadThreadParams),
    SendMessage(SendMessageParams),
}

impl ToolCall {
    /// Deserialize `arguments` into the parameter type for `kind`.
    pub fn parse(kind: ToolKind, arguments: Value) -> Result<Self, McpError> {
        let invalid = |e: serde_json::Error| McpError::InvalidArguments {
            tool: kind.name().to_string(),
            reason: e.to_string(),
        };
        Ok(match kind {
            ToolKind::ListTables => ToolCall::ListTables,
            ToolKind::DescribeTable => {
                ToolCall::DescribeTable(serde_json::from_value(arguments).map_err(invalid)?)
            }
            ToolKind::ReadQuery => {
                ToolCall::ReadQuery(serde_json::from_value(arguments).map_err(invalid)?)
            }
            ToolKind::WriteQuery => {
                ToolCall::WriteQuery(serde_json::from_value(arguments).map_err(invalid)?)
            }
            ToolKind::ReadThread => {
                ToolCall::ReadThread(serde_json::from_value(arguments).map_err(invalid)?)
            }
            ToolKind::SendMessage => {
                ToolCall::SendMessage(serde_json::from_value(arguments).map_err(invalid)?)
            }
        })
    }

    /// The tool this call targets.
    pub fn kind(&self) -> ToolKind {
        match self {
            ToolCall::ListTables => ToolKind::ListTables,
            ToolCall::DescribeTable(_) => ToolKind::DescribeTable,
            ToolCall::ReadQuery(_) => ToolKind::ReadQuery,
            ToolCall::WriteQuery(_) => ToolKind::WriteQuery,
            ToolCall::ReadThread(_) => ToolKind::ReadThread,
            ToolCall::SendMessage(_) => ToolKind::SendMessage,
        }
    }
}

/// A catalogue entry: descriptor, compiled schema and dispatch tag.
pub struct ToolEntry {
    pub kind: ToolKind,
    pub definition: ToolDefinition,
    validator: jsonschema::Validator,
}

impl ToolEntry {
    /// Check `arguments` against the tool's input schema, then type them.
    pub fn prepare_call(&self, arguments: Value) -> Result<ToolCall, McpError> {
        let errors: Vec<String> = self
            .validator
            .iter_errors(&arguments)
            .map(|e| e.to_string())
            .collect();
        if !errors.is_empty() {
            return Err(McpError::InvalidArguments {
                tool: self.definition.name.clone(),
                reason: errors.join("; "),
            });
        }
        ToolCall::parse(self.kind, arguments)
    }
}

/// Immutable registry of the server's tools.
pub struct ToolCatalogue {
    entries: Vec<ToolEntry>,
}

impl ToolCatalogue {
    /// Build the catalogue of built-in tools, compiling every input schema.
    pub fn builtin() -> Result<Self, McpError> {
        let mut entries: Vec<ToolEntry> = Vec::with_capacity(ToolKind::ALL.len());
        for kind in ToolKind::ALL {
            if entries.iter().any(|e| e.kind.name() == kind.name()) {
                return Err(McpError::Catalogue(format!(
                    "duplicate tool name: {}",
                    kind.name()
                )));
            }
            let schema = kind.input_schema();
            let validator = jsonschema::draft202012::options()
                .build(&schema)
                .map_err(|e| {
                    McpError::Catalogue(format!("invalid schema for {}: {}", kind.name(), e))
                })?;
            entries.push(ToolEntry {
                kind,
                definition: ToolDefinition {
                    name: kind.name().to_string(),
                    description: kind.description().to_string(),
                    input_schema: schema,
                },
                validator,
            });
        }
        Ok(Self { entries })
    }

    /// Tool descriptors in advertised order.
    pub fn list(&self) -> Vec<&ToolDefinition> {
        self.entries.iter().map(|e| &e.definition).collect()
    }

    /// Look up a tool by wire name.
    pub fn get(&self, name: &str) -> Option<&ToolEntry> {
        self.entries.iter().find(|e| e.definition.name == name)
    }

    /// Tool names in advertised order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.definition.name.as_str()).collect()
    }

    /// Number of tools.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalogue is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn default_thread_limit() -> usize {
    DEFAULT_THREAD_LIMIT
}
