//! Tool execution engine.
//!
//! Runs a typed [`ToolCall`] against its backend and renders the outcome
//! twice: once as human-readable text for the `content` block, and once as
//! the full typed result for `structuredContent`. Display truncation of large
//! result sets only affects the text rendering.

use crate::connection::ConnectionProvider;
use crate::error::McpError;
use crate::slack::{SendResult, SlackClient, ThreadReadResult};
use crate::store::{self, ColumnInfo, QueryResult, WriteResult};
use crate::tools::ToolCall;
use serde_json::{Value, json};

/// Rows shown in the text rendering of `read_query`.
pub const DISPLAY_ROW_LIMIT: usize = 100;

/// Outcome of a tool execution.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionOutput {
    /// Human-readable rendering.
    pub text: String,
    /// Full typed result.
    pub structured: Value,
    /// Set when a messaging tool reports `success: false`.
    pub is_error: bool,
}

impl ExecutionOutput {
    fn ok(text: String, structured: Value) -> Self {
        Self {
            text,
            structured,
            is_error: false,
        }
    }
}

/// Executes tool calls against the store and the messaging platform.
#[derive(Debug, Clone)]
pub struct ToolExecutor {
    provider: ConnectionProvider,
    slack: SlackClient,
}

impl ToolExecutor {
    /// Create an executor over the given backends.
    pub fn new(provider: ConnectionProvider, slack: SlackClient) -> Self {
        Self { provider, slack }
    }

    /// The store connection provider.
    pub fn provider(&self) -> &ConnectionProvider {
        &self.provider
    }

    /// Run `call` to completion.
    ///
    /// Store failures propagate as [`McpError::Store`]; messaging failures
    /// come back as a successful execution with `is_error` set.
    pub async fn execute(&self, call: ToolCall) -> Result<ExecutionOutput, McpError> {
        match call {
            ToolCall::ListTables => {
                let tables = store::list_tables(&self.provider).await?;
                Ok(ExecutionOutput::ok(
                    render_tables(&tables),
                    json!({ "tables": tables }),
                ))
            }
            ToolCall::DescribeTable(params) => {
                let columns = store::describe_table(&self.provider, &params.table_name).await?;
                Ok(ExecutionOutput::ok(
                    render_schema(&params.table_name, &columns),
                    json!({ "table": params.table_name, "columns": columns }),
                ))
            }
            ToolCall::ReadQuery(params) => {
                let result = store::read_query(&self.provider, &params.query).await?;
                let text = render_query_result(&result);
                Ok(ExecutionOutput::ok(text, serde_json::to_value(result)?))
            }
            ToolCall::WriteQuery(params) => {
                let result = store::write_query(&self.provider, &params.query).await?;
                let text = render_write_result(&result);
                Ok(ExecutionOutput::ok(text, serde_json::to_value(result)?))
            }
            ToolCall::ReadThread(params) => {
                let result = self
                    .slack
                    .read_thread(&params.channel, &params.thread_ts, params.limit)
                    .await;
                thread_output(result)
            }
            ToolCall::SendMessage(params) => {
                let result = self
                    .slack
                    .send_message(&params.channel, &params.message)
                    .await;
                send_output(result)
            }
        }
    }
}

fn thread_output(result: ThreadReadResult) -> Result<ExecutionOutput, McpError> {
    let structured = serde_json::to_value(&result)?;
    Ok(ExecutionOutput {
        text: serde_json::to_string(&structured)?,
        structured,
        is_error: !result.success,
    })
}

fn send_output(result: SendResult) -> Result<ExecutionOutput, McpError> {
    let structured = serde_json::to_value(&result)?;
    Ok(ExecutionOutput {
        text: serde_json::to_string(&structured)?,
        structured,
        is_error: !result.success,
    })
}

fn render_tables(tables: &[String]) -> String {
    let mut text = String::from("Tables in database:\n");
    text.push_str(
        &tables
            .iter()
            .map(|t| format!("- {t}"))
            .collect::<Vec<_>>()
            .join("\n"),
    );
    text
}

fn render_schema(table: &str, columns: &[ColumnInfo]) -> String {
    let mut text = format!("Schema for {table}:\n");
    text.push_str(
        &columns
            .iter()
            .map(|c| format!("- {} ({})", c.name, c.data_type))
            .collect::<Vec<_>>()
            .join("\n"),
    );
    text
}

fn render_query_result(result: &QueryResult) -> String {
    if result.rows.is_empty() {
        return "Query returned no results.".to_string();
    }

    let mut text = format!(
        "Columns: {}\n\nResults ({} rows):\n",
        result.columns.join(", "),
        result.rows.len()
    );
    for row in result.rows.iter().take(DISPLAY_ROW_LIMIT) {
        text.push_str(&Value::from(row.clone()).to_string());
        text.push('\n');
    }
    if result.rows.len() > DISPLAY_ROW_LIMIT {
        text.push_str(&format!(
            "\n... and {} more rows",
            result.rows.len() - DISPLAY_ROW_LIMIT
        ));
    }
    text
}

fn render_write_result(result: &WriteResult) -> String {
    format!("Query executed. Affected rows: {}", result.affected_rows)
}
