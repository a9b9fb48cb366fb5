//! MCP server implementation.
//!
//! [`McpServer`] is both the protocol engine (method dispatch, error
//! envelopes) and the transport loop (one JSON object per input line, one
//! flushed response line per request). Requests are handled strictly in
//! order; notifications are absorbed without writing anything.

use crate::connection::ConnectionProvider;
use crate::diagnostics::{Diagnostic, DiagnosticSink, TracingSink};
use crate::error::McpError;
use crate::executor::ToolExecutor;
use crate::protocol::{
    CallToolParams, CallToolResponse, INTERNAL_ERROR, INVALID_REQUEST, InitializeResult,
    JsonRpcRequest, JsonRpcResponse, ListToolsResponse, PARSE_ERROR, ServerInfo, ToolContent,
};
use crate::slack::SlackClient;
use crate::tools::ToolCatalogue;
use courier_core::config::{CourierConfig, McpConfig};
use serde_json::{Value, json};
use std::io::{BufRead, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// The MCP tool server.
pub struct McpServer {
    config: McpConfig,
    catalogue: ToolCatalogue,
    executor: ToolExecutor,
    diagnostics: Arc<dyn DiagnosticSink>,
    initialized: AtomicBool,
}

impl McpServer {
    /// Create a server with the built-in catalogue over `executor`.
    pub fn new(config: McpConfig, executor: ToolExecutor) -> Result<Self, McpError> {
        Ok(Self {
            config,
            catalogue: ToolCatalogue::builtin()?,
            executor,
            diagnostics: Arc::new(TracingSink),
            initialized: AtomicBool::new(false),
        })
    }

    /// Create a server wired to the backends described by `config`.
    pub fn from_config(config: &CourierConfig) -> Result<Self, McpError> {
        let provider = ConnectionProvider::from_config(&config.store);
        let slack = SlackClient::new(config.slack.clone())?;
        Self::new(config.mcp.clone(), ToolExecutor::new(provider, slack))
    }

    /// Replace the diagnostic sink.
    pub fn with_diagnostics(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = sink;
        self
    }

    /// The tool catalogue.
    pub fn catalogue(&self) -> &ToolCatalogue {
        &self.catalogue
    }

    /// Whether `initialize` has been received.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Run the transport loop over stdin/stdout until end of input.
    pub async fn run_stdio(&self) -> Result<(), McpError> {
        tracing::info!(
            server = %self.config.server_name,
            store = %self.executor.provider().path().display(),
            "Starting MCP server with stdio transport"
        );

        let stdin = std::io::stdin();
        let stdout = std::io::stdout();
        self.serve(stdin.lock(), stdout.lock()).await
    }

    /// Read requests line by line from `reader` and write responses to
    /// `writer`, flushing after every line.
    ///
    /// Returns when the input ends. A malformed line, including one that is
    /// not valid UTF-8, is answered with a parse error and does not stop the
    /// loop; only transport I/O errors do.
    pub async fn serve<R: BufRead, W: Write>(
        &self,
        mut reader: R,
        mut writer: W,
    ) -> Result<(), McpError> {
        let mut lines = 0u64;
        let mut buf = Vec::new();

        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            lines += 1;

            let response = match std::str::from_utf8(&buf) {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    self.handle_line(line).await
                }
                Err(e) => Some(self.parse_failure(e.to_string())),
            };

            if let Some(response) = response {
                self.write_response(&mut writer, &response)?;
            }
        }

        self.diagnostics.record(Diagnostic::EndOfInput { lines });
        Ok(())
    }

    /// Handle one input line. Returns `None` when nothing should be written.
    pub async fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => return Some(self.parse_failure(e.to_string())),
        };

        // Salvage the id before the shape check so an invalid request can
        // still be correlated.
        let id = value.get("id").filter(|id| !id.is_null()).cloned();

        match serde_json::from_value::<JsonRpcRequest>(value) {
            Ok(request) => self.handle_request(request).await,
            Err(e) => {
                self.diagnostics.record(Diagnostic::ParseFailed {
                    error: e.to_string(),
                });
                Some(JsonRpcResponse::error(
                    id,
                    INVALID_REQUEST,
                    format!("Invalid request: {e}"),
                ))
            }
        }
    }

    /// Parse-error envelope for a line that could not be read as JSON.
    fn parse_failure(&self, error: String) -> JsonRpcResponse {
        let response = JsonRpcResponse::error(None, PARSE_ERROR, format!("Parse error: {error}"));
        self.diagnostics.record(Diagnostic::ParseFailed { error });
        response
    }

    /// Handle a JSON-RPC request. Notifications yield `None`.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.is_notification() || request.method == "notifications/initialized" {
            self.diagnostics.record(Diagnostic::NotificationAbsorbed {
                method: request.method,
            });
            return None;
        }

        let id = request.id.clone();
        self.diagnostics.record(Diagnostic::RequestReceived {
            method: request.method.clone(),
            id: id.clone().unwrap_or(Value::Null),
        });

        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(id),
            "tools/list" => self.handle_list_tools(id),
            "tools/call" => self.handle_call_tool(id, request.params).await,
            other => {
                let err = McpError::MethodNotFound(other.to_string());
                JsonRpcResponse::error(id, err.code(), err.to_string())
            }
        };
        Some(response)
    }

    fn handle_initialize(&self, id: Option<Value>) -> JsonRpcResponse {
        self.initialized.store(true, Ordering::SeqCst);

        let result = InitializeResult {
            protocol_version: self.config.protocol_version.clone(),
            capabilities: json!({ "tools": {} }),
            server_info: ServerInfo {
                name: self.config.server_name.clone(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };
        to_success(id, &result)
    }

    fn handle_list_tools(&self, id: Option<Value>) -> JsonRpcResponse {
        let result = ListToolsResponse {
            tools: self.catalogue.list().into_iter().cloned().collect(),
        };
        to_success(id, &result)
    }

    async fn handle_call_tool(&self, id: Option<Value>, params: Option<Value>) -> JsonRpcResponse {
        if !self.is_initialized() {
            self.diagnostics.record(Diagnostic::CalledBeforeInitialize {
                method: "tools/call".to_string(),
            });
        }

        let params: CallToolParams = match params {
            Some(p) => match serde_json::from_value(p) {
                Ok(params) => params,
                Err(e) => {
                    let err = McpError::InvalidParams(e.to_string());
                    return JsonRpcResponse::error(id, err.code(), err.to_string());
                }
            },
            None => {
                let err = McpError::InvalidParams("missing params".to_string());
                return JsonRpcResponse::error(id, err.code(), err.to_string());
            }
        };

        let tool = params.name.clone();
        match self.call_tool(params).await {
            Ok(result) => to_success(id, &result),
            Err(err) => {
                self.diagnostics.record(Diagnostic::ToolFailed {
                    tool,
                    error: err.to_string(),
                });
                JsonRpcResponse::error(id, err.code(), err.to_string())
            }
        }
    }

    async fn call_tool(&self, params: CallToolParams) -> Result<CallToolResponse, McpError> {
        let entry = self
            .catalogue
            .get(&params.name)
            .ok_or_else(|| McpError::ToolNotFound {
                name: params.name.clone(),
            })?;

        let call = entry.prepare_call(params.arguments)?;
        let output = self.executor.execute(call).await?;

        Ok(CallToolResponse {
            content: vec![ToolContent::Text { text: output.text }],
            structured_content: Some(output.structured),
            is_error: output.is_error,
        })
    }

    fn write_response<W: Write>(
        &self,
        writer: &mut W,
        response: &JsonRpcResponse,
    ) -> Result<(), McpError> {
        let line = serde_json::to_string(response)?;
        writeln!(writer, "{line}")?;
        writer.flush()?;

        self.diagnostics.record(Diagnostic::ResponseWritten {
            id: response.id.clone().unwrap_or(Value::Null),
            is_error: response.error.is_some(),
        });
        Ok(())
    }
}

fn to_success<T: serde::Serialize>(id: Option<Value>, result: &T) -> JsonRpcResponse {
    match serde_json::to_value(result) {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(e) => JsonRpcResponse::error(id, INTERNAL_ERROR, e.to_string()),
    }
}
