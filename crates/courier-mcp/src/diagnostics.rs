//! Diagnostic side channel for the transport loop.
//!
//! Standard output is reserved for protocol frames, so everything the server
//! wants to say about itself goes through a [`DiagnosticSink`] held by the
//! server. The default sink forwards to `tracing`, which the binary wires to
//! stderr; tests can substitute a capturing or silent sink.

use serde_json::Value;

/// Something worth reporting about a request or the loop itself.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// A request with an id was received.
    RequestReceived { method: String, id: Value },
    /// A notification was absorbed without a response.
    NotificationAbsorbed { method: String },
    /// An input line could not be parsed.
    ParseFailed { error: String },
    /// A tool call failed and was mapped to an error envelope.
    ToolFailed { tool: String, error: String },
    /// A tool call arrived before `initialize`.
    CalledBeforeInitialize { method: String },
    /// A response line was written and flushed.
    ResponseWritten { id: Value, is_error: bool },
    /// The input stream ended.
    EndOfInput { lines: u64 },
}

/// Receiver for server diagnostics.
pub trait DiagnosticSink: Send + Sync {
    fn record(&self, event: Diagnostic);
}

/// Forwards diagnostics to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn record(&self, event: Diagnostic) {
        match event {
            Diagnostic::RequestReceived { method, id } => {
                tracing::debug!(%method, %id, "Request received");
            }
            Diagnostic::NotificationAbsorbed { method } => {
                tracing::debug!(%method, "Notification absorbed");
            }
            Diagnostic::ParseFailed { error } => {
                tracing::warn!(%error, "Failed to parse input line");
            }
            Diagnostic::ToolFailed { tool, error } => {
                tracing::warn!(%tool, %error, "Tool call failed");
            }
            Diagnostic::CalledBeforeInitialize { method } => {
                tracing::warn!(%method, "Request served before initialize");
            }
            Diagnostic::ResponseWritten { id, is_error } => {
                tracing::debug!(%id, is_error, "Response written");
            }
            Diagnostic::EndOfInput { lines } => {
                tracing::info!(lines, "Input closed, shutting down");
            }
        }
    }
}

/// Discards all diagnostics.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn record(&self, _event: Diagnostic) {}
}
