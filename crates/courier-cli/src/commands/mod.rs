//! CLI command implementations for the Courier MCP server.

pub mod serve;
pub mod tools;
