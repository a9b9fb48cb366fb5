//! `courier tools` - print the tool catalogue without starting a server.

use anyhow::{Context, Result};
use courier_mcp::ToolCatalogue;
use serde_json::json;

/// Render the catalogue as the `tools/list` result payload.
pub fn render() -> Result<String> {
    let catalogue = ToolCatalogue::builtin().context("Failed to build tool catalogue")?;
    let payload = json!({ "tools": catalogue.list() });
    serde_json::to_string_pretty(&payload).context("Failed to serialize tool catalogue")
}

pub fn execute() -> Result<()> {
    println!("{}", render()?);
    Ok(())
}
