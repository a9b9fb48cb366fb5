//! `courier serve` - run the MCP server on stdin/stdout.
//!
//! Configuration comes from `courier.yaml` (or `--config`), falling back to
//! defaults when the file is absent. Command-line flags override the file.

use anyhow::{Context, Result};
use clap::Args;
use courier_core::CourierConfig;
use courier_mcp::McpServer;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Arguments for `courier serve`.
#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Configuration file path.
    #[arg(short, long, default_value = "courier.yaml")]
    pub config: PathBuf,

    /// SQLite store path. Overrides `store.path`.
    #[arg(long, env = "COURIER_DB_PATH")]
    pub db: Option<PathBuf>,

    /// Slack Web API base URL. Overrides `slack.api_base_url`.
    #[arg(long)]
    pub slack_api_url: Option<String>,
}

/// Load the configuration file (if present), apply overrides and validate.
pub fn load_config(args: &ServeArgs) -> Result<CourierConfig> {
    let (mut config, found) = CourierConfig::load_or_default(&args.config)
        .with_context(|| format!("Failed to load config file: {:?}", args.config))?;
    if !found {
        warn!(config = %args.config.display(), "Config file not found, using defaults");
    }

    if let Some(db) = &args.db {
        config.store.path = db.clone();
    }
    if let Some(url) = &args.slack_api_url {
        config.slack.api_base_url = url.clone();
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

pub async fn execute(args: ServeArgs) -> Result<()> {
    let config = load_config(&args)?;
    report_store(&config.store.path);

    if config.slack.resolve_token().is_none() {
        warn!(
            env = %config.slack.token_env,
            "No Slack token configured; messaging tools will report failures"
        );
    }

    let server = McpServer::from_config(&config).context("Failed to build MCP server")?;
    info!(
        store = %config.store.path.display(),
        tools = server.catalogue().len(),
        "MCP server ready"
    );

    server.run_stdio().await.context("MCP transport failed")?;
    info!("MCP server stopped");
    Ok(())
}

/// The server still starts without a store; store tools then fail per call.
fn report_store(path: &Path) {
    if path.exists() {
        info!(store = %path.display(), "Using SQLite store");
    } else {
        error!(
            store = %path.display(),
            "SQLite store not found; store tools will fail until it exists"
        );
    }
}
