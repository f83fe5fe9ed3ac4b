//! Ledgerline CLI
//!
//! Sends one request through the unified fetch client and prints the JSON
//! response.
//!
//! # Usage
//!
//! ```bash
//! # Cached, coalesced read
//! ledgerline --config client.yaml get /api/goals --dedupe --verbose
//!
//! # Mutation with a JSON body
//! LEDGERLINE_API__BASE_URL=http://localhost:8000 \
//!     ledgerline send POST /api/todo --body '{"title":"Pay rent"}'
//! ```

mod cli;

use std::sync::Arc;

use clap::Parser;
use tracing::{debug, info, Level};

use ledgerline_client::observability::{init_logging, register_client_metrics, LoggingConfig};
use ledgerline_client::{ApiClient, ClientConfig};
use ledgerline_domain::notify::TracingSink;

use crate::cli::Args;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = if let Some(config_path) = &args.config {
        ClientConfig::load(config_path)?
    } else {
        ClientConfig::from_env()?
    };

    let mut log_config = LoggingConfig::from_settings(&config.logging);
    if args.verbose {
        log_config = log_config.with_level(Level::DEBUG);
    }
    init_logging(log_config);
    register_client_metrics();

    debug!(base_url = %config.api.base_url, "client configured");

    let client = ApiClient::from_config(&config, Arc::new(TracingSink))?;
    let (url, options) = args.command.request()?;
    let method = options.method;

    let value = client.fetch_json(url, options).await?;
    info!(%method, url, "request completed");

    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
