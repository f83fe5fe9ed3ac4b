//! Command-line arguments.

use clap::{Parser, Subcommand};
use ledgerline_domain::{Method, RequestOptions};

/// Ledgerline - JSON API client with request coalescing
#[derive(Parser, Debug)]
#[command(name = "ledgerline")]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file (YAML)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Log at debug level (RUST_LOG still takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Fetch a resource with GET
    Get {
        /// Request URL, relative to api.base_url or absolute
        url: String,

        /// Share in-flight requests and serve fresh cached responses
        #[arg(long)]
        dedupe: bool,

        /// Skip the cache read (still shares in-flight requests)
        #[arg(long)]
        no_cache: bool,
    },

    /// Send a request with any method
    Send {
        /// HTTP method (GET, POST, PUT, PATCH, DELETE)
        method: Method,

        /// Request URL, relative to api.base_url or absolute
        url: String,

        /// JSON request body
        #[arg(long)]
        body: Option<String>,

        /// Extra header as `name:value`; may be repeated
        #[arg(short = 'H', long = "header", value_parser = parse_header)]
        headers: Vec<(String, String)>,
    },
}

impl Command {
    /// URL and request options for this command.
    ///
    /// Fails when `--body` is not valid JSON.
    pub fn request(&self) -> anyhow::Result<(&str, RequestOptions)> {
        match self {
            Command::Get {
                url,
                dedupe,
                no_cache,
            } => Ok((
                url,
                RequestOptions::new().dedupe(*dedupe).no_cache(*no_cache),
            )),
            Command::Send {
                method,
                url,
                body,
                headers,
            } => {
                let mut options = RequestOptions::with_method(*method);
                for (name, value) in headers {
                    options = options.header(name, value.as_str());
                }
                if let Some(body) = body {
                    serde_json::from_str::<serde_json::Value>(body)
                        .map_err(|e| anyhow::anyhow!("--body is not valid JSON: {e}"))?;
                    options = options.body(body.as_str());
                }
                Ok((url, options))
            }
        }
    }
}

/// Parses `name:value`, trimming whitespace around both parts.
pub fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected name:value, got {raw:?}"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("header name is empty in {raw:?}"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}
