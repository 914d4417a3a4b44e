//! HTTP server command
//!
//! Initializes the pool once at startup (non-fatal) and serves
//! `GET /db` and `GET /metrics` until shutdown.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use poolwatch_server::http::{run_server, AppState, ServerConfig};

use super::mysql_manager;

/// Arguments for the serve command
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Address to bind to (default: 127.0.0.1:3030)
    #[arg(long, short = 'b', default_value = "127.0.0.1:3030")]
    pub bind: SocketAddr,

    /// Allow permissive CORS (all origins) - use with caution
    #[arg(long)]
    pub cors_permissive: bool,

    /// Database config file (default: ~/.poolwatch/database.toml)
    #[arg(long, short = 'c', env = "POOLWATCH_DB_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Run the HTTP server
pub async fn run_serve(args: ServeArgs) -> Result<()> {
    let manager = mysql_manager(args.config)?;

    // A missing or broken config leaves the pool absent; the server still starts
    manager.initialize().await;

    tracing::info!("Starting poolwatch server on {}", args.bind);

    let config = ServerConfig {
        bind_addr: args.bind,
        cors_permissive: args.cors_permissive,
    };

    run_server(AppState::new(manager), config)
        .await
        .context("Server error")?;

    Ok(())
}
