//! One-shot database liveness check
//!
//! Same probe as `GET /db`, printed as JSON. Exits non-zero when the
//! database is unreachable.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use poolwatch_server::http::routes::health::check_connection;

use super::mysql_manager;

/// Arguments for the check command
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Database config file (default: ~/.poolwatch/database.toml)
    #[arg(long, short = 'c', env = "POOLWATCH_DB_CONFIG")]
    pub config: Option<PathBuf>,
}

pub async fn run_check(args: CheckArgs) -> Result<()> {
    let manager = mysql_manager(args.config)?;
    manager.initialize().await;

    let pool = manager.pool().await;
    let health = check_connection(pool.as_deref()).await;
    manager.shutdown().await;

    println!(
        "{}",
        serde_json::to_string_pretty(&health).context("Failed to serialize health result")?
    );

    if !health.connected {
        bail!(
            "database unreachable: {}",
            health.error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}
