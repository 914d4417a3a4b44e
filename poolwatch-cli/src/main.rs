//! poolwatch CLI - managed MySQL pool with health and slow-query metrics
//!
//! - `serve`: run the HTTP server exposing `GET /db` and `GET /metrics`
//! - `check`: probe the configured database once and print the result

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod tracing_setup;

use commands::check::CheckArgs;
use commands::serve::ServeArgs;
use tracing_setup::TracingConfig;

#[derive(Parser, Debug)]
#[command(
    name = "poolwatch",
    author,
    version,
    about = "Managed MySQL connection pool with health probing and slow-query metrics"
)]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP server
    Serve(ServeArgs),
    /// Check database connectivity once
    Check(CheckArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    poolwatch_server::process::mark_process_start();

    // Load .env if present; real environment variables take precedence
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    tracing_setup::init(&TracingConfig { debug: cli.debug }).ok();

    match cli.command {
        Commands::Serve(args) => commands::run_serve(args).await?,
        Commands::Check(args) => commands::run_check(args).await?,
    }
    Ok(())
}
