//! Command implementations for the poolwatch CLI

pub mod check;
pub mod serve;

pub use check::run_check;
pub use serve::run_serve;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use poolwatch_core::{PoolEnv, TomlFileProvider};
use poolwatch_server::db::MySqlBackend;
use poolwatch_server::PoolManager;

/// Build a MySQL pool manager from the environment and a config file
pub(crate) fn mysql_manager(config: Option<PathBuf>) -> Result<Arc<PoolManager<MySqlBackend>>> {
    let env = PoolEnv::from_env().context("Invalid pool environment settings")?;
    let provider = match config {
        Some(path) => TomlFileProvider::new(path),
        None => TomlFileProvider::from_env(),
    };
    tracing::debug!(config = %provider.path().display(), "using database config file");

    Ok(PoolManager::new(MySqlBackend, Arc::new(provider), env))
}
