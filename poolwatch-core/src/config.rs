//! Database configuration - connection parameters and pool tuning
//!
//! Connection parameters (host, credentials, database) come from a
//! [`ConfigProvider`]; the stock provider reads a persisted TOML file.
//! Pool tuning and logging switches come from the environment:
//! - `DB_MAX_CONNECTIONS`: pool connection limit (default: 10)
//! - `DB_QUEUE_LIMIT`: callers allowed to wait for a connection, 0 = unbounded (default: 0)
//! - `DB_CONNECT_TIMEOUT_MS`: connect/acquire timeout (default: 10000)
//! - `DB_CHARSET`: connection character set (default: utf8mb4)
//! - `APP_ENV` (or `NODE_ENV`): runtime environment label (default: development)
//! - `LOG_SLOW_QUERIES`: set to `false` to stop recording slow queries
//! - `DEBUG_QUERIES`: set to `true` to log every query outside production

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_QUEUE_LIMIT: usize = 0;
const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_CHARSET: &str = "utf8mb4";
const DEFAULT_ENVIRONMENT: &str = "development";
const PRODUCTION: &str = "production";

/// Env var that overrides the persisted configuration path
pub const CONFIG_PATH_VAR: &str = "POOLWATCH_DB_CONFIG";

fn default_port() -> u16 {
    3306
}

/// Connection parameters for the MySQL server
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionSettings {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub database: String,
    #[serde(default)]
    pub ssl: bool,
}

impl fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"***")
            .field("database", &self.database)
            .field("ssl", &self.ssl)
            .finish()
    }
}

/// Source of connection parameters.
///
/// Loading is async so providers may read files, secrets stores or
/// remote config services.
#[async_trait]
pub trait ConfigProvider: Send + Sync + 'static {
    /// Load the current persisted connection parameters
    async fn load(&self) -> Result<ConnectionSettings>;
}

/// Reads [`ConnectionSettings`] from a TOML file on every load.
#[derive(Debug, Clone)]
pub struct TomlFileProvider {
    path: PathBuf,
}

impl TomlFileProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Use `$POOLWATCH_DB_CONFIG`, falling back to `~/.poolwatch/database.toml`
    pub fn from_env() -> Self {
        let path = std::env::var(CONFIG_PATH_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| Self::default_path());
        Self { path }
    }

    /// Default config file path: ~/.poolwatch/database.toml
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".poolwatch")
            .join("database.toml")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ConfigProvider for TomlFileProvider {
    async fn load(&self) -> Result<ConnectionSettings> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigError::not_found(&self.path));
            }
            Err(err) => return Err(ConfigError::read(&self.path, err)),
        };

        let settings: ConnectionSettings =
            toml::from_str(&content).map_err(|err| ConfigError::parse(&self.path, err))?;

        tracing::debug!(
            path = %self.path.display(),
            host = %settings.host,
            database = %settings.database,
            "database configuration loaded"
        );

        Ok(settings)
    }
}

/// Pool tuning and query logging switches read from the environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolEnv {
    pub max_connections: u32,
    pub queue_limit: usize,
    pub connect_timeout: Duration,
    pub charset: String,
    pub environment: String,
    pub log_slow_queries: bool,
    pub debug_queries: bool,
}

impl Default for PoolEnv {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            queue_limit: DEFAULT_QUEUE_LIMIT,
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
            charset: DEFAULT_CHARSET.to_string(),
            environment: DEFAULT_ENVIRONMENT.to_string(),
            log_slow_queries: true,
            debug_queries: false,
        }
    }
}

impl PoolEnv {
    /// Read settings from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary lookup (for testing)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let connect_timeout_ms: u64 =
            parse_var(&lookup, "DB_CONNECT_TIMEOUT_MS", DEFAULT_CONNECT_TIMEOUT_MS)?;

        let environment = lookup("APP_ENV")
            .or_else(|| lookup("NODE_ENV"))
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string());

        Ok(Self {
            max_connections: parse_var(&lookup, "DB_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?,
            queue_limit: parse_var(&lookup, "DB_QUEUE_LIMIT", DEFAULT_QUEUE_LIMIT)?,
            connect_timeout: Duration::from_millis(connect_timeout_ms),
            charset: lookup("DB_CHARSET").unwrap_or_else(|| DEFAULT_CHARSET.to_string()),
            environment,
            // Opt-out: anything but an explicit "false" keeps recording on
            log_slow_queries: lookup("LOG_SLOW_QUERIES").as_deref() != Some("false"),
            debug_queries: lookup("DEBUG_QUERIES").as_deref() == Some("true"),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == PRODUCTION
    }
}

fn parse_var<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(var) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::invalid_env(var, raw)),
        None => Ok(default),
    }
}
