/// Structured error types for poolwatch-core.
///
/// Uses `thiserror` so the server crate can wrap these in its own errors.
/// The CLI converts everything to `anyhow` at the edge.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading database configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// No persisted configuration exists yet
    #[error("Database configuration not found at {path:?}")]
    NotFound { path: PathBuf },

    /// The configuration file exists but could not be read
    #[error("Failed to read database configuration {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The configuration file is not valid TOML or lacks required keys
    #[error("Invalid database configuration in {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// An environment variable held a value that could not be parsed
    #[error("Invalid value for {var}: {value:?}")]
    InvalidEnv { var: &'static str, value: String },

    /// Provider-specific failure.
    ///
    /// [`crate::ConfigProvider`] implementations backed by something other
    /// than a TOML file (a secrets store, a settings table) report their
    /// own failures through this variant.
    #[error("Configuration error: {reason}")]
    Other { reason: String },
}

/// Result type alias for configuration loading
pub type Result<T> = std::result::Result<T, ConfigError>;

impl ConfigError {
    /// Create a not-found error
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Create a read error
    pub fn read(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    /// Create a parse error
    pub fn parse(path: impl Into<PathBuf>, source: toml::de::Error) -> Self {
        Self::Parse {
            path: path.into(),
            source,
        }
    }

    /// Create an invalid environment value error
    pub fn invalid_env(var: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidEnv {
            var,
            value: value.into(),
        }
    }

    /// Create a generic configuration error
    pub fn other(reason: impl Into<String>) -> Self {
        Self::Other {
            reason: reason.into(),
        }
    }
}
