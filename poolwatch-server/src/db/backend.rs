//! Pool seam - the operations the manager, executor and routes need
//!
//! The MySQL implementation lives in [`super::mysql`]; tests substitute
//! an in-memory pool.

use async_trait::async_trait;
use poolwatch_core::{ConnectionSettings, PoolEnv, SqlParam};
use serde::Serialize;

/// Database error type
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("connection queue limit reached ({limit} requests already waiting)")]
    QueueFull { limit: usize },

    #[error("{0}")]
    Backend(String),
}

/// One row of the server status query
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusVariable {
    #[serde(rename = "Variable_name")]
    pub name: String,
    #[serde(rename = "Value")]
    pub value: String,
}

/// A single connection borrowed from a pool.
///
/// Dropping the lease returns the connection; [`ConnectionLease::release`]
/// is the explicit form.
#[async_trait]
pub trait ConnectionLease: Send {
    /// Round-trip to the server on this connection
    async fn ping(&mut self) -> Result<(), DbError>;

    /// Return the connection to its pool
    fn release(self)
    where
        Self: Sized,
    {
        drop(self);
    }
}

/// A live pool handle
#[async_trait]
pub trait DatabasePool: Send + Sync + 'static {
    type Lease: ConnectionLease;
    type Rows: Send;

    /// Borrow one connection
    async fn acquire(&self) -> Result<Self::Lease, DbError>;

    /// Run a parameterized statement and return the driver's rows
    async fn query(&self, sql: &str, params: &[SqlParam]) -> Result<Self::Rows, DbError>;

    /// Server-side connection counters
    async fn status(&self) -> Result<Vec<StatusVariable>, DbError>;

    /// Configured connection limit
    fn connection_limit(&self) -> u32;

    /// Close every connection; the handle is unusable afterwards
    async fn close(&self) -> Result<(), DbError>;
}

/// Builds pool handles from loaded configuration
pub trait PoolBackend: Send + Sync + 'static {
    type Pool: DatabasePool;

    fn build(&self, settings: &ConnectionSettings, env: &PoolEnv) -> Result<Self::Pool, DbError>;
}
