//! Database layer - pool lifecycle and instrumented queries
//!
//! # Design Principles
//!
//! - One pool handle at a time, owned by [`PoolManager`]
//! - Leases are scoped to one operation and returned on drop
//! - The executor observes queries; it never retries or swallows errors

pub mod backend;
pub mod executor;
pub mod manager;
pub mod mysql;

#[cfg(test)]
pub(crate) mod mock;

pub use backend::{ConnectionLease, DatabasePool, DbError, PoolBackend, StatusVariable};
pub use executor::{QueryExecutor, QueryLogSettings};
pub use manager::{PoolError, PoolManager};
pub use mysql::{MySqlBackend, MySqlDatabase, MySqlLease};
