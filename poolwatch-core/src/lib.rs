//! poolwatch-core: configuration, errors and slow-query recording
//!
//! Everything here is independent of the database driver and the HTTP
//! layer, so it can be exercised without a MySQL server.

pub mod config;
pub mod error;
pub mod param;
pub mod slow_query;
pub mod truncate;

pub use config::{ConfigProvider, ConnectionSettings, PoolEnv, TomlFileProvider};
pub use error::{ConfigError, Result};
pub use param::SqlParam;
pub use slow_query::{
    QueryMetric, QueryStatistics, SlowQueryLog, MAX_SLOW_QUERIES, RECENT_SLOW_QUERIES,
    SLOW_QUERY_THRESHOLD_MS,
};
