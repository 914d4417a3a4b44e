//! poolwatch-server: managed MySQL pool with health and metrics endpoints
//!
//! Owns the process-wide pool handle, instruments queries run through it
//! and exposes `GET /db` and `GET /metrics`.

pub mod db;
pub mod http;
pub mod process;

pub use db::{PoolError, PoolManager, QueryExecutor};
pub use http::{build_router, run_server, AppState, ServerConfig};
