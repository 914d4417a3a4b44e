//! Runtime metrics endpoint
//!
//! GET /metrics - process, pool and slow-query figures in one payload.

use std::sync::Arc;

use axum::extract::State;
use axum::{routing::get, Json, Router};
use chrono::{DateTime, SecondsFormat, Utc};
use poolwatch_core::truncate::{truncate_chars, SLOW_QUERY_PREVIEW};
use poolwatch_core::QueryStatistics;
use serde::Serialize;

use crate::db::{DatabasePool, PoolBackend, StatusVariable};
use crate::http::error::ApiError;
use crate::http::server::AppState;
use crate::process::{self, MemoryUsage};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsResponse {
    pub timestamp: String,
    pub environment: String,
    /// Seconds since process start
    pub uptime: f64,
    pub memory: MemoryUsage,
    pub database: DatabaseMetrics,
    pub queries: QueryMetrics,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseMetrics {
    pub pool_limit: u32,
    pub pool_stats: Option<Vec<StatusVariable>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryMetrics {
    pub slow_queries: usize,
    pub avg_duration: u64,
    pub max_duration: u64,
    pub recent_slow_queries: Vec<RecentSlowQuery>,
}

#[derive(Debug, Serialize)]
pub struct RecentSlowQuery {
    pub duration: u64,
    pub sql: String,
    pub timestamp: String,
}

impl From<QueryStatistics> for QueryMetrics {
    fn from(stats: QueryStatistics) -> Self {
        Self {
            slow_queries: stats.count,
            avg_duration: stats.avg_duration_ms,
            max_duration: stats.max_duration_ms,
            recent_slow_queries: stats
                .recent
                .into_iter()
                .map(|metric| RecentSlowQuery {
                    duration: metric.duration_ms,
                    sql: truncate_chars(&metric.sql, SLOW_QUERY_PREVIEW).to_string(),
                    timestamp: iso_timestamp(metric.timestamp),
                })
                .collect(),
        }
    }
}

fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// GET /metrics
async fn metrics<B: PoolBackend>(
    State(state): State<Arc<AppState<B>>>,
) -> Result<Json<MetricsResponse>, ApiError> {
    let queries = QueryMetrics::from(state.slow_queries().statistics());
    let memory = MemoryUsage::current()?;

    // Status counters are optional; a failing query just leaves them out
    let pool_stats = match state.manager.pool().await {
        Some(pool) => pool.status().await.ok(),
        None => None,
    };

    Ok(Json(MetricsResponse {
        timestamp: iso_timestamp(Utc::now()),
        environment: state.manager.env().environment.clone(),
        uptime: process::uptime().as_secs_f64(),
        memory,
        database: DatabaseMetrics {
            pool_limit: state.manager.env().max_connections,
            pool_stats,
        },
        queries,
    }))
}

/// Metrics routes
pub fn router<B: PoolBackend>() -> Router<Arc<AppState<B>>> {
    Router::new().route("/metrics", get(metrics::<B>))
}
