//! Database liveness endpoint
//!
//! GET /db - borrows one connection, pings it and gives it back.
//! Never initializes the pool; a missing pool is reported as-is.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::db::{ConnectionLease, DatabasePool, DbError, PoolBackend};
use crate::http::server::AppState;

/// Liveness response
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DbHealth {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DbHealth {
    fn connected() -> Self {
        Self {
            connected: true,
            message: Some("database connection succeeded".to_string()),
            error: None,
        }
    }

    fn disconnected(error: impl Into<String>) -> Self {
        Self {
            connected: false,
            message: None,
            error: Some(error.into()),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        if self.connected {
            StatusCode::OK
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

impl IntoResponse for DbHealth {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self)).into_response()
    }
}

/// Check one connection from `pool`, or report the pool as missing.
pub async fn check_connection<P: DatabasePool>(pool: Option<&P>) -> DbHealth {
    let Some(pool) = pool else {
        return DbHealth::disconnected("connection pool not initialized");
    };

    match ping_one(pool).await {
        Ok(()) => DbHealth::connected(),
        Err(err) => {
            tracing::error!(error = %err, "database connection check failed");
            DbHealth::disconnected(err.to_string())
        }
    }
}

async fn ping_one<P: DatabasePool>(pool: &P) -> Result<(), DbError> {
    let mut lease = pool.acquire().await?;
    let outcome = lease.ping().await;
    lease.release();
    outcome
}

/// GET /db
async fn db_health<B: PoolBackend>(State(state): State<Arc<AppState<B>>>) -> DbHealth {
    let pool = state.manager.pool().await;
    check_connection(pool.as_deref()).await
}

/// Liveness routes
pub fn router<B: PoolBackend>() -> Router<Arc<AppState<B>>> {
    Router::new().route("/db", get(db_health::<B>))
}
