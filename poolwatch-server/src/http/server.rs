//! Axum server setup
//!
//! Server skeleton with:
//! - Localhost-only CORS by default
//! - Tracing middleware
//! - Graceful shutdown on SIGTERM/Ctrl+C, closing the pool afterwards

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderValue;
use axum::Router;
use poolwatch_core::SlowQueryLog;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::routes;
use crate::db::{PoolBackend, PoolManager, QueryExecutor, QueryLogSettings};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to (default: 127.0.0.1:3030)
    pub bind_addr: SocketAddr,

    /// Allow permissive CORS (default: false = localhost only)
    pub cors_permissive: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3030)),
            cors_permissive: false,
        }
    }
}

/// Shared application state
pub struct AppState<B: PoolBackend> {
    pub manager: Arc<PoolManager<B>>,
    pub executor: QueryExecutor,
}

impl<B: PoolBackend> AppState<B> {
    pub fn new(manager: Arc<PoolManager<B>>) -> Self {
        let settings = QueryLogSettings::from_env(manager.env());
        Self {
            executor: QueryExecutor::new(Arc::new(SlowQueryLog::new()), settings),
            manager,
        }
    }

    pub fn slow_queries(&self) -> &SlowQueryLog {
        self.executor.slow_queries()
    }
}

/// Build the application router with all routes
pub fn build_router<B: PoolBackend>(state: Arc<AppState<B>>, config: &ServerConfig) -> Router {
    let cors = if config.cors_permissive {
        tracing::warn!("CORS: Permissive mode enabled - all origins allowed");
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin([
                HeaderValue::from_static("http://localhost:3000"),
                HeaderValue::from_static("http://localhost:3030"),
                HeaderValue::from_static("http://127.0.0.1:3000"),
                HeaderValue::from_static("http://127.0.0.1:3030"),
            ])
            .allow_methods(Any)
            .allow_headers(Any)
    };

    Router::new()
        .merge(routes::health::router::<B>())
        .merge(routes::metrics::router::<B>())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the HTTP server until a shutdown signal arrives.
///
/// # Example
///
/// ```ignore
/// let manager = PoolManager::new(MySqlBackend, provider, PoolEnv::from_env()?);
/// manager.initialize().await;
/// run_server(AppState::new(manager), ServerConfig::default()).await?;
/// ```
pub async fn run_server<B: PoolBackend>(
    state: AppState<B>,
    config: ServerConfig,
) -> Result<(), ServerError> {
    let state = Arc::new(state);
    let app = build_router(Arc::clone(&state), &config);

    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.manager.shutdown().await;
    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting shutdown");
        }
    }
}

/// Server error type
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::mock::{MockBackend, MockProvider};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use poolwatch_core::PoolEnv;
    use tower::ServiceExt;

    #[test]
    fn default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr.port(), 3030);
        assert!(!config.cors_permissive);
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let manager = PoolManager::new(
            MockBackend::default(),
            Arc::new(MockProvider::default()),
            PoolEnv::default(),
        );
        let app = build_router(Arc::new(AppState::new(manager)), &ServerConfig::default());

        let response = app
            .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
