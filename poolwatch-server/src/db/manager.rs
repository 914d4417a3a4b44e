//! Pool lifecycle - at most one live handle, rebuilt from configuration
//!
//! The manager is the only owner of the pool handle. Callers get it through
//! [`PoolManager::current_pool`] (which lazily initializes) or
//! [`PoolManager::pool`] (which never does). Initialization is serialized,
//! so a replacement always closes the handle it replaces.

use std::sync::Arc;

use poolwatch_core::{ConfigError, ConfigProvider, PoolEnv};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;

use super::backend::{DatabasePool, DbError, PoolBackend};

/// Errors surfaced by the pool manager
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("connection pool is not initialized; manual database configuration is required")]
    NotInitialized,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Database(#[from] DbError),
}

/// Owns the process-wide pool handle
pub struct PoolManager<B: PoolBackend> {
    backend: B,
    provider: Arc<dyn ConfigProvider>,
    env: PoolEnv,
    current: RwLock<Option<Arc<B::Pool>>>,
    init_lock: Mutex<()>,
}

impl<B: PoolBackend> PoolManager<B> {
    pub fn new(backend: B, provider: Arc<dyn ConfigProvider>, env: PoolEnv) -> Arc<Self> {
        Arc::new(Self {
            backend,
            provider,
            env,
            current: RwLock::new(None),
            init_lock: Mutex::new(()),
        })
    }

    pub fn env(&self) -> &PoolEnv {
        &self.env
    }

    /// Load configuration and (re)build the pool.
    ///
    /// Never fails: on error the handle is left absent and a warning logged.
    pub async fn initialize(&self) {
        let _guard = self.init_lock.lock().await;

        match self.rebuild().await {
            Ok(()) => tracing::info!(
                max_connections = self.env.max_connections,
                "connection pool initialized"
            ),
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    "connection pool not initialized - manual configuration required"
                );
                let previous = self.current.write().await.take();
                if let Some(previous) = previous {
                    if let Err(err) = previous.close().await {
                        tracing::debug!(error = %err, "ignoring error while closing previous pool");
                    }
                }
            }
        }
    }

    async fn rebuild(&self) -> Result<(), PoolError> {
        let settings = self.provider.load().await?;

        let previous = self.current.write().await.take();
        if let Some(previous) = previous {
            // The old handle is discarded whether or not it closes cleanly
            if let Err(err) = previous.close().await {
                tracing::debug!(error = %err, "ignoring error while closing previous pool");
            }
        }

        let pool = self.backend.build(&settings, &self.env)?;
        *self.current.write().await = Some(Arc::new(pool));
        Ok(())
    }

    /// Start an initialization in the background.
    ///
    /// The returned handle may be awaited or dropped.
    pub fn spawn_initialize(self: &Arc<Self>) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move { manager.initialize().await })
    }

    /// The live handle, if any. Never triggers initialization.
    pub async fn pool(&self) -> Option<Arc<B::Pool>> {
        self.current.read().await.clone()
    }

    /// The live handle, starting a background initialization if absent.
    ///
    /// Does not wait for that initialization: if the handle is still
    /// absent on the immediate re-check, fails with `NotInitialized`.
    pub async fn current_pool(self: &Arc<Self>) -> Result<Arc<B::Pool>, PoolError> {
        if let Some(pool) = self.pool().await {
            return Ok(pool);
        }

        tracing::debug!("pool absent, scheduling background initialization");
        drop(self.spawn_initialize());

        self.pool().await.ok_or(PoolError::NotInitialized)
    }

    /// Like [`Self::current_pool`], but waits for the initialization attempt.
    pub async fn current_pool_or_wait(&self) -> Result<Arc<B::Pool>, PoolError> {
        if let Some(pool) = self.pool().await {
            return Ok(pool);
        }

        self.initialize().await;
        self.pool().await.ok_or(PoolError::NotInitialized)
    }

    /// Close and clear the handle
    pub async fn shutdown(&self) {
        let _guard = self.init_lock.lock().await;
        let previous = self.current.write().await.take();
        if let Some(pool) = previous {
            if let Err(err) = pool.close().await {
                tracing::warn!(error = %err, "error while closing connection pool");
            }
            tracing::info!("connection pool closed");
        }
    }
}
