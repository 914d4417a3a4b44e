//! In-memory pool used by unit tests

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use poolwatch_core::{ConfigError, ConfigProvider, ConnectionSettings, PoolEnv, SqlParam};

use super::backend::{ConnectionLease, DatabasePool, DbError, PoolBackend, StatusVariable};

/// Failure switches and call counters shared by a mock pool and its leases
#[derive(Debug, Default)]
pub(crate) struct MockControls {
    pub acquire_fails: AtomicBool,
    pub ping_fails: AtomicBool,
    pub query_fails: AtomicBool,
    pub status_fails: AtomicBool,
    pub close_fails: AtomicBool,
    pub acquires: AtomicUsize,
    pub releases: AtomicUsize,
    pub queries: AtomicUsize,
    pub closes: AtomicUsize,
}

impl MockControls {
    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub(crate) struct MockPool {
    pub id: usize,
    pub controls: Arc<MockControls>,
    pub query_delay: Duration,
    pub limit: u32,
}

impl MockPool {
    pub fn new(query_delay: Duration) -> Self {
        Self {
            id: 0,
            controls: Arc::new(MockControls::default()),
            query_delay,
            limit: 10,
        }
    }
}

#[derive(Debug)]
pub(crate) struct MockLease {
    controls: Arc<MockControls>,
}

#[async_trait]
impl ConnectionLease for MockLease {
    async fn ping(&mut self) -> Result<(), DbError> {
        if self.controls.ping_fails.load(Ordering::SeqCst) {
            return Err(DbError::Backend("server has gone away".into()));
        }
        Ok(())
    }
}

impl Drop for MockLease {
    fn drop(&mut self) {
        self.controls.releases.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl DatabasePool for MockPool {
    type Lease = MockLease;
    type Rows = Vec<String>;

    async fn acquire(&self) -> Result<MockLease, DbError> {
        if self.controls.acquire_fails.load(Ordering::SeqCst) {
            return Err(DbError::Backend("connect ECONNREFUSED".into()));
        }
        self.controls.acquires.fetch_add(1, Ordering::SeqCst);
        Ok(MockLease {
            controls: Arc::clone(&self.controls),
        })
    }

    async fn query(&self, sql: &str, params: &[SqlParam]) -> Result<Vec<String>, DbError> {
        self.controls.queries.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.query_delay).await;
        if self.controls.query_fails.load(Ordering::SeqCst) {
            return Err(DbError::Backend("syntax error".into()));
        }
        Ok(vec![format!("{} ({} params)", sql, params.len())])
    }

    async fn status(&self) -> Result<Vec<StatusVariable>, DbError> {
        if self.controls.status_fails.load(Ordering::SeqCst) {
            return Err(DbError::Backend("access denied".into()));
        }
        Ok(vec![StatusVariable {
            name: "Threads_connected".into(),
            value: "3".into(),
        }])
    }

    fn connection_limit(&self) -> u32 {
        self.limit
    }

    async fn close(&self) -> Result<(), DbError> {
        self.controls.closes.fetch_add(1, Ordering::SeqCst);
        if self.controls.close_fails.load(Ordering::SeqCst) {
            return Err(DbError::Backend("close failed".into()));
        }
        Ok(())
    }
}

/// Hands out mock pools that all share one set of controls
#[derive(Debug, Default)]
pub(crate) struct MockBackend {
    pub controls: Arc<MockControls>,
    pub builds: Arc<AtomicUsize>,
    pub build_fails: Arc<AtomicBool>,
}

impl PoolBackend for MockBackend {
    type Pool = MockPool;

    fn build(&self, _settings: &ConnectionSettings, env: &PoolEnv) -> Result<MockPool, DbError> {
        if self.build_fails.load(Ordering::SeqCst) {
            return Err(DbError::Backend("invalid connection options".into()));
        }
        let id = self.builds.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(MockPool {
            id,
            controls: Arc::clone(&self.controls),
            query_delay: Duration::ZERO,
            limit: env.max_connections,
        })
    }
}

/// Config provider that can be switched between success and failure
#[derive(Debug, Default)]
pub(crate) struct MockProvider {
    pub fails: AtomicBool,
    pub loads: AtomicUsize,
}

impl MockProvider {
    pub fn failing() -> Self {
        Self {
            fails: AtomicBool::new(true),
            loads: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ConfigProvider for MockProvider {
    async fn load(&self) -> poolwatch_core::Result<ConnectionSettings> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.fails.load(Ordering::SeqCst) {
            return Err(ConfigError::other("no persisted database configuration"));
        }
        Ok(ConnectionSettings {
            host: "localhost".into(),
            port: 3306,
            username: "app".into(),
            password: String::new(),
            database: "app".into(),
            ssl: false,
        })
    }
}
