//! MySQL pool handle backed by sqlx
//!
//! Connections are opened lazily: building the pool never touches the
//! network, the first acquire does.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use poolwatch_core::{ConnectionSettings, PoolEnv, SqlParam};
use sqlx::mysql::{
    MySql, MySqlArguments, MySqlConnectOptions, MySqlPoolOptions, MySqlRow, MySqlSslMode,
};
use sqlx::pool::PoolConnection;
use sqlx::query::Query;
use sqlx::{Connection, MySqlPool, Row};

use super::backend::{ConnectionLease, DatabasePool, DbError, PoolBackend, StatusVariable};

/// Counters reported by the metrics endpoint
const POOL_STATUS_SQL: &str = "SHOW STATUS WHERE Variable_name IN \
     ('Threads_connected', 'Threads_running', 'Max_used_connections')";

/// Builds [`MySqlDatabase`] handles
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlBackend;

impl PoolBackend for MySqlBackend {
    type Pool = MySqlDatabase;

    fn build(&self, settings: &ConnectionSettings, env: &PoolEnv) -> Result<MySqlDatabase, DbError> {
        let options = connect_options(settings, env);
        let pool = MySqlPoolOptions::new()
            .max_connections(env.max_connections)
            .acquire_timeout(env.connect_timeout)
            .connect_lazy_with(options);

        tracing::debug!(
            host = %settings.host,
            port = settings.port,
            database = %settings.database,
            max_connections = env.max_connections,
            queue_limit = env.queue_limit,
            "mysql pool configured"
        );

        Ok(MySqlDatabase::new(pool, env.max_connections, env.queue_limit))
    }
}

fn connect_options(settings: &ConnectionSettings, env: &PoolEnv) -> MySqlConnectOptions {
    // Certificates are only verified in production; other environments
    // still encrypt but accept self-signed servers.
    let ssl_mode = match (settings.ssl, env.is_production()) {
        (false, _) => MySqlSslMode::Disabled,
        (true, true) => MySqlSslMode::VerifyIdentity,
        (true, false) => MySqlSslMode::Required,
    };

    MySqlConnectOptions::new()
        .host(&settings.host)
        .port(settings.port)
        .username(&settings.username)
        .password(&settings.password)
        .database(&settings.database)
        .charset(&env.charset)
        .ssl_mode(ssl_mode)
}

/// Live MySQL pool handle
#[derive(Debug, Clone)]
pub struct MySqlDatabase {
    pool: MySqlPool,
    connection_limit: u32,
    queue: RequestQueue,
}

impl MySqlDatabase {
    pub fn new(pool: MySqlPool, connection_limit: u32, queue_limit: usize) -> Self {
        Self {
            pool,
            connection_limit,
            queue: RequestQueue::new(connection_limit as usize, queue_limit),
        }
    }

    /// The underlying sqlx pool
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

#[async_trait]
impl DatabasePool for MySqlDatabase {
    type Lease = MySqlLease;
    type Rows = Vec<MySqlRow>;

    async fn acquire(&self) -> Result<MySqlLease, DbError> {
        let ticket = self.queue.enter()?;
        let conn = self.pool.acquire().await?;
        Ok(MySqlLease {
            conn,
            _ticket: ticket,
        })
    }

    async fn query(&self, sql: &str, params: &[SqlParam]) -> Result<Vec<MySqlRow>, DbError> {
        let _ticket = self.queue.enter()?;
        let query = params
            .iter()
            .fold(sqlx::query(sql), |query, param| bind_param(query, param));
        Ok(query.fetch_all(&self.pool).await?)
    }

    async fn status(&self) -> Result<Vec<StatusVariable>, DbError> {
        let _ticket = self.queue.enter()?;
        // SHOW statements go over the text protocol
        let rows = sqlx::raw_sql(POOL_STATUS_SQL).fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| -> Result<StatusVariable, DbError> {
                Ok(StatusVariable {
                    name: row.try_get(0)?,
                    value: row.try_get(1)?,
                })
            })
            .collect()
    }

    fn connection_limit(&self) -> u32 {
        self.connection_limit
    }

    async fn close(&self) -> Result<(), DbError> {
        self.pool.close().await;
        Ok(())
    }
}

fn bind_param<'q>(
    query: Query<'q, MySql, MySqlArguments>,
    param: &'q SqlParam,
) -> Query<'q, MySql, MySqlArguments> {
    match param {
        SqlParam::Null => query.bind(None::<String>),
        SqlParam::Bool(v) => query.bind(*v),
        SqlParam::Int(v) => query.bind(*v),
        SqlParam::UInt(v) => query.bind(*v),
        SqlParam::Float(v) => query.bind(*v),
        SqlParam::Text(v) => query.bind(v.as_str()),
        SqlParam::Bytes(v) => query.bind(v.as_slice()),
    }
}

/// A pooled MySQL connection
pub struct MySqlLease {
    conn: PoolConnection<MySql>,
    _ticket: QueueTicket,
}

#[async_trait]
impl ConnectionLease for MySqlLease {
    async fn ping(&mut self) -> Result<(), DbError> {
        self.conn.ping().await?;
        Ok(())
    }
}

/// Bounds the number of requests that may wait for a connection.
///
/// Every acquire or query holds a ticket until it finishes, so the number
/// of outstanding tickets is "connections in use + requests queued".
/// A queue limit of 0 means no bound.
#[derive(Debug, Clone)]
struct RequestQueue {
    outstanding: Arc<AtomicUsize>,
    connection_limit: usize,
    queue_limit: usize,
}

impl RequestQueue {
    fn new(connection_limit: usize, queue_limit: usize) -> Self {
        Self {
            outstanding: Arc::new(AtomicUsize::new(0)),
            connection_limit,
            queue_limit,
        }
    }

    fn enter(&self) -> Result<QueueTicket, DbError> {
        if self.queue_limit == 0 {
            self.outstanding.fetch_add(1, Ordering::SeqCst);
        } else {
            let max = self.connection_limit.saturating_add(self.queue_limit);
            self.outstanding
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                    (n < max).then_some(n + 1)
                })
                .map_err(|_| DbError::QueueFull {
                    limit: self.queue_limit,
                })?;
        }

        Ok(QueueTicket {
            outstanding: Arc::clone(&self.outstanding),
        })
    }

    #[cfg(test)]
    fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
struct QueueTicket {
    outstanding: Arc<AtomicUsize>,
}

impl Drop for QueueTicket {
    fn drop(&mut self) {
        self.outstanding.fetch_sub(1, Ordering::SeqCst);
    }
}
