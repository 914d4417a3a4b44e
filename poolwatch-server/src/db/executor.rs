//! Instrumented query execution
//!
//! Times each statement, records slow ones into the shared
//! [`SlowQueryLog`] and logs failures. Results and errors are passed
//! through untouched.

use std::sync::Arc;

use chrono::Utc;
use poolwatch_core::truncate::{
    truncate_chars, DEBUG_SQL_PREVIEW, PARAMS_LOG_PREVIEW, SQL_LOG_PREVIEW,
};
use poolwatch_core::{PoolEnv, QueryMetric, SlowQueryLog, SqlParam, SLOW_QUERY_THRESHOLD_MS};
use tokio::time::Instant;

use super::backend::{DatabasePool, DbError};

/// Query logging switches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryLogSettings {
    /// Record and warn about slow queries
    pub slow_queries: bool,
    /// Log every query at debug level
    pub debug_queries: bool,
}

impl QueryLogSettings {
    /// Debug logging is never enabled in production
    pub fn from_env(env: &PoolEnv) -> Self {
        Self {
            slow_queries: env.log_slow_queries,
            debug_queries: env.debug_queries && !env.is_production(),
        }
    }
}

impl Default for QueryLogSettings {
    fn default() -> Self {
        Self {
            slow_queries: true,
            debug_queries: false,
        }
    }
}

/// Runs queries against a pool with timing and slow-query capture
#[derive(Debug, Clone)]
pub struct QueryExecutor {
    slow_queries: Arc<SlowQueryLog>,
    settings: QueryLogSettings,
}

impl QueryExecutor {
    pub fn new(slow_queries: Arc<SlowQueryLog>, settings: QueryLogSettings) -> Self {
        Self {
            slow_queries,
            settings,
        }
    }

    pub fn slow_queries(&self) -> &Arc<SlowQueryLog> {
        &self.slow_queries
    }

    /// Execute `sql` on `pool`, returning the driver's rows unchanged.
    pub async fn execute<P: DatabasePool>(
        &self,
        pool: &P,
        sql: &str,
        params: Option<&[SqlParam]>,
    ) -> Result<P::Rows, DbError> {
        let started = Instant::now();
        let timestamp = Utc::now();

        let result = pool.query(sql, params.unwrap_or_default()).await;
        let duration_ms = elapsed_ms(started);

        match result {
            Ok(rows) => {
                if self.settings.slow_queries && duration_ms >= SLOW_QUERY_THRESHOLD_MS {
                    self.slow_queries
                        .record(QueryMetric::new(sql, duration_ms, params, timestamp));

                    tracing::warn!(
                        duration_ms,
                        sql = %truncate_chars(sql, SQL_LOG_PREVIEW),
                        params = %params.map(params_preview).unwrap_or_default(),
                        "slow query"
                    );
                }

                if self.settings.debug_queries {
                    tracing::debug!(
                        duration_ms,
                        sql = %truncate_chars(sql, DEBUG_SQL_PREVIEW),
                        "query"
                    );
                }

                Ok(rows)
            }
            Err(err) => {
                tracing::error!(
                    duration_ms,
                    sql = %truncate_chars(sql, SQL_LOG_PREVIEW),
                    error = %err,
                    "query failed"
                );
                Err(err)
            }
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn params_preview(params: &[SqlParam]) -> String {
    serde_json::to_string(params)
        .map(|json| truncate_chars(&json, PARAMS_LOG_PREVIEW).to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::mock::{MockControls, MockPool};
    use poolwatch_core::truncate::{MAX_PARAMS_LOGGED, MAX_SQL_LOG_LENGTH};
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    fn executor() -> QueryExecutor {
        QueryExecutor::new(Arc::new(SlowQueryLog::new()), QueryLogSettings::default())
    }

    #[tokio::test(start_paused = true)]
    async fn fast_query_is_not_recorded() {
        let exec = executor();
        let pool = MockPool::new(Duration::from_millis(999));

        let rows = exec.execute(&pool, "SELECT 1", None).await.unwrap();

        assert_eq!(rows, vec!["SELECT 1 (0 params)".to_string()]);
        assert!(exec.slow_queries().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn query_at_threshold_is_recorded() {
        let exec = executor();
        let pool = MockPool::new(Duration::from_millis(SLOW_QUERY_THRESHOLD_MS));

        exec.execute(&pool, "SELECT SLEEP(1)", None).await.unwrap();

        let recorded = exec.slow_queries().snapshot();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].sql, "SELECT SLEEP(1)");
        assert!(recorded[0].duration_ms >= SLOW_QUERY_THRESHOLD_MS);
        assert!(recorded[0].params.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_failure_is_returned_and_not_recorded() {
        let exec = executor();
        let pool = MockPool::new(Duration::from_millis(1500));
        pool.controls.query_fails.store(true, Ordering::SeqCst);

        let err = exec.execute(&pool, "SELEC 1", None).await.unwrap_err();

        assert_eq!(err.to_string(), "syntax error");
        assert!(exec.slow_queries().is_empty());
        assert_eq!(MockControls::count(&pool.controls.queries), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn fast_failure_is_not_recorded() {
        let exec = executor();
        let pool = MockPool::new(Duration::from_millis(5));
        pool.controls.query_fails.store(true, Ordering::SeqCst);

        assert!(exec.execute(&pool, "SELECT nope", None).await.is_err());
        assert!(exec.slow_queries().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn recorded_sql_and_params_are_truncated() {
        let exec = executor();
        let pool = MockPool::new(Duration::from_millis(2000));
        let sql = format!("SELECT * FROM t WHERE id IN ({})", "?, ".repeat(200));
        assert!(sql.chars().count() > 600);
        let params: Vec<SqlParam> = (0..15i64).map(SqlParam::from).collect();

        exec.execute(&pool, &sql, Some(&params)).await.unwrap();

        let recorded = exec.slow_queries().snapshot();
        assert_eq!(recorded[0].sql.chars().count(), MAX_SQL_LOG_LENGTH);
        assert!(sql.starts_with(&recorded[0].sql));
        assert_eq!(
            recorded[0].params.as_deref(),
            Some(&params[..MAX_PARAMS_LOGGED])
        );
    }

    #[tokio::test(start_paused = true)]
    async fn all_params_reach_the_driver() {
        let exec = executor();
        let pool = MockPool::new(Duration::ZERO);
        let params: Vec<SqlParam> = (0..15i64).map(SqlParam::from).collect();

        let rows = exec.execute(&pool, "CALL p()", Some(&params)).await.unwrap();
        assert_eq!(rows, vec!["CALL p() (15 params)".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_logging_skips_recording() {
        let settings = QueryLogSettings {
            slow_queries: false,
            debug_queries: false,
        };
        let exec = QueryExecutor::new(Arc::new(SlowQueryLog::new()), settings);
        let pool = MockPool::new(Duration::from_millis(5000));

        exec.execute(&pool, "SELECT SLEEP(5)", None).await.unwrap();
        assert!(exec.slow_queries().is_empty());
    }

    #[test]
    fn debug_queries_are_off_in_production() {
        let env = PoolEnv {
            debug_queries: true,
            environment: "production".into(),
            ..PoolEnv::default()
        };
        assert!(!QueryLogSettings::from_env(&env).debug_queries);

        let env = PoolEnv {
            debug_queries: true,
            ..PoolEnv::default()
        };
        assert!(QueryLogSettings::from_env(&env).debug_queries);
    }

    #[test]
    fn params_preview_is_bounded() {
        let params: Vec<SqlParam> = (0..100i64).map(|i| SqlParam::from(i * 1000)).collect();
        assert_eq!(params_preview(&params).chars().count(), PARAMS_LOG_PREVIEW);
    }
}
