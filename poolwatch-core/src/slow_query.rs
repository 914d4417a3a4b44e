//! Slow-query recorder
//!
//! Keeps the most recent slow queries in a bounded FIFO and derives
//! aggregate statistics on demand. Records are truncated on the way in,
//! so a pathological statement never grows the buffer past its bounds.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::param::SqlParam;
use crate::truncate::{truncate_chars, truncate_slice, MAX_PARAMS_LOGGED, MAX_SQL_LOG_LENGTH};

/// Queries at or above this duration are recorded
pub const SLOW_QUERY_THRESHOLD_MS: u64 = 1000;

/// Capacity of the slow-query ring buffer
pub const MAX_SLOW_QUERIES: usize = 100;

/// Number of records returned as "recent" in statistics
pub const RECENT_SLOW_QUERIES: usize = 10;

/// One slow query, truncated for storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryMetric {
    pub sql: String,
    pub duration_ms: u64,
    pub params: Option<Vec<SqlParam>>,
    pub timestamp: DateTime<Utc>,
}

impl QueryMetric {
    /// Build a record, applying the SQL and parameter bounds
    pub fn new(
        sql: &str,
        duration_ms: u64,
        params: Option<&[SqlParam]>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            sql: truncate_chars(sql, MAX_SQL_LOG_LENGTH).to_string(),
            duration_ms,
            params: params.map(|p| truncate_slice(p, MAX_PARAMS_LOGGED).to_vec()),
            timestamp,
        }
    }
}

/// Aggregates over the current buffer contents
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryStatistics {
    /// Number of slow queries currently held
    pub count: usize,
    /// Mean duration, rounded to the nearest millisecond (0 if empty)
    pub avg_duration_ms: u64,
    /// Longest duration (0 if empty)
    pub max_duration_ms: u64,
    /// Last few records, oldest first
    pub recent: Vec<QueryMetric>,
}

/// Bounded, insertion-ordered store of slow queries
#[derive(Debug)]
pub struct SlowQueryLog {
    entries: Mutex<VecDeque<QueryMetric>>,
    capacity: usize,
}

impl Default for SlowQueryLog {
    fn default() -> Self {
        Self::new()
    }
}

impl SlowQueryLog {
    pub fn new() -> Self {
        Self::with_capacity(MAX_SLOW_QUERIES)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity + 1)),
            capacity,
        }
    }

    /// Append a record, evicting the oldest once over capacity
    pub fn record(&self, metric: QueryMetric) {
        let mut entries = self.entries.lock();
        entries.push_back(metric);
        while entries.len() > self.capacity {
            entries.pop_front();
        }
    }

    pub fn statistics(&self) -> QueryStatistics {
        let entries = self.entries.lock();
        if entries.is_empty() {
            return QueryStatistics::default();
        }

        let total: u128 = entries.iter().map(|m| u128::from(m.duration_ms)).sum();
        let mean = total as f64 / entries.len() as f64;
        let max = entries.iter().map(|m| m.duration_ms).max().unwrap_or(0);
        let skip = entries.len().saturating_sub(RECENT_SLOW_QUERIES);

        QueryStatistics {
            count: entries.len(),
            avg_duration_ms: mean.round() as u64,
            max_duration_ms: max,
            recent: entries.iter().skip(skip).cloned().collect(),
        }
    }

    /// Drop every record
    pub fn clear(&self) {
        self.entries.lock().clear();
        tracing::info!("slow query history cleared");
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Copy of every record, oldest first
    pub fn snapshot(&self) -> Vec<QueryMetric> {
        self.entries.lock().iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metric(sql: &str, duration_ms: u64) -> QueryMetric {
        QueryMetric::new(sql, duration_ms, None, Utc::now())
    }

    #[test]
    fn empty_log_statistics() {
        let log = SlowQueryLog::new();
        let stats = log.statistics();

        assert_eq!(stats.count, 0);
        assert_eq!(stats.avg_duration_ms, 0);
        assert_eq!(stats.max_duration_ms, 0);
        assert!(stats.recent.is_empty());
    }

    #[test]
    fn evicts_oldest_past_capacity() {
        let log = SlowQueryLog::new();
        for i in 0..150u64 {
            log.record(metric(&format!("SELECT {}", i), 1000 + i));
        }

        let entries = log.snapshot();
        assert_eq!(entries.len(), MAX_SLOW_QUERIES);
        assert_eq!(entries.first().unwrap().sql, "SELECT 50");
        assert_eq!(entries.last().unwrap().sql, "SELECT 149");
        assert!(entries
            .windows(2)
            .all(|pair| pair[0].duration_ms + 1 == pair[1].duration_ms));
    }

    #[test]
    fn statistics_round_mean_and_keep_last_ten() {
        let log = SlowQueryLog::new();
        for (i, duration) in [1000u64, 1001, 1500, 2500, 1200, 1000, 1000, 1000, 1000, 1000, 1001, 3000]
            .into_iter()
            .enumerate()
        {
            log.record(metric(&format!("q{}", i), duration));
        }

        let stats = log.statistics();
        assert_eq!(stats.count, 12);
        // 16202 / 12 = 1350.17
        assert_eq!(stats.avg_duration_ms, 1350);
        assert_eq!(stats.max_duration_ms, 3000);
        assert_eq!(stats.recent.len(), RECENT_SLOW_QUERIES);
        assert_eq!(stats.recent[0].sql, "q2");
        assert_eq!(stats.recent[9].sql, "q11");
    }

    #[test]
    fn mean_rounds_half_up() {
        let log = SlowQueryLog::new();
        log.record(metric("a", 1000));
        log.record(metric("b", 1001));
        assert_eq!(log.statistics().avg_duration_ms, 1001);
    }

    #[test]
    fn clear_resets_statistics() {
        let log = SlowQueryLog::new();
        log.record(metric("SELECT SLEEP(2)", 2000));
        log.clear();

        assert!(log.is_empty());
        assert_eq!(log.statistics(), QueryStatistics::default());
    }

    #[test]
    fn long_sql_is_truncated_to_limit() {
        let sql = "S".repeat(600);
        let m = QueryMetric::new(&sql, 1200, None, Utc::now());
        assert_eq!(m.sql.chars().count(), MAX_SQL_LOG_LENGTH);
    }

    #[test]
    fn params_keep_first_ten() {
        let params: Vec<SqlParam> = (0..15i64).map(SqlParam::from).collect();
        let m = QueryMetric::new("SELECT ?", 1200, Some(&params), Utc::now());

        let kept = m.params.unwrap();
        assert_eq!(kept.len(), MAX_PARAMS_LOGGED);
        assert_eq!(kept, params[..10].to_vec());
    }
}
