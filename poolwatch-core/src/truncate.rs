//! Truncation bounds shared by every place that stores or logs SQL.

/// Maximum SQL length kept in a slow-query record
pub const MAX_SQL_LOG_LENGTH: usize = 500;

/// Maximum number of bind parameters kept in a slow-query record
pub const MAX_PARAMS_LOGGED: usize = 10;

/// SQL preview length in warning and error log lines
pub const SQL_LOG_PREVIEW: usize = 200;

/// SQL preview length in the metrics endpoint's recent slow queries
pub const SLOW_QUERY_PREVIEW: usize = 150;

/// SQL preview length in per-query debug lines
pub const DEBUG_SQL_PREVIEW: usize = 100;

/// Length of the serialized bind parameters shown next to a slow query
pub const PARAMS_LOG_PREVIEW: usize = 100;

/// Return at most `max` characters of `s`, never splitting a code point.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Return at most the first `max` items of `items`.
pub fn truncate_slice<T>(items: &[T], max: usize) -> &[T] {
    &items[..items.len().min(max)]
}
