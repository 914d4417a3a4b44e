//! Process uptime and memory figures for the metrics endpoint
//!
//! Uptime counts from the first call to [`mark_process_start`], which the
//! binary makes before anything else.
//!
//! Read from `/proc/self/status` on Linux:
//! - `heap_used`: `RssAnon` (resident anonymous memory)
//! - `heap_total`: `VmData` (data segment + heap mappings)
//! - `rss`: `VmRSS`
//! - `external`: `RssFile` + `RssShmem` (resident file-backed/shared memory)
//!
//! Other platforms report zeros.

use std::io;
use std::time::{Duration, Instant};

use once_cell::sync::Lazy;
use serde::Serialize;

static PROCESS_START: Lazy<Instant> = Lazy::new(Instant::now);

/// Pin the process start instant
pub fn mark_process_start() {
    Lazy::force(&PROCESS_START);
}

/// Time since the process start was pinned
pub fn uptime() -> Duration {
    PROCESS_START.elapsed()
}

/// Memory usage in megabytes, rounded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryUsage {
    pub heap_used: u64,
    pub heap_total: u64,
    pub rss: u64,
    pub external: u64,
}

impl MemoryUsage {
    #[cfg(target_os = "linux")]
    pub fn current() -> io::Result<Self> {
        let status = std::fs::read_to_string("/proc/self/status")?;
        Ok(Self::from_proc_status(&status))
    }

    #[cfg(not(target_os = "linux"))]
    pub fn current() -> io::Result<Self> {
        Ok(Self::default())
    }

    /// Parse the `key: value kB` lines of a proc status file
    pub fn from_proc_status(status: &str) -> Self {
        let kb = |key: &str| -> u64 {
            status
                .lines()
                .find_map(|line| line.strip_prefix(key)?.strip_prefix(':'))
                .and_then(|rest| rest.split_whitespace().next())
                .and_then(|value| value.parse().ok())
                .unwrap_or(0)
        };

        Self {
            heap_used: kb_to_mb(kb("RssAnon")),
            heap_total: kb_to_mb(kb("VmData")),
            rss: kb_to_mb(kb("VmRSS")),
            external: kb_to_mb(kb("RssFile") + kb("RssShmem")),
        }
    }
}

fn kb_to_mb(kb: u64) -> u64 {
    (kb as f64 / 1024.0).round() as u64
}
