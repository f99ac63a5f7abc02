// Queue Domain Model
//
// The data that describes a queue: its identity, its tunable options, the
// six KV keys it owns, and the status vocabulary AddJob reports.

use std::time::Duration;

/// Queue identifier.
pub type QueueId = String;

/// Outcome reported by `Queue::add_job`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmitStatus {
    /// The id was new to `committed`; it was pushed to `queued`.
    Added,
    /// The id was already committed but not yet dispatched to a worker.
    Committed,
    /// The id is currently held by a worker.
    Processing,
}

/// Queue-local configuration: concurrency, job timeout, and jam-scan cadence.
#[derive(Debug, Clone)]
pub struct QueueOptions {
    /// Max in-flight jobs this convoy runs concurrently for this queue.
    pub concurrent_workers: usize,
    /// Seconds a single job may occupy a Worker before it's failed with "timeout".
    pub job_timeout: Option<Duration>,
    /// Seconds between jam scans when a JamGuard is installed.
    pub jam_guard_interval: Option<Duration>,
}

impl Default for QueueOptions {
    fn default() -> Self {
        Self {
            concurrent_workers: 1,
            job_timeout: None,
            jam_guard_interval: None,
        }
    }
}

impl QueueOptions {
    pub fn new(concurrent_workers: usize) -> Self {
        Self {
            concurrent_workers,
            ..Default::default()
        }
    }

    pub fn with_job_timeout(mut self, timeout: Duration) -> Self {
        self.job_timeout = Some(timeout);
        self
    }

    pub fn with_jam_guard_interval(mut self, interval: Duration) -> Self {
        self.jam_guard_interval = Some(interval);
        self
    }
}

/// The six KV keys a queue named `N` owns under a shared prefix `P`.
#[derive(Debug, Clone)]
pub struct QueueKeys {
    pub committed: String,
    pub queued: String,
    pub processing: String,
    pub failed: String,
    error_log_prefix: String,
}

impl QueueKeys {
    pub fn new(prefix: &str, name: &str) -> Self {
        Self {
            committed: format!("{prefix}:{name}:committed"),
            queued: format!("{prefix}:{name}:queued"),
            processing: format!("{prefix}:{name}:processing"),
            failed: format!("{prefix}:{name}:failed"),
            error_log_prefix: format!("{prefix}:{name}:errorLog"),
        }
    }

    /// Key for the error log bucket covering the UTC day starting at `day_start`.
    pub fn error_log(&self, day_start: i64) -> String {
        format!("{}.{}", self.error_log_prefix, day_start)
    }
}
