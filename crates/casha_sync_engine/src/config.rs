//! Configuration for the sync engine.

use std::time::Duration;

/// Configuration for sync runs.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Upper bound on a single gateway call. Exceeding it is a per-record timeout.
    pub call_timeout: Duration,
    /// How many times a push result is re-decided when the record changed
    /// underneath it before the record is reported as failed. Values below
    /// 1 are treated as 1.
    pub max_write_attempts: usize,
}

impl SyncConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self {
            call_timeout: Duration::from_secs(30),
            max_write_attempts: 3,
        }
    }

    /// Sets the per-call timeout.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Sets the write-back attempt bound. Values below 1 are raised to 1.
    pub fn with_max_write_attempts(mut self, attempts: usize) -> Self {
        self.max_write_attempts = attempts.max(1);
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}
