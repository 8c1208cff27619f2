//! Sync sessions and their results.

use crate::error::SyncError;
use casha_model::{Domain, LocalId, SyncStateKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Terminal status of a sync run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Every dirty record was pushed and the pull succeeded.
    Completed,
    /// The run finished, but some records failed, the pull failed or the
    /// local store broke.
    PartiallyFailed,
    /// The run stopped early (connectivity lost or cancelled).
    Aborted,
}

/// One record that could not be pushed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFailure {
    /// The record.
    pub local_id: LocalId,
    /// The pending operation that failed.
    pub operation: SyncStateKind,
    /// Why it failed.
    pub error: SyncError,
}

/// Counters from the pull phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullSummary {
    /// Remote records inserted locally.
    pub inserted: usize,
    /// Synced local records overwritten with newer remote data.
    pub updated: usize,
    /// Synced local records removed because the backend no longer has them.
    pub deleted: usize,
    /// Remote records ignored (dirty local copy or wrong domain).
    pub skipped: usize,
}

/// Summary of one coordinator run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncSessionResult {
    /// The domain synced.
    pub domain: Domain,
    /// Run number within the coordinator, starting at 1.
    pub session_id: u64,
    /// Terminal status.
    pub status: SessionStatus,
    /// Dirty records the push phase tried.
    pub attempted: usize,
    /// Records pushed successfully.
    pub succeeded: usize,
    /// Records that failed.
    pub failed: usize,
    /// Per-record failures.
    pub failures: Vec<RecordFailure>,
    /// Pull-phase counters, if the pull phase completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull: Option<PullSummary>,
    /// Run-level error (abort cause, pull failure or store failure).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<SyncError>,
    /// Start time.
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration.
    pub duration: Duration,
}

impl SyncSessionResult {
    /// Returns true if the run completed without any failure.
    pub fn is_success(&self) -> bool {
        self.status == SessionStatus::Completed
    }

    /// Creates an empty aborted result.
    pub fn aborted(domain: Domain, session_id: u64, error: SyncError) -> Self {
        Self {
            domain,
            session_id,
            status: SessionStatus::Aborted,
            attempted: 0,
            succeeded: 0,
            failed: 0,
            failures: Vec::new(),
            pull: None,
            error: Some(error),
            started_at: Utc::now(),
            duration: Duration::ZERO,
        }
    }
}

/// An in-progress run. Never persisted.
#[derive(Debug)]
pub(crate) struct SyncSession {
    pub(crate) domain: Domain,
    pub(crate) session_id: u64,
    started_at: DateTime<Utc>,
    started: Instant,
    attempted: usize,
    succeeded: usize,
    failures: Vec<RecordFailure>,
    pull: Option<PullSummary>,
    abort: Option<SyncError>,
    error: Option<SyncError>,
}

impl SyncSession {
    pub(crate) fn start(domain: Domain, session_id: u64) -> Self {
        Self {
            domain,
            session_id,
            started_at: Utc::now(),
            started: Instant::now(),
            attempted: 0,
            succeeded: 0,
            failures: Vec::new(),
            pull: None,
            abort: None,
            error: None,
        }
    }

    pub(crate) fn record_attempt(&mut self) {
        self.attempted += 1;
    }

    pub(crate) fn record_success(&mut self) {
        self.succeeded += 1;
    }

    pub(crate) fn record_failure(&mut self, failure: RecordFailure) {
        self.failures.push(failure);
    }

    pub(crate) fn set_pull(&mut self, pull: PullSummary) {
        self.pull = Some(pull);
    }

    /// Marks the run as stopped early.
    pub(crate) fn abort(&mut self, error: SyncError) {
        self.abort = Some(error);
    }

    /// Marks the run as failed at run level without aborting it.
    pub(crate) fn fail(&mut self, error: SyncError) {
        self.error = Some(error);
    }

    pub(crate) fn is_aborted(&self) -> bool {
        self.abort.is_some()
    }

    pub(crate) fn is_failed(&self) -> bool {
        self.error.is_some()
    }

    pub(crate) fn finish(self) -> SyncSessionResult {
        let (status, error) = match (self.abort, self.error) {
            (Some(abort), _) => (SessionStatus::Aborted, Some(abort)),
            (None, Some(error)) => (SessionStatus::PartiallyFailed, Some(error)),
            (None, None) if !self.failures.is_empty() => (SessionStatus::PartiallyFailed, None),
            (None, None) => (SessionStatus::Completed, None),
        };

        SyncSessionResult {
            domain: self.domain,
            session_id: self.session_id,
            status,
            attempted: self.attempted,
            succeeded: self.succeeded,
            failed: self.failures.len(),
            failures: self.failures,
            pull: self.pull,
            error,
            started_at: self.started_at,
            duration: self.started.elapsed(),
        }
    }
}
