//! Reconciliation decisions shared by every domain.
//!
//! Nothing here touches the network or the store. The coordinator feeds in
//! what it read and what the backend answered, and applies the result with
//! compare-and-swap.

use crate::error::SyncError;
use crate::session::PullSummary;
use casha_model::{Domain, Record, RemoteId, RemoteRecord, SyncState};
use std::collections::{HashMap, HashSet};

/// The backend's answer to one pushed record.
#[derive(Debug, Clone)]
pub(crate) enum PushAck {
    /// Create succeeded.
    Created(RemoteRecord),
    /// Update succeeded.
    Updated(RemoteRecord),
    /// Update hit a 404: the entity was deleted upstream.
    GoneUpstream,
    /// Delete succeeded or hit a 404.
    Deleted,
    /// The payload was rejected, locally or remotely.
    Rejected(SyncError),
}

/// What to write for a pushed record.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum WriteBack {
    /// Store this record.
    Replace(Record),
    /// Remove the record.
    Remove,
    /// Leave the record as it is now.
    Leave,
}

/// Decides the write-back for `snapshot` given what is stored now.
///
/// `current` equal to `snapshot` is the normal case. Anything else means a
/// local mutation landed while the request was in flight.
pub(crate) fn resolve_write_back(
    snapshot: &Record,
    current: Option<&Record>,
    ack: &PushAck,
) -> WriteBack {
    if current == Some(snapshot) {
        return match ack {
            PushAck::Created(remote) | PushAck::Updated(remote) => {
                WriteBack::Replace(snapshot.adopt_remote(remote.clone()))
            }
            PushAck::GoneUpstream | PushAck::Deleted => WriteBack::Remove,
            PushAck::Rejected(error) => WriteBack::Replace(Record {
                unresolved: Some(error.to_string()),
                ..snapshot.clone()
            }),
        };
    }

    // Only a create has to be reconciled with a concurrent change: the
    // backend now holds a copy the local side does not know the id of.
    let PushAck::Created(remote) = ack else {
        return WriteBack::Leave;
    };

    match current {
        None => WriteBack::Replace(Record {
            sync_state: SyncState::PendingDelete {
                remote_id: remote.remote_id.clone(),
            },
            unresolved: None,
            ..snapshot.clone()
        }),
        Some(edited) if edited.sync_state == SyncState::PendingCreate => {
            WriteBack::Replace(Record {
                sync_state: SyncState::PendingUpdate {
                    remote_id: remote.remote_id.clone(),
                },
                ..edited.clone()
            })
        }
        Some(_) => WriteBack::Leave,
    }
}

/// One local change derived from the remote list.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PullStep {
    /// A remote record unknown locally.
    Insert(Record),
    /// A synced local record the backend has a newer copy of.
    Update {
        /// The local record as read.
        expected: Record,
        /// The record with the remote copy adopted.
        replacement: Record,
    },
    /// A synced local record the backend no longer has.
    Delete(Record),
}

/// The local changes a pull implies.
#[derive(Debug, Default)]
pub(crate) struct PullPlan {
    pub(crate) steps: Vec<PullStep>,
    pub(crate) skipped: usize,
}

impl PullPlan {
    pub(crate) fn summary(&self) -> PullSummary {
        PullSummary {
            skipped: self.skipped,
            ..PullSummary::default()
        }
    }
}

/// Merges the complete remote list of `domain` into the local records.
///
/// Dirty local records are never touched. Records in `pushed` were
/// acknowledged in this run and are kept even if the list omits them.
pub(crate) fn plan_pull(
    domain: Domain,
    locals: &[Record],
    remotes: Vec<RemoteRecord>,
    pushed: &HashSet<RemoteId>,
) -> PullPlan {
    let by_remote_id: HashMap<&RemoteId, &Record> = locals
        .iter()
        .filter(|record| record.domain() == domain)
        .filter_map(|record| record.remote_id().map(|id| (id, record)))
        .collect();

    let mut plan = PullPlan::default();
    let mut listed: HashSet<RemoteId> = HashSet::new();

    for remote in remotes {
        if remote.domain() != domain {
            tracing::warn!(
                domain = %domain,
                remote_id = %remote.remote_id,
                found = %remote.domain(),
                "skipping remote record of another domain"
            );
            plan.skipped += 1;
            continue;
        }
        if !listed.insert(remote.remote_id.clone()) {
            plan.skipped += 1;
            continue;
        }

        match by_remote_id.get(&remote.remote_id) {
            None => plan.steps.push(PullStep::Insert(Record::from_remote(remote))),
            Some(local) if local.is_dirty() => plan.skipped += 1,
            Some(local) if remote.updated_at > local.updated_at => {
                plan.steps.push(PullStep::Update {
                    expected: (*local).clone(),
                    replacement: local.adopt_remote(remote),
                });
            }
            Some(_) => {}
        }
    }

    for (remote_id, local) in by_remote_id {
        let synced = matches!(local.sync_state, SyncState::Synced { .. });
        if synced && !listed.contains(remote_id) && !pushed.contains(remote_id) {
            plan.steps.push(PullStep::Delete(local.clone()));
        }
    }

    plan
}
