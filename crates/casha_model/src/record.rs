//! Local records and their sync state.

use crate::domain::Domain;
use crate::id::{LocalId, RemoteId};
use crate::payload::Payload;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a record stands relative to the backend.
///
/// The remote id travels inside the variants that require one, so a
/// `Synced` record without a remote id cannot be built.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SyncState {
    /// Local and remote agree.
    Synced {
        /// Backend identifier.
        remote_id: RemoteId,
    },
    /// Created locally, never acknowledged by the backend.
    PendingCreate,
    /// Edited locally after it was synced.
    PendingUpdate {
        /// Backend identifier.
        remote_id: RemoteId,
    },
    /// Deleted locally, delete not yet acknowledged.
    PendingDelete {
        /// Backend identifier.
        remote_id: RemoteId,
    },
}

impl SyncState {
    /// Returns the remote id, if the backend knows this record.
    pub fn remote_id(&self) -> Option<&RemoteId> {
        match self {
            SyncState::Synced { remote_id }
            | SyncState::PendingUpdate { remote_id }
            | SyncState::PendingDelete { remote_id } => Some(remote_id),
            SyncState::PendingCreate => None,
        }
    }

    /// Returns true if a local change still has to be pushed.
    pub fn is_dirty(&self) -> bool {
        !matches!(self, SyncState::Synced { .. })
    }

    /// Returns the state without its payload.
    pub fn kind(&self) -> SyncStateKind {
        match self {
            SyncState::Synced { .. } => SyncStateKind::Synced,
            SyncState::PendingCreate => SyncStateKind::PendingCreate,
            SyncState::PendingUpdate { .. } => SyncStateKind::PendingUpdate,
            SyncState::PendingDelete { .. } => SyncStateKind::PendingDelete,
        }
    }
}

/// Discriminant of [`SyncState`], for logging and counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStateKind {
    /// See [`SyncState::Synced`].
    Synced,
    /// See [`SyncState::PendingCreate`].
    PendingCreate,
    /// See [`SyncState::PendingUpdate`].
    PendingUpdate,
    /// See [`SyncState::PendingDelete`].
    PendingDelete,
}

impl fmt::Display for SyncStateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SyncStateKind::Synced => "synced",
            SyncStateKind::PendingCreate => "pending_create",
            SyncStateKind::PendingUpdate => "pending_update",
            SyncStateKind::PendingDelete => "pending_delete",
        })
    }
}

/// A record as held by the local store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Device-assigned primary key.
    pub local_id: LocalId,
    /// Domain content.
    pub payload: Payload,
    /// Last modification time (local edit or adopted server time).
    pub updated_at: DateTime<Utc>,
    /// Position relative to the backend.
    pub sync_state: SyncState,
    /// Last client-side rejection reported by the backend, if unresolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unresolved: Option<String>,
}

impl Record {
    /// Creates a record that has never been pushed.
    pub fn pending_create(payload: Payload, updated_at: DateTime<Utc>) -> Self {
        Self {
            local_id: LocalId::new(),
            payload,
            updated_at,
            sync_state: SyncState::PendingCreate,
            unresolved: None,
        }
    }

    /// Creates a synced record from the backend's copy.
    pub fn from_remote(remote: RemoteRecord) -> Self {
        Self {
            local_id: LocalId::new(),
            payload: remote.payload,
            updated_at: remote.updated_at,
            sync_state: SyncState::Synced {
                remote_id: remote.remote_id,
            },
            unresolved: None,
        }
    }

    /// Returns the domain of the payload.
    pub fn domain(&self) -> Domain {
        self.payload.domain()
    }

    /// Returns the remote id, if any.
    pub fn remote_id(&self) -> Option<&RemoteId> {
        self.sync_state.remote_id()
    }

    /// Returns true if the record has an unpushed change.
    pub fn is_dirty(&self) -> bool {
        self.sync_state.is_dirty()
    }

    /// Returns true if the record is a delete tombstone.
    pub fn is_tombstone(&self) -> bool {
        matches!(self.sync_state, SyncState::PendingDelete { .. })
    }

    /// Returns this record adopted from the backend's canonical copy.
    ///
    /// The local id is kept; payload, timestamp and state come from the server.
    pub fn adopt_remote(&self, remote: RemoteRecord) -> Self {
        Self {
            local_id: self.local_id,
            payload: remote.payload,
            updated_at: remote.updated_at,
            sync_state: SyncState::Synced {
                remote_id: remote.remote_id,
            },
            unresolved: None,
        }
    }
}

/// A record as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteRecord {
    /// Backend identifier.
    pub remote_id: RemoteId,
    /// Canonical content.
    pub payload: Payload,
    /// Server-side modification time.
    pub updated_at: DateTime<Utc>,
}

impl RemoteRecord {
    /// Creates a remote record.
    pub fn new(remote_id: impl Into<RemoteId>, payload: Payload, updated_at: DateTime<Utc>) -> Self {
        Self {
            remote_id: remote_id.into(),
            payload,
            updated_at,
        }
    }

    /// Returns the domain of the payload.
    pub fn domain(&self) -> Domain {
        self.payload.domain()
    }
}
