//! Record store trait and local mutations.

use crate::error::{StoreError, StoreResult};
use casha_model::{Domain, LocalId, Payload, Record, RemoteId, SyncState};
use chrono::{DateTime, Utc};

/// How many times a local mutation re-reads a record that changed under it.
const MUTATION_ATTEMPTS: usize = 8;

/// Outcome of [`RecordStore::compare_and_swap`].
#[derive(Debug, Clone, PartialEq)]
pub enum Swap {
    /// The stored value matched and was replaced.
    Applied,
    /// The stored value did not match; carries what is stored now.
    Conflict(Option<Record>),
}

impl Swap {
    /// Returns true if the swap was applied.
    pub fn is_applied(&self) -> bool {
        matches!(self, Swap::Applied)
    }
}

/// Persistent storage of records, partitioned by domain.
///
/// The store owns record persistence. Callers never assume exclusive access:
/// anything that writes back a value computed from an earlier read goes
/// through [`RecordStore::compare_and_swap`].
///
/// # Invariants
///
/// - `get` after a successful `upsert` returns the upserted record
/// - `delete` of an absent record returns `false`, not an error
/// - Implementations must be `Send + Sync`
pub trait RecordStore: Send + Sync {
    /// Returns every record of `domain` whose sync state is not `Synced`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn list_dirty(&self, domain: Domain) -> StoreResult<Vec<Record>>;

    /// Returns every record of `domain`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn list_all(&self, domain: Domain) -> StoreResult<Vec<Record>>;

    /// Looks up a record by local id.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn get(&self, local_id: LocalId) -> StoreResult<Option<Record>>;

    /// Inserts or replaces a record.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn upsert(&self, record: Record) -> StoreResult<()>;

    /// Removes a record. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn delete(&self, local_id: LocalId) -> StoreResult<bool>;

    /// Atomically replaces the record at `local_id` if it equals `expected`.
    ///
    /// `expected = None` means "absent"; `replacement = None` removes it.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails, or if `replacement` carries a
    /// different local id.
    fn compare_and_swap(
        &self,
        local_id: LocalId,
        expected: Option<&Record>,
        replacement: Option<Record>,
    ) -> StoreResult<Swap>;
}

/// What a local delete did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The record was never pushed and is gone.
    Removed,
    /// The record is now a delete tombstone waiting to be pushed.
    Tombstoned,
    /// The record was already a tombstone.
    AlreadyPending,
    /// No such record.
    Absent,
}

/// Queries and local mutations built on [`RecordStore`].
///
/// Mutations write locally, tag the record dirty and return at once. A
/// mutation on an already-dirty record upgrades its pending operation in
/// place, so each record has at most one outstanding operation.
pub trait RecordStoreExt: RecordStore {
    /// Finds the local record of `domain` with the given remote id.
    fn find_by_remote_id(
        &self,
        domain: Domain,
        remote_id: &RemoteId,
    ) -> StoreResult<Option<Record>> {
        Ok(self
            .list_all(domain)?
            .into_iter()
            .find(|record| record.remote_id() == Some(remote_id)))
    }

    /// Counts records of `domain` waiting to be pushed.
    fn unsynced_count(&self, domain: Domain) -> StoreResult<usize> {
        Ok(self.list_dirty(domain)?.len())
    }

    /// Stores a new record as `PendingCreate`.
    fn record_create(&self, payload: Payload, at: DateTime<Utc>) -> StoreResult<Record> {
        let record = Record::pending_create(payload, at);
        self.upsert(record.clone())?;
        tracing::debug!(domain = %record.domain(), local_id = %record.local_id, "recorded create");
        Ok(record)
    }

    /// Replaces the payload of an existing record.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotFound`] if the record does not exist
    /// - [`StoreError::RecordDeleted`] if it is a delete tombstone
    /// - [`StoreError::DomainMismatch`] if the payload is of another domain
    fn record_update(
        &self,
        local_id: LocalId,
        payload: Payload,
        at: DateTime<Utc>,
    ) -> StoreResult<Record> {
        for _ in 0..MUTATION_ATTEMPTS {
            let current = self.get(local_id)?.ok_or(StoreError::NotFound(local_id))?;
            if current.domain() != payload.domain() {
                return Err(StoreError::DomainMismatch {
                    expected: current.domain(),
                    actual: payload.domain(),
                });
            }

            let sync_state = match &current.sync_state {
                SyncState::PendingCreate => SyncState::PendingCreate,
                SyncState::Synced { remote_id } | SyncState::PendingUpdate { remote_id } => {
                    SyncState::PendingUpdate {
                        remote_id: remote_id.clone(),
                    }
                }
                SyncState::PendingDelete { .. } => return Err(StoreError::RecordDeleted(local_id)),
            };

            let updated = Record {
                local_id,
                payload: payload.clone(),
                updated_at: at,
                sync_state,
                unresolved: None,
            };

            if self
                .compare_and_swap(local_id, Some(&current), Some(updated.clone()))?
                .is_applied()
            {
                tracing::debug!(
                    domain = %updated.domain(),
                    local_id = %local_id,
                    state = %updated.sync_state.kind(),
                    "recorded update"
                );
                return Ok(updated);
            }
        }
        Err(StoreError::Contended(local_id))
    }

    /// Deletes a record locally.
    ///
    /// Never-pushed records disappear; pushed records become `PendingDelete`.
    fn record_delete(&self, local_id: LocalId, at: DateTime<Utc>) -> StoreResult<DeleteOutcome> {
        for _ in 0..MUTATION_ATTEMPTS {
            let Some(current) = self.get(local_id)? else {
                return Ok(DeleteOutcome::Absent);
            };

            let (replacement, outcome) = match &current.sync_state {
                SyncState::PendingCreate => (None, DeleteOutcome::Removed),
                SyncState::Synced { remote_id } | SyncState::PendingUpdate { remote_id } => (
                    Some(Record {
                        updated_at: at,
                        sync_state: SyncState::PendingDelete {
                            remote_id: remote_id.clone(),
                        },
                        unresolved: None,
                        ..current.clone()
                    }),
                    DeleteOutcome::Tombstoned,
                ),
                SyncState::PendingDelete { .. } => return Ok(DeleteOutcome::AlreadyPending),
            };

            if self
                .compare_and_swap(local_id, Some(&current), replacement)?
                .is_applied()
            {
                tracing::debug!(domain = %current.domain(), local_id = %local_id, ?outcome, "recorded delete");
                return Ok(outcome);
            }
        }
        Err(StoreError::Contended(local_id))
    }
}

impl<S: RecordStore + ?Sized> RecordStoreExt for S {}
