//! In-memory record store.

use crate::error::{StoreError, StoreResult};
use crate::store::{RecordStore, Swap};
use casha_model::{Domain, LocalId, Record};
use parking_lot::RwLock;
use std::collections::HashMap;

/// An in-memory record store.
///
/// Suitable for tests, the command-line driver and ephemeral sessions.
/// Listings are ordered by `updated_at`, then local id.
///
/// # Example
///
/// ```rust
/// use casha_model::{CategoryPayload, Domain, Payload};
/// use casha_store::{MemoryRecordStore, RecordStoreExt};
///
/// let store = MemoryRecordStore::new();
/// let payload = Payload::Category(CategoryPayload { name: "Food".into(), is_active: true });
/// store.record_create(payload, chrono::Utc::now()).unwrap();
/// assert_eq!(store.unsynced_count(Domain::Category).unwrap(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: RwLock<HashMap<LocalId, Record>>,
}

impl MemoryRecordStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding the given records.
    #[must_use]
    pub fn from_records(records: impl IntoIterator<Item = Record>) -> Self {
        Self {
            records: RwLock::new(
                records
                    .into_iter()
                    .map(|record| (record.local_id, record))
                    .collect(),
            ),
        }
    }

    /// Returns a copy of every record, in listing order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Record> {
        let mut records: Vec<Record> = self.records.read().values().cloned().collect();
        sort_records(&mut records);
        records
    }

    /// Returns the number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns true if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    fn collect(&self, domain: Domain, dirty_only: bool) -> Vec<Record> {
        let mut records: Vec<Record> = self
            .records
            .read()
            .values()
            .filter(|record| record.domain() == domain && (!dirty_only || record.is_dirty()))
            .cloned()
            .collect();
        sort_records(&mut records);
        records
    }
}

fn sort_records(records: &mut [Record]) {
    records.sort_by(|a, b| {
        a.updated_at
            .cmp(&b.updated_at)
            .then_with(|| a.local_id.cmp(&b.local_id))
    });
}

impl RecordStore for MemoryRecordStore {
    fn list_dirty(&self, domain: Domain) -> StoreResult<Vec<Record>> {
        Ok(self.collect(domain, true))
    }

    fn list_all(&self, domain: Domain) -> StoreResult<Vec<Record>> {
        Ok(self.collect(domain, false))
    }

    fn get(&self, local_id: LocalId) -> StoreResult<Option<Record>> {
        Ok(self.records.read().get(&local_id).cloned())
    }

    fn upsert(&self, record: Record) -> StoreResult<()> {
        self.records.write().insert(record.local_id, record);
        Ok(())
    }

    fn delete(&self, local_id: LocalId) -> StoreResult<bool> {
        Ok(self.records.write().remove(&local_id).is_some())
    }

    fn compare_and_swap(
        &self,
        local_id: LocalId,
        expected: Option<&Record>,
        replacement: Option<Record>,
    ) -> StoreResult<Swap> {
        if let Some(record) = &replacement {
            if record.local_id != local_id {
                return Err(StoreError::backend(format!(
                    "replacement {} does not match slot {}",
                    record.local_id, local_id
                )));
            }
        }

        let mut records = self.records.write();
        let current = records.get(&local_id);
        if current != expected {
            return Ok(Swap::Conflict(current.cloned()));
        }

        match replacement {
            Some(record) => {
                records.insert(local_id, record);
            }
            None => {
                records.remove(&local_id);
            }
        }
        Ok(Swap::Applied)
    }
}
