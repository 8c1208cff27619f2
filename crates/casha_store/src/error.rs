//! Error types for record store operations.

use casha_model::{Domain, LocalId};
use thiserror::Error;

/// Result type for record store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while reading or writing local records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// No record with this local id exists.
    #[error("record not found: {0}")]
    NotFound(LocalId),

    /// The record is waiting for its delete to be pushed and cannot be edited.
    #[error("record {0} is pending delete")]
    RecordDeleted(LocalId),

    /// The new payload belongs to a different domain than the record.
    #[error("domain mismatch: record is {expected}, payload is {actual}")]
    DomainMismatch {
        /// Domain of the stored record.
        expected: Domain,
        /// Domain of the offered payload.
        actual: Domain,
    },

    /// The record kept changing underneath a local mutation.
    #[error("record {0} is contended")]
    Contended(LocalId),

    /// The underlying storage failed.
    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Creates a backend error from any message.
    pub fn backend(message: impl Into<String>) -> Self {
        StoreError::Backend(message.into())
    }
}
