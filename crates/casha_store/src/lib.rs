//! # Casha Store
//!
//! Local record store abstraction for Casha offline-first sync.
//!
//! The store persists records per domain with their sync state. The sync
//! engine and the finance use cases only ever talk to it through
//! [`RecordStore`]; the storage engine behind it is not this crate's concern.
//!
//! ## Design Principles
//!
//! - Writes go to the store first; the network is never on the mutation path
//! - Write-backs of values computed from an earlier read use compare-and-swap
//! - Mutations upgrade a dirty record's pending operation in place
//!
//! ## Available Stores
//!
//! - [`MemoryRecordStore`] - For tests, the CLI and ephemeral sessions

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod memory;
mod store;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryRecordStore;
pub use store::{DeleteOutcome, RecordStore, RecordStoreExt, Swap};
