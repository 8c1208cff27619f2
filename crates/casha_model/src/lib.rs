//! # Casha Model
//!
//! Record, payload and sync-state types for Casha offline-first sync.
//!
//! This crate provides:
//! - [`Domain`] for the four synced entity families
//! - [`LocalId`] / [`RemoteId`] identifiers
//! - Typed payloads per domain ([`Payload`])
//! - [`Record`] with its tagged [`SyncState`]
//! - [`RemoteRecord`] as returned by the backend
//! - Local-first read models (cashflow and budget summaries)
//!
//! This is a pure data crate with no I/O operations.
//!
//! ## Key Invariants
//!
//! - A `Synced` record always carries a remote id
//! - A `PendingCreate` record never carries a remote id
//! - Local ids are never sent to the backend

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cashflow;
mod domain;
mod id;
mod payload;
mod record;

pub use cashflow::{
    cashflow_entries, split_cashflow_history, BudgetSummary, CashflowEntry, CashflowKind,
    CashflowSplit, CashflowSummary,
};
pub use domain::{Domain, ParseDomainError};
pub use id::{LocalId, RemoteId};
pub use payload::{
    BudgetPayload, CategoryPayload, IncomeFrequency, IncomePayload, IncomeType, Payload,
    TransactionPayload,
};
pub use record::{Record, RemoteRecord, SyncState, SyncStateKind};
