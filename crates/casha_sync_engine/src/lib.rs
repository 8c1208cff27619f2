//! # Casha Sync Engine
//!
//! Offline-first sync engine for the Casha finance tracker.
//!
//! This crate provides:
//! - Per-domain sync coordinators (push then pull)
//! - Compare-and-swap write-back of push results
//! - An injectable sync event bus
//! - Connectivity-triggered resync and an orchestrator for app triggers
//! - A remote gateway abstraction with an in-memory mock
//!
//! ## Architecture
//!
//! Each domain (transaction, income, budget, category) has one
//! [`SyncCoordinator`]. A run:
//! 1. Pushes every dirty record in `updated_at` order
//! 2. Writes each result back, re-deciding if the record changed meanwhile
//! 3. Pulls the complete remote list and merges it (newer `updated_at` wins)
//! 4. Publishes the session result on the [`SyncEventBus`]
//!
//! ## Key Invariants
//!
//! - After a successful run, `Synced` implies a remote id
//! - Dirty records are never overwritten or deleted by a pull
//! - A record pushed in a run is never deleted by that run's pull
//! - At most one run per domain is active; overlapping calls share its result
//! - Individual record failures never escape the coordinator

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod connectivity;
mod coordinator;
mod error;
mod event_bus;
mod gateway;
mod orchestrator;
mod reconcile;
mod rules;
mod session;

pub use config::SyncConfig;
pub use connectivity::{ConnectivityMonitor, ConnectivityState, ManualConnectivity};
pub use coordinator::SyncCoordinator;
pub use error::{GatewayError, GatewayResult, SyncError, SyncResult};
pub use event_bus::{SubscriptionHandle, SyncEvent, SyncEventBus, SyncEventKind, SyncObserver};
pub use gateway::{GatewayOp, MockGateway, RemoteGateway};
pub use orchestrator::{SyncOrchestrator, SyncOrchestratorBuilder};
pub use rules::{rules_for, BudgetRules, CategoryRules, DomainRules, IncomeRules, TransactionRules};
pub use session::{PullSummary, RecordFailure, SessionStatus, SyncSessionResult};
