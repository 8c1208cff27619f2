//! CLI command implementations.

pub mod run;
pub mod status;

use casha_model::{split_cashflow_history, CashflowEntry, Domain, Record, RemoteRecord};
use casha_store::{MemoryRecordStore, StoreError};
use casha_sync_engine::{
    MockGateway, SyncConfig, SyncError, SyncEventBus, SyncOrchestrator,
};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Errors reported by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// The fixture file could not be read or written.
    #[error("cannot access {path}: {source}")]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The fixture is not valid JSON of the expected shape.
    #[error("invalid fixture: {0}")]
    Json(#[from] serde_json::Error),

    /// Wiring the engine failed.
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// The local store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// How command results are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable lines.
    Text,
    /// Pretty-printed JSON.
    Json,
}

/// Device and backend state, as stored in a fixture file.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Fixture {
    /// Records in the local store.
    #[serde(default)]
    pub local: Vec<Record>,
    /// Records on the backend, per domain.
    #[serde(default)]
    pub remote: BTreeMap<Domain, Vec<RemoteRecord>>,
    /// Combined backend history, split into transactions and incomes on load.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cashflow_history: Vec<CashflowEntry>,
}

impl Fixture {
    /// Reads a fixture file.
    pub fn load(path: &Path) -> Result<Self, CliError> {
        let json = std::fs::read_to_string(path).map_err(|source| CliError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Writes the fixture as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<(), CliError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|source| CliError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// The engine wired over a fixture.
pub struct Workspace {
    /// Local records.
    pub store: Arc<MemoryRecordStore>,
    /// One mock backend per domain.
    pub gateways: BTreeMap<Domain, Arc<MockGateway>>,
    /// Event bus shared by the coordinators.
    pub bus: Arc<SyncEventBus>,
}

impl Workspace {
    /// Seeds a store and one mock backend per domain from `fixture`.
    pub fn from_fixture(fixture: Fixture, offline: bool) -> Self {
        let Fixture {
            local,
            mut remote,
            cashflow_history,
        } = fixture;

        let split = split_cashflow_history(cashflow_history);
        remote
            .entry(Domain::Transaction)
            .or_default()
            .extend(split.expenses);
        remote.entry(Domain::Income).or_default().extend(split.incomes);

        let gateways = Domain::ALL
            .iter()
            .map(|domain| {
                let records = remote.remove(domain).unwrap_or_default();
                let gateway = MockGateway::with_records(*domain, records);
                gateway.set_offline(offline);
                (*domain, Arc::new(gateway))
            })
            .collect();

        Self {
            store: Arc::new(MemoryRecordStore::from_records(local)),
            gateways,
            bus: Arc::new(SyncEventBus::new()),
        }
    }

    /// Builds an orchestrator over every domain.
    pub fn orchestrator(&self, config: SyncConfig) -> Result<SyncOrchestrator, CliError> {
        let builder = self.gateways.values().fold(
            SyncOrchestrator::builder(self.store.clone(), self.bus.clone()).with_config(config),
            |builder, gateway| builder.with_gateway(gateway.clone()),
        );
        Ok(builder.build()?)
    }

    /// Captures the current local and remote state.
    pub fn snapshot(&self) -> Fixture {
        Fixture {
            local: self.store.snapshot(),
            remote: self
                .gateways
                .iter()
                .map(|(domain, gateway)| (*domain, gateway.remote_records()))
                .filter(|(_, records)| !records.is_empty())
                .collect(),
            cashflow_history: Vec::new(),
        }
    }
}
