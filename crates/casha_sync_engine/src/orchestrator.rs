//! Drives the per-domain coordinators.

use crate::config::SyncConfig;
use crate::connectivity::ConnectivityMonitor;
use crate::coordinator::SyncCoordinator;
use crate::error::{SyncError, SyncResult};
use crate::event_bus::SyncEventBus;
use crate::gateway::RemoteGateway;
use crate::rules::{rules_for, DomainRules};
use crate::session::SyncSessionResult;
use casha_model::Domain;
use casha_store::RecordStore;
use futures::future::join_all;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Triggers sync runs on app start, on connectivity regained and on manual
/// refresh.
///
/// Holds nothing but its coordinators. Domains run concurrently with each
/// other; within a domain the coordinator coalesces overlapping triggers.
#[derive(Debug)]
pub struct SyncOrchestrator {
    coordinators: BTreeMap<Domain, Arc<SyncCoordinator>>,
}

impl SyncOrchestrator {
    /// Creates an orchestrator from ready-made coordinators.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Configuration`] if two coordinators serve the
    /// same domain.
    pub fn new(coordinators: impl IntoIterator<Item = Arc<SyncCoordinator>>) -> SyncResult<Self> {
        let mut by_domain = BTreeMap::new();
        for coordinator in coordinators {
            let domain = coordinator.domain();
            if by_domain.insert(domain, coordinator).is_some() {
                return Err(SyncError::configuration(format!(
                    "two coordinators for {domain}"
                )));
            }
        }
        Ok(Self {
            coordinators: by_domain,
        })
    }

    /// Starts building an orchestrator over one store and one bus.
    pub fn builder(store: Arc<dyn RecordStore>, bus: Arc<SyncEventBus>) -> SyncOrchestratorBuilder {
        SyncOrchestratorBuilder {
            store,
            bus,
            config: SyncConfig::default(),
            gateways: Vec::new(),
            rules: HashMap::new(),
        }
    }

    /// Returns the domains this orchestrator drives.
    pub fn domains(&self) -> Vec<Domain> {
        self.coordinators.keys().copied().collect()
    }

    /// Returns the coordinator of `domain`.
    pub fn coordinator(&self, domain: Domain) -> Option<&Arc<SyncCoordinator>> {
        self.coordinators.get(&domain)
    }

    /// Runs (or joins) a sync of one domain.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Configuration`] if no coordinator serves `domain`.
    pub async fn run_sync(&self, domain: Domain) -> SyncResult<SyncSessionResult> {
        let coordinator = self
            .coordinators
            .get(&domain)
            .ok_or_else(|| SyncError::configuration(format!("no coordinator for {domain}")))?;
        Ok(coordinator.run_sync().await)
    }

    /// Syncs every domain concurrently. Results come back in domain order.
    pub async fn sync_all(&self) -> Vec<SyncSessionResult> {
        join_all(self.coordinators.values().map(|coordinator| coordinator.run_sync())).await
    }

    /// Syncs every domain after the app starts.
    pub async fn on_app_start(&self) -> Vec<SyncSessionResult> {
        tracing::info!(domains = self.coordinators.len(), "app start sync");
        self.sync_all().await
    }

    /// Syncs every domain after the device comes back online.
    pub async fn on_connectivity_regained(&self) -> Vec<SyncSessionResult> {
        tracing::info!(domains = self.coordinators.len(), "connectivity regained, syncing");
        self.sync_all().await
    }

    /// Syncs one domain, or all of them, on pull-to-refresh.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Configuration`] if no coordinator serves `domain`.
    pub async fn on_manual_refresh(
        &self,
        domain: Option<Domain>,
    ) -> SyncResult<Vec<SyncSessionResult>> {
        match domain {
            Some(domain) => Ok(vec![self.run_sync(domain).await?]),
            None => Ok(self.sync_all().await),
        }
    }

    /// Spawns a task that syncs every domain on each offline to online
    /// transition reported by `monitor`.
    ///
    /// Transitions reported while the task was not polled, or while a
    /// resync was running, collapse into one resync as long as the monitor
    /// is online when the task wakes. The task ends when the monitor is
    /// dropped.
    pub fn watch_connectivity(self: Arc<Self>, monitor: &dyn ConnectivityMonitor) -> JoinHandle<()> {
        let mut rx = monitor.subscribe();
        let mut regained = rx.borrow_and_update().regained;

        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let state = *rx.borrow_and_update();
                if !state.online {
                    tracing::info!("connectivity lost");
                } else if state.regained > regained {
                    tracing::debug!(transitions = state.regained - regained, "connectivity regained");
                    self.on_connectivity_regained().await;
                }
                regained = state.regained;
            }
        })
    }
}

/// Builder for [`SyncOrchestrator`].
pub struct SyncOrchestratorBuilder {
    store: Arc<dyn RecordStore>,
    bus: Arc<SyncEventBus>,
    config: SyncConfig,
    gateways: Vec<Arc<dyn RemoteGateway>>,
    rules: HashMap<Domain, Arc<dyn DomainRules>>,
}

impl SyncOrchestratorBuilder {
    /// Sets the configuration shared by every coordinator.
    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Adds the gateway of one domain.
    pub fn with_gateway(mut self, gateway: Arc<dyn RemoteGateway>) -> Self {
        self.gateways.push(gateway);
        self
    }

    /// Replaces the built-in rules of one domain.
    pub fn with_rules(mut self, rules: Arc<dyn DomainRules>) -> Self {
        self.rules.insert(rules.domain(), rules);
        self
    }

    /// Builds one coordinator per gateway.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Configuration`] if two gateways serve the same
    /// domain.
    pub fn build(self) -> SyncResult<SyncOrchestrator> {
        let mut coordinators = Vec::with_capacity(self.gateways.len());
        for gateway in self.gateways {
            let domain = gateway.domain();
            let rules = self
                .rules
                .get(&domain)
                .cloned()
                .unwrap_or_else(|| rules_for(domain));
            coordinators.push(Arc::new(SyncCoordinator::new(
                Arc::clone(&self.store),
                gateway,
                rules,
                Arc::clone(&self.bus),
                self.config.clone(),
            )?));
        }
        SyncOrchestrator::new(coordinators)
    }
}
