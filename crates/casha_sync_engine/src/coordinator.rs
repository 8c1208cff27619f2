//! Per-domain sync coordinator.

use crate::config::SyncConfig;
use crate::error::{GatewayError, GatewayResult, SyncError, SyncResult};
use crate::event_bus::{SyncEvent, SyncEventBus, SyncEventKind};
use crate::gateway::RemoteGateway;
use crate::reconcile::{plan_pull, resolve_write_back, PullStep, PushAck, WriteBack};
use crate::rules::{rules_for, DomainRules};
use crate::session::{RecordFailure, SyncSession, SyncSessionResult};
use casha_model::{Domain, Record, RemoteId, SyncState};
use casha_store::{RecordStore, Swap};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

type ResultSlot = watch::Receiver<Option<SyncSessionResult>>;

struct InFlight {
    session_id: u64,
    result: ResultSlot,
}

/// Clears the in-flight slot when the leading run ends, even if its
/// future is dropped.
struct InFlightGuard<'a> {
    slot: &'a Mutex<Option<InFlight>>,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.slot.lock().take();
    }
}

enum Role {
    Leader(u64, watch::Sender<Option<SyncSessionResult>>),
    Follower(u64, ResultSlot),
}

/// Reconciles one domain's local records with the backend.
///
/// A run pushes every dirty record, then pulls the complete remote list and
/// merges it. At most one run per coordinator is active: a call to
/// [`run_sync`](Self::run_sync) while a run is in progress waits for that
/// run and returns its result.
pub struct SyncCoordinator {
    domain: Domain,
    store: Arc<dyn RecordStore>,
    gateway: Arc<dyn RemoteGateway>,
    rules: Arc<dyn DomainRules>,
    bus: Arc<SyncEventBus>,
    config: SyncConfig,
    cancelled: AtomicBool,
    sessions: AtomicU64,
    in_flight: Mutex<Option<InFlight>>,
}

impl SyncCoordinator {
    /// Creates a coordinator.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Configuration`] if the gateway and the rules
    /// serve different domains.
    pub fn new(
        store: Arc<dyn RecordStore>,
        gateway: Arc<dyn RemoteGateway>,
        rules: Arc<dyn DomainRules>,
        bus: Arc<SyncEventBus>,
        config: SyncConfig,
    ) -> SyncResult<Self> {
        let domain = gateway.domain();
        if rules.domain() != domain {
            return Err(SyncError::configuration(format!(
                "{} rules wired to {} gateway",
                rules.domain(),
                domain
            )));
        }

        Ok(Self::assemble(store, gateway, rules, bus, config))
    }

    /// Creates a coordinator with the built-in rules of the gateway's domain.
    pub fn with_default_rules(
        store: Arc<dyn RecordStore>,
        gateway: Arc<dyn RemoteGateway>,
        bus: Arc<SyncEventBus>,
        config: SyncConfig,
    ) -> Self {
        let rules = rules_for(gateway.domain());
        Self::assemble(store, gateway, rules, bus, config)
    }

    fn assemble(
        store: Arc<dyn RecordStore>,
        gateway: Arc<dyn RemoteGateway>,
        rules: Arc<dyn DomainRules>,
        bus: Arc<SyncEventBus>,
        config: SyncConfig,
    ) -> Self {
        Self {
            domain: gateway.domain(),
            store,
            gateway,
            rules,
            bus,
            config,
            cancelled: AtomicBool::new(false),
            sessions: AtomicU64::new(0),
            in_flight: Mutex::new(None),
        }
    }

    /// Returns the domain this coordinator syncs.
    pub fn domain(&self) -> Domain {
        self.domain
    }

    /// Returns true while a run is in progress.
    pub fn is_running(&self) -> bool {
        self.in_flight.lock().is_some()
    }

    /// Cancels the run in progress.
    ///
    /// The flag is checked between records. Each run resets it when it
    /// starts, so cancelling while idle has no effect on the next run.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Runs one push-then-pull pass, or joins the one in progress.
    pub async fn run_sync(&self) -> SyncSessionResult {
        let role = {
            let mut slot = self.in_flight.lock();
            match slot.as_ref() {
                Some(in_flight) => Role::Follower(in_flight.session_id, in_flight.result.clone()),
                None => {
                    let session_id = self.sessions.fetch_add(1, Ordering::SeqCst) + 1;
                    let (tx, rx) = watch::channel(None);
                    *slot = Some(InFlight {
                        session_id,
                        result: rx,
                    });
                    Role::Leader(session_id, tx)
                }
            }
        };

        match role {
            Role::Follower(session_id, rx) => {
                tracing::debug!(domain = %self.domain, session = session_id, "joining sync in progress");
                self.await_in_flight(session_id, rx).await
            }
            Role::Leader(session_id, tx) => {
                let guard = InFlightGuard {
                    slot: &self.in_flight,
                };
                let result = self.run_session(session_id).await;
                drop(guard);
                tx.send_replace(Some(result.clone()));
                result
            }
        }
    }

    async fn await_in_flight(&self, session_id: u64, mut rx: ResultSlot) -> SyncSessionResult {
        loop {
            let current = rx.borrow_and_update().clone();
            if let Some(result) = current {
                return result;
            }
            if rx.changed().await.is_err() {
                let last = rx.borrow().clone();
                return last.unwrap_or_else(|| {
                    SyncSessionResult::aborted(self.domain, session_id, SyncError::Cancelled)
                });
            }
        }
    }

    async fn run_session(&self, session_id: u64) -> SyncSessionResult {
        self.cancelled.store(false, Ordering::SeqCst);
        let mut session = SyncSession::start(self.domain, session_id);

        tracing::info!(domain = %self.domain, session = session_id, "sync started");
        self.publish(session_id, SyncEventKind::Started);

        let pushed = self.push_phase(&mut session).await;
        if !session.is_aborted() && !session.is_failed() {
            self.pull_phase(&mut session, &pushed).await;
        }

        let result = session.finish();
        tracing::info!(
            domain = %self.domain,
            session = session_id,
            status = ?result.status,
            attempted = result.attempted,
            succeeded = result.succeeded,
            failed = result.failed,
            "sync finished"
        );
        self.publish(session_id, SyncEventKind::Completed(result.clone()));
        result
    }

    async fn push_phase(&self, session: &mut SyncSession) -> HashSet<RemoteId> {
        let mut pushed = HashSet::new();

        let mut dirty = match self.store.list_dirty(self.domain) {
            Ok(dirty) => dirty,
            Err(err) => {
                tracing::error!(domain = %self.domain, session = session.session_id, error = %err, "cannot list dirty records");
                session.fail(err.into());
                return pushed;
            }
        };
        dirty.sort_by(|a, b| {
            a.updated_at
                .cmp(&b.updated_at)
                .then_with(|| a.local_id.cmp(&b.local_id))
        });

        for record in dirty {
            if self.is_cancelled() {
                tracing::info!(domain = %self.domain, session = session.session_id, "sync cancelled during push");
                session.abort(SyncError::Cancelled);
                break;
            }

            session.record_attempt();
            let operation = record.sync_state.kind();

            match self.push_record(&record).await {
                Ok(remote_id) => {
                    tracing::debug!(
                        domain = %self.domain,
                        session = session.session_id,
                        local_id = %record.local_id,
                        remote_id = remote_id.as_ref().map(RemoteId::as_str),
                        %operation,
                        "record pushed"
                    );
                    session.record_success();
                    if let Some(remote_id) = &remote_id {
                        pushed.insert(remote_id.clone());
                    }
                    self.publish(
                        session.session_id,
                        SyncEventKind::EntitySynced {
                            local_id: record.local_id,
                            remote_id,
                            operation,
                        },
                    );
                }
                Err(err) => {
                    session.record_failure(RecordFailure {
                        local_id: record.local_id,
                        operation,
                        error: err.clone(),
                    });
                    self.publish(
                        session.session_id,
                        SyncEventKind::EntityFailed {
                            local_id: record.local_id,
                            error: err.clone(),
                        },
                    );

                    match err {
                        SyncError::Connectivity { .. } => {
                            tracing::warn!(domain = %self.domain, session = session.session_id, error = %err, "connectivity lost, aborting push");
                            session.abort(err);
                            break;
                        }
                        SyncError::LocalStore { .. } => {
                            tracing::error!(domain = %self.domain, session = session.session_id, local_id = %record.local_id, error = %err, "local store failed");
                            session.fail(err);
                            break;
                        }
                        _ => {
                            tracing::warn!(
                                domain = %self.domain,
                                session = session.session_id,
                                local_id = %record.local_id,
                                %operation,
                                error = %err,
                                "record push failed"
                            );
                        }
                    }
                }
            }
        }

        pushed
    }

    /// Pushes one dirty record and writes the outcome back.
    ///
    /// Returns the remote id the record is now synced under, or `None` if
    /// the record is gone.
    async fn push_record(&self, record: &Record) -> SyncResult<Option<RemoteId>> {
        let ack = match &record.sync_state {
            SyncState::Synced { remote_id } => return Ok(Some(remote_id.clone())),
            SyncState::PendingCreate => match self.rules.validate(&record.payload) {
                Err(err) => PushAck::Rejected(err),
                Ok(()) => match self.call(self.gateway.create(&record.payload)).await {
                    Ok(remote) => PushAck::Created(remote),
                    Err(err @ GatewayError::Client { .. }) => PushAck::Rejected(err.into()),
                    Err(err) => return Err(err.into()),
                },
            },
            SyncState::PendingUpdate { remote_id } => match self.rules.validate(&record.payload) {
                Err(err) => PushAck::Rejected(err),
                Ok(()) => match self.call(self.gateway.update(remote_id, &record.payload)).await {
                    Ok(remote) => PushAck::Updated(remote),
                    Err(err) if err.is_not_found() => PushAck::GoneUpstream,
                    Err(err @ GatewayError::Client { .. }) => PushAck::Rejected(err.into()),
                    Err(err) => return Err(err.into()),
                },
            },
            SyncState::PendingDelete { remote_id } => {
                match self.call(self.gateway.delete(remote_id)).await {
                    Ok(()) => PushAck::Deleted,
                    Err(err) if err.is_not_found() => PushAck::Deleted,
                    Err(err) => return Err(err.into()),
                }
            }
        };

        self.write_back(record, &ack)?;

        match ack {
            PushAck::Created(remote) | PushAck::Updated(remote) => Ok(Some(remote.remote_id)),
            PushAck::GoneUpstream | PushAck::Deleted => Ok(None),
            PushAck::Rejected(err) => Err(err),
        }
    }

    /// Writes a push result back with compare-and-swap, re-deciding when the
    /// record changed in the meantime.
    fn write_back(&self, snapshot: &Record, ack: &PushAck) -> SyncResult<()> {
        let attempts = self.config.max_write_attempts.max(1);
        let mut current = Some(snapshot.clone());

        for _ in 0..attempts {
            let replacement = match resolve_write_back(snapshot, current.as_ref(), ack) {
                WriteBack::Replace(record) => Some(record),
                WriteBack::Remove => None,
                WriteBack::Leave => {
                    tracing::debug!(domain = %self.domain, local_id = %snapshot.local_id, "record changed during push, leaving it");
                    return Ok(());
                }
            };

            match self
                .store
                .compare_and_swap(snapshot.local_id, current.as_ref(), replacement)?
            {
                Swap::Applied => return Ok(()),
                Swap::Conflict(now) => current = now,
            }
        }

        Err(SyncError::WriteBackConflict { attempts })
    }

    async fn pull_phase(&self, session: &mut SyncSession, pushed: &HashSet<RemoteId>) {
        if self.is_cancelled() {
            session.abort(SyncError::Cancelled);
            return;
        }

        let remotes = match self.call(self.gateway.list()).await {
            Ok(remotes) => remotes,
            Err(err) => {
                tracing::warn!(domain = %self.domain, session = session.session_id, error = %err, "pull failed");
                session.fail(err.into());
                return;
            }
        };

        let locals = match self.store.list_all(self.domain) {
            Ok(locals) => locals,
            Err(err) => {
                tracing::error!(domain = %self.domain, session = session.session_id, error = %err, "cannot list local records");
                session.fail(err.into());
                return;
            }
        };

        let plan = plan_pull(self.domain, &locals, remotes, pushed);
        let mut summary = plan.summary();

        for step in plan.steps {
            if self.is_cancelled() {
                tracing::info!(domain = %self.domain, session = session.session_id, "sync cancelled during pull");
                session.set_pull(summary);
                session.abort(SyncError::Cancelled);
                return;
            }

            let (local_id, expected, replacement) = match &step {
                PullStep::Insert(record) => (record.local_id, None, Some(record.clone())),
                PullStep::Update {
                    expected,
                    replacement,
                } => (expected.local_id, Some(expected), Some(replacement.clone())),
                PullStep::Delete(record) => (record.local_id, Some(record), None),
            };

            match self.store.compare_and_swap(local_id, expected, replacement) {
                Ok(Swap::Applied) => match step {
                    PullStep::Insert(_) => summary.inserted += 1,
                    PullStep::Update { .. } => summary.updated += 1,
                    PullStep::Delete(_) => summary.deleted += 1,
                },
                Ok(Swap::Conflict(_)) => {
                    tracing::debug!(domain = %self.domain, local_id = %local_id, "record changed during pull, leaving it");
                    summary.skipped += 1;
                }
                Err(err) => {
                    tracing::error!(domain = %self.domain, session = session.session_id, local_id = %local_id, error = %err, "local store failed during pull");
                    session.set_pull(summary);
                    session.fail(err.into());
                    return;
                }
            }
        }

        tracing::debug!(
            domain = %self.domain,
            session = session.session_id,
            inserted = summary.inserted,
            updated = summary.updated,
            deleted = summary.deleted,
            skipped = summary.skipped,
            "pull merged"
        );
        session.set_pull(summary);
    }

    async fn call<T>(&self, request: impl Future<Output = GatewayResult<T>>) -> GatewayResult<T> {
        match tokio::time::timeout(self.config.call_timeout, request).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout),
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn publish(&self, session_id: u64, kind: SyncEventKind) {
        self.bus
            .publish(SyncEvent::new(self.domain, session_id, kind));
    }
}

impl std::fmt::Debug for SyncCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncCoordinator")
            .field("domain", &self.domain)
            .field("config", &self.config)
            .field("running", &self.is_running())
            .finish()
    }
}
