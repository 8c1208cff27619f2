//! Integration tests for sync coordinators against the mock backend.

use casha_model::{Domain, Payload, Record, RemoteId, RemoteRecord, SyncState};
use casha_store::{MemoryRecordStore, RecordStore, RecordStoreExt};
use casha_sync_engine::{
    GatewayError, GatewayOp, ManualConnectivity, MockGateway, SessionStatus, SyncConfig,
    SyncCoordinator, SyncError, SyncEvent, SyncEventBus, SyncEventKind, SyncOrchestrator,
};
use casha_testkit::prelude::*;
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

struct Harness {
    store: Arc<MemoryRecordStore>,
    gateway: Arc<MockGateway>,
    bus: Arc<SyncEventBus>,
    coordinator: Arc<SyncCoordinator>,
}

fn harness(domain: Domain, locals: Vec<Record>, remotes: Vec<RemoteRecord>) -> Harness {
    harness_with(domain, locals, remotes, SyncConfig::default())
}

fn harness_with(
    domain: Domain,
    locals: Vec<Record>,
    remotes: Vec<RemoteRecord>,
    config: SyncConfig,
) -> Harness {
    let store = seeded_store(locals);
    let gateway = Arc::new(MockGateway::with_records(domain, remotes));
    let bus = Arc::new(SyncEventBus::new());
    let coordinator = Arc::new(SyncCoordinator::with_default_rules(
        store.clone(),
        gateway.clone(),
        bus.clone(),
        config,
    ));
    Harness {
        store,
        gateway,
        bus,
        coordinator,
    }
}

fn remote(id: &str, payload: Payload, minute: i64) -> RemoteRecord {
    RemoteRecord::new(id, payload, at_minute(minute))
}

fn state_of(store: &MemoryRecordStore, record: &Record) -> Option<SyncState> {
    store
        .get(record.local_id)
        .unwrap()
        .map(|record| record.sync_state)
}

fn synced(id: &str) -> Option<SyncState> {
    Some(SyncState::Synced {
        remote_id: id.into(),
    })
}

#[tokio::test]
async fn pending_create_is_synced_under_the_backend_id() {
    let record = pending_create(transaction("Lunch", dec!(50)), at_minute(0));
    let h = harness(Domain::Transaction, vec![record.clone()], vec![]);

    let result = h.coordinator.run_sync().await;

    assert_eq!(result.status, SessionStatus::Completed);
    assert_eq!((result.attempted, result.succeeded, result.failed), (1, 1, 0));
    assert_eq!(state_of(&h.store, &record), synced("tx_1"));
    assert!(h.gateway.get_remote(&"tx_1".into()).is_some());
    assert_eq!(result.pull.map(|pull| pull.inserted), Some(0));
}

#[tokio::test]
async fn synced_record_missing_remotely_is_removed() {
    let record = synced_record("bg_7", budget("Food", dec!(500), dec!(120)), at_minute(0));
    let h = harness(Domain::Budget, vec![record.clone()], vec![]);

    let result = h.coordinator.run_sync().await;

    assert!(result.is_success());
    assert_eq!(state_of(&h.store, &record), None);
    assert_eq!(result.pull.map(|pull| pull.deleted), Some(1));
}

#[tokio::test]
async fn rejected_record_stays_pending_without_blocking_others() {
    let salary = pending_create(income("Salary", dec!(9000)), at_minute(0));
    let bonus = pending_create(income("Bonus", dec!(1500)), at_minute(1));
    let gift = pending_create(income("Gift", dec!(200)), at_minute(2));
    let h = harness(
        Domain::Income,
        vec![salary.clone(), bonus.clone(), gift.clone()],
        vec![],
    );
    h.gateway
        .reject_name("Bonus", GatewayError::from_status(422, "amount exceeds limit"));

    let result = h.coordinator.run_sync().await;

    assert_eq!(result.status, SessionStatus::PartiallyFailed);
    assert_eq!((result.attempted, result.succeeded, result.failed), (3, 2, 1));
    assert_eq!(result.failures[0].local_id, bonus.local_id);
    assert!(result.failures[0].error.is_validation());
    assert_eq!(h.gateway.calls(GatewayOp::Create), 3);

    let stored = h.store.get(bonus.local_id).unwrap().unwrap();
    assert_eq!(stored.sync_state, SyncState::PendingCreate);
    assert!(stored.unresolved.is_some());
    assert_eq!(state_of(&h.store, &salary), synced("in_1"));
    assert_eq!(state_of(&h.store, &gift), synced("in_2"));
}

#[tokio::test]
async fn second_run_does_not_create_again() {
    let h = harness(
        Domain::Category,
        vec![pending_create(category("Food"), at_minute(0))],
        vec![],
    );

    assert!(h.coordinator.run_sync().await.is_success());
    let second = h.coordinator.run_sync().await;

    assert!(second.is_success());
    assert_eq!(second.attempted, 0);
    assert_eq!(h.gateway.calls(GatewayOp::Create), 1);
    assert_eq!(h.gateway.remote_records().len(), 1);
    assert_eq!(h.store.list_all(Domain::Category).unwrap().len(), 1);
}

#[tokio::test]
async fn pull_inserts_records_created_elsewhere() {
    let local = pending_create(category("Food"), at_minute(0));
    let h = harness(
        Domain::Category,
        vec![local.clone()],
        vec![remote("ct_5", category("Travel"), 3)],
    );

    let result = h.coordinator.run_sync().await;

    assert!(result.is_success());
    assert_eq!(state_of(&h.store, &local), synced("ct_6"));
    let travel = h
        .store
        .find_by_remote_id(Domain::Category, &"ct_5".into())
        .unwrap()
        .unwrap();
    assert_eq!(travel.payload, category("Travel"));
    assert_eq!(travel.updated_at, at_minute(3));
    assert_eq!(result.pull.map(|pull| pull.inserted), Some(1));
}

#[tokio::test]
async fn pull_overwrites_synced_records_but_not_dirty_ones() {
    let groceries = synced_record("ct_1", category("Food"), at_minute(0));
    let rent = pending_update("ct_2", category("Rent (local)"), at_minute(5));
    let h = harness(
        Domain::Category,
        vec![groceries.clone(), rent.clone()],
        vec![
            remote("ct_1", category("Groceries"), 10),
            remote("ct_2", category("Rent (remote)"), 10),
        ],
    );
    h.gateway
        .fail_next(GatewayOp::Update, GatewayError::from_status(500, "boom"));

    let result = h.coordinator.run_sync().await;

    assert_eq!(result.status, SessionStatus::PartiallyFailed);
    let pulled = h.store.get(groceries.local_id).unwrap().unwrap();
    assert_eq!(pulled.payload, category("Groceries"));
    assert_eq!(pulled.updated_at, at_minute(10));

    let kept = h.store.get(rent.local_id).unwrap().unwrap();
    assert_eq!(kept.payload, category("Rent (local)"));
    assert!(kept.is_dirty());

    let pull = result.pull.unwrap();
    assert_eq!(pull.updated, 1);
    assert!(pull.skipped >= 1);
}

#[tokio::test]
async fn remote_deletion_spares_dirty_records() {
    let clean = synced_record("ct_1", category("Food"), at_minute(0));
    let dirty = pending_update("ct_2", category("Rent"), at_minute(1));
    let h = harness(Domain::Category, vec![clean.clone(), dirty.clone()], vec![]);
    h.gateway
        .fail_next(GatewayOp::Update, GatewayError::from_status(503, "unavailable"));

    h.coordinator.run_sync().await;

    assert_eq!(state_of(&h.store, &clean), None);
    assert!(matches!(
        state_of(&h.store, &dirty),
        Some(SyncState::PendingUpdate { .. })
    ));
}

#[tokio::test]
async fn update_of_record_gone_upstream_deletes_it_locally() {
    let record = pending_update("ct_9", category("Old"), at_minute(0));
    let h = harness(Domain::Category, vec![record.clone()], vec![]);

    let result = h.coordinator.run_sync().await;

    assert!(result.is_success());
    assert_eq!(result.succeeded, 1);
    assert_eq!(state_of(&h.store, &record), None);
}

#[tokio::test]
async fn delete_of_missing_remote_removes_tombstone() {
    let record = pending_delete("bg_3", budget("Fun", dec!(100), dec!(0)), at_minute(0));
    let h = harness(Domain::Budget, vec![record.clone()], vec![]);

    let result = h.coordinator.run_sync().await;

    assert!(result.is_success());
    assert_eq!(state_of(&h.store, &record), None);
    assert_eq!(h.gateway.calls(GatewayOp::Delete), 1);
}

#[tokio::test]
async fn delete_is_pushed_and_removed() {
    let record = pending_delete("bg_3", budget("Fun", dec!(100), dec!(0)), at_minute(1));
    let h = harness(
        Domain::Budget,
        vec![record.clone()],
        vec![remote("bg_3", budget("Fun", dec!(100), dec!(0)), 0)],
    );

    assert!(h.coordinator.run_sync().await.is_success());
    assert_eq!(state_of(&h.store, &record), None);
    assert!(h.gateway.remote_records().is_empty());
}

#[tokio::test]
async fn overlapping_runs_share_one_session() {
    let h = harness(
        Domain::Transaction,
        vec![pending_create(transaction("Coffee", dec!(4.5)), at_minute(0))],
        vec![],
    );
    h.gateway.set_latency(Some(Duration::from_millis(50)));

    let (first, second) = tokio::join!(h.coordinator.run_sync(), h.coordinator.run_sync());

    assert_eq!(first, second);
    assert_eq!(first.session_id, 1);
    assert_eq!(h.gateway.calls(GatewayOp::Create), 1);
    assert!(!h.coordinator.is_running());
}

#[tokio::test]
async fn lost_connectivity_aborts_and_skips_pull() {
    let first = pending_create(category("Food"), at_minute(0));
    let second = pending_create(category("Rent"), at_minute(1));
    let h = harness(Domain::Category, vec![first.clone(), second.clone()], vec![]);
    h.gateway.set_offline(true);

    let result = h.coordinator.run_sync().await;

    assert_eq!(result.status, SessionStatus::Aborted);
    assert!(result.error.as_ref().is_some_and(SyncError::is_connectivity));
    assert_eq!(result.failed, 1);
    assert_eq!(h.gateway.calls(GatewayOp::Create), 1);
    assert_eq!(h.gateway.calls(GatewayOp::List), 0);
    assert_eq!(state_of(&h.store, &first), Some(SyncState::PendingCreate));
    assert_eq!(state_of(&h.store, &second), Some(SyncState::PendingCreate));

    h.gateway.set_offline(false);
    let retry = h.coordinator.run_sync().await;

    assert!(retry.is_success());
    assert_eq!(h.store.unsynced_count(Domain::Category).unwrap(), 0);
}

#[tokio::test]
async fn pull_failure_keeps_push_results() {
    let record = pending_create(transaction("Taxi", dec!(12)), at_minute(0));
    let h = harness(Domain::Transaction, vec![record.clone()], vec![]);
    h.gateway
        .fail_next(GatewayOp::List, GatewayError::from_status(503, "unavailable"));

    let result = h.coordinator.run_sync().await;

    assert_eq!(result.status, SessionStatus::PartiallyFailed);
    assert_eq!(result.succeeded, 1);
    assert!(result.pull.is_none());
    assert!(matches!(
        result.error,
        Some(SyncError::Server { status: 503, .. })
    ));
    assert_eq!(state_of(&h.store, &record), synced("tx_1"));
}

#[tokio::test]
async fn invalid_payload_never_reaches_the_backend() {
    let invalid = pending_create(transaction("Refund", dec!(0)), at_minute(0));
    let valid = pending_create(transaction("Lunch", dec!(30)), at_minute(1));
    let h = harness(
        Domain::Transaction,
        vec![invalid.clone(), valid.clone()],
        vec![],
    );

    let result = h.coordinator.run_sync().await;

    assert_eq!(result.status, SessionStatus::PartiallyFailed);
    assert_eq!(h.gateway.calls(GatewayOp::Create), 1);
    assert_eq!(result.failures.len(), 1);
    assert!(result.failures[0].error.is_validation());

    let stored = h.store.get(invalid.local_id).unwrap().unwrap();
    assert_eq!(stored.sync_state, SyncState::PendingCreate);
    assert!(stored.unresolved.is_some());
    assert_eq!(state_of(&h.store, &valid), synced("tx_1"));
}

#[tokio::test]
async fn slow_backend_times_out() {
    let record = pending_create(category("Food"), at_minute(0));
    let h = harness_with(
        Domain::Category,
        vec![record.clone()],
        vec![],
        SyncConfig::default().with_call_timeout(Duration::from_millis(20)),
    );
    h.gateway.set_latency(Some(Duration::from_millis(200)));

    let result = h.coordinator.run_sync().await;

    assert_eq!(result.status, SessionStatus::PartiallyFailed);
    assert_eq!(result.failures[0].error, SyncError::Timeout);
    assert_eq!(result.error, Some(SyncError::Timeout));
    assert_eq!(state_of(&h.store, &record), Some(SyncState::PendingCreate));
}

#[tokio::test]
async fn timed_out_record_does_not_block_the_next() {
    let food = pending_create(category("Food"), at_minute(0));
    let rent = pending_create(category("Rent"), at_minute(1));
    let h = harness_with(
        Domain::Category,
        vec![food.clone(), rent.clone()],
        vec![],
        SyncConfig::default().with_call_timeout(Duration::from_millis(20)),
    );
    h.gateway.set_latency(Some(Duration::from_millis(200)));

    // Only the first call is slow.
    let gateway = h.gateway.clone();
    let _handle = h.bus.subscribe(Arc::new(move |event: &SyncEvent| {
        if matches!(event.kind, SyncEventKind::EntityFailed { .. }) {
            gateway.set_latency(None);
        }
    }));

    let result = h.coordinator.run_sync().await;

    assert_eq!(result.status, SessionStatus::PartiallyFailed);
    assert_eq!((result.attempted, result.succeeded, result.failed), (2, 1, 1));
    assert_eq!(result.failures[0].local_id, food.local_id);
    assert_eq!(result.failures[0].error, SyncError::Timeout);
    assert_eq!(state_of(&h.store, &food), Some(SyncState::PendingCreate));
    assert_eq!(state_of(&h.store, &rent), synced("ct_1"));
    assert!(result.pull.is_some());
}

#[tokio::test]
async fn write_back_gives_up_after_the_attempt_bound() {
    let record = pending_create(category("Food"), at_minute(0));
    let inner = seeded_store([record.clone()]);
    let store = Arc::new(FaultyStore::new(inner.clone()));
    let gateway = Arc::new(MockGateway::new(Domain::Category));
    let coordinator = SyncCoordinator::with_default_rules(
        store.clone(),
        gateway.clone(),
        Arc::new(SyncEventBus::new()),
        SyncConfig::default().with_max_write_attempts(2),
    );

    // Another writer edits the record every time the engine tries to write it.
    let concurrent = inner.clone();
    let edits = Arc::new(std::sync::atomic::AtomicI64::new(0));
    let target = record.local_id;
    store.on_every_compare_and_swap(move |_| {
        let n = edits.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1;
        concurrent
            .record_update(target, category(&format!("Edit {n}")), at_minute(n))
            .unwrap();
    });

    let result = coordinator.run_sync().await;

    assert_eq!(result.status, SessionStatus::PartiallyFailed);
    assert_eq!((result.attempted, result.succeeded, result.failed), (1, 0, 1));
    assert_eq!(result.failures[0].local_id, record.local_id);
    assert_eq!(
        result.failures[0].error,
        SyncError::WriteBackConflict { attempts: 2 }
    );
    assert_eq!(gateway.calls(GatewayOp::Create), 1);

    let stored = inner.get(record.local_id).unwrap().unwrap();
    assert!(stored.is_dirty());
    assert_eq!(stored.sync_state, SyncState::PendingCreate);
}

#[tokio::test]
async fn cancel_stops_between_records() {
    let h = harness(
        Domain::Category,
        vec![
            pending_create(category("Food"), at_minute(0)),
            pending_create(category("Rent"), at_minute(1)),
            pending_create(category("Fun"), at_minute(2)),
        ],
        vec![],
    );
    let coordinator = Arc::downgrade(&h.coordinator);
    let _handle = h.bus.subscribe(Arc::new(move |event: &SyncEvent| {
        if matches!(event.kind, SyncEventKind::EntitySynced { .. }) {
            if let Some(coordinator) = coordinator.upgrade() {
                coordinator.cancel();
            }
        }
    }));

    let result = h.coordinator.run_sync().await;

    assert_eq!(result.status, SessionStatus::Aborted);
    assert_eq!(result.error, Some(SyncError::Cancelled));
    assert_eq!((result.attempted, result.succeeded), (1, 1));
    assert_eq!(h.gateway.calls(GatewayOp::List), 0);
    assert_eq!(h.store.unsynced_count(Domain::Category).unwrap(), 2);
}

#[tokio::test]
async fn record_deleted_during_create_becomes_tombstone() {
    let record = pending_create(transaction("Typo", dec!(10)), at_minute(0));
    let inner = seeded_store([record.clone()]);
    let store = Arc::new(FaultyStore::new(inner.clone()));
    let gateway = Arc::new(MockGateway::new(Domain::Transaction));
    let coordinator = SyncCoordinator::with_default_rules(
        store.clone(),
        gateway.clone(),
        Arc::new(SyncEventBus::new()),
        SyncConfig::default(),
    );

    let concurrent = inner.clone();
    store.on_compare_and_swap(move |local_id| {
        concurrent.record_delete(local_id, at_minute(1)).unwrap();
    });

    assert!(coordinator.run_sync().await.is_success());
    assert_eq!(
        state_of(&inner, &record),
        Some(SyncState::PendingDelete {
            remote_id: "tx_1".into()
        })
    );

    assert!(coordinator.run_sync().await.is_success());
    assert!(inner.is_empty());
    assert!(gateway.remote_records().is_empty());
}

#[tokio::test]
async fn store_failure_ends_the_run() {
    let inner = seeded_store([
        pending_create(category("Food"), at_minute(0)),
        pending_create(category("Rent"), at_minute(1)),
    ]);
    let store = Arc::new(FaultyStore::new(inner));
    store.fail_writes_after(0);
    let gateway = Arc::new(MockGateway::new(Domain::Category));
    let coordinator = SyncCoordinator::with_default_rules(
        store.clone(),
        gateway.clone(),
        Arc::new(SyncEventBus::new()),
        SyncConfig::default(),
    );

    let result = coordinator.run_sync().await;

    assert_eq!(result.status, SessionStatus::PartiallyFailed);
    assert!(matches!(result.error, Some(SyncError::LocalStore { .. })));
    assert_eq!(result.attempted, 1);
    assert!(result.pull.is_none());
    assert_eq!(gateway.calls(GatewayOp::List), 0);
}

#[tokio::test]
async fn unreadable_store_fails_before_any_call() {
    let store = Arc::new(FaultyStore::new(seeded_store([pending_create(
        category("Food"),
        at_minute(0),
    )])));
    store.fail_reads(true);
    let gateway = Arc::new(MockGateway::new(Domain::Category));
    let coordinator = SyncCoordinator::with_default_rules(
        store,
        gateway.clone(),
        Arc::new(SyncEventBus::new()),
        SyncConfig::default(),
    );

    let result = coordinator.run_sync().await;

    assert_eq!(result.status, SessionStatus::PartiallyFailed);
    assert_eq!(result.attempted, 0);
    assert_eq!(gateway.total_calls(), 0);
}

#[tokio::test]
async fn events_describe_the_run() {
    let record = pending_create(category("Food"), at_minute(0));
    let h = harness(Domain::Category, vec![record.clone()], vec![]);
    let (_handle, mut rx) = h.bus.subscribe_channel();

    let result = h.coordinator.run_sync().await;

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    assert_eq!(events.len(), 3);
    assert!(events
        .iter()
        .all(|event| event.domain == Domain::Category && event.session_id == 1));
    assert_eq!(events[0].kind, SyncEventKind::Started);
    assert!(matches!(
        &events[1].kind,
        SyncEventKind::EntitySynced { local_id, remote_id: Some(remote_id), .. }
            if *local_id == record.local_id && remote_id.as_str() == "ct_1"
    ));
    assert_eq!(events[2].result(), Some(&result));
}

#[tokio::test]
async fn sync_all_covers_every_domain() {
    let store = seeded_store(
        Domain::ALL
            .iter()
            .map(|domain| pending_create(payload_for(*domain, "Fixture"), at_minute(0))),
    );
    let orchestrator = Domain::ALL
        .iter()
        .fold(
            SyncOrchestrator::builder(store.clone(), Arc::new(SyncEventBus::new())),
            |builder, domain| builder.with_gateway(Arc::new(MockGateway::new(*domain))),
        )
        .build()
        .unwrap();

    let results = orchestrator.on_app_start().await;

    assert_eq!(
        results.iter().map(|result| result.domain).collect::<Vec<_>>(),
        Domain::ALL.to_vec()
    );
    assert!(results.iter().all(|result| result.is_success()));
    for domain in Domain::ALL {
        assert_eq!(store.unsynced_count(domain).unwrap(), 0);
    }
}

#[tokio::test]
async fn regaining_connectivity_triggers_one_resync() {
    let store = seeded_store([pending_create(category("Food"), at_minute(0))]);
    let gateway = Arc::new(MockGateway::new(Domain::Category));
    let bus = Arc::new(SyncEventBus::new());
    let orchestrator = Arc::new(
        SyncOrchestrator::builder(store.clone(), bus.clone())
            .with_gateway(gateway.clone())
            .build()
            .unwrap(),
    );
    let monitor = ManualConnectivity::new(false);
    let (_handle, mut rx) = bus.subscribe_channel();
    let task = orchestrator.clone().watch_connectivity(&monitor);

    monitor.set_online(true);
    let completed = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            let event = rx.recv().await.unwrap();
            if let Some(result) = event.result() {
                return result.clone();
            }
        }
    })
    .await
    .unwrap();

    assert!(completed.is_success());
    monitor.set_online(true);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(rx.try_recv().is_err());
    assert_eq!(gateway.calls(GatewayOp::List), 1);

    task.abort();
}

#[tokio::test]
async fn brief_outage_before_the_watcher_wakes_still_resyncs() {
    let store = seeded_store([pending_create(category("Food"), at_minute(0))]);
    let gateway = Arc::new(MockGateway::new(Domain::Category));
    let bus = Arc::new(SyncEventBus::new());
    let orchestrator = Arc::new(
        SyncOrchestrator::builder(store.clone(), bus.clone())
            .with_gateway(gateway.clone())
            .build()
            .unwrap(),
    );
    let monitor = ManualConnectivity::new(true);
    let (_handle, mut rx) = bus.subscribe_channel();
    let task = orchestrator.clone().watch_connectivity(&monitor);

    // The watcher has not been polled yet, so it only sees the final state.
    monitor.set_online(false);
    monitor.set_online(true);

    let completed = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            let event = rx.recv().await.unwrap();
            if let Some(result) = event.result() {
                return result.clone();
            }
        }
    })
    .await
    .unwrap();

    assert!(completed.is_success());
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(gateway.calls(GatewayOp::List), 1);
    assert_eq!(store.unsynced_count(Domain::Category).unwrap(), 0);

    task.abort();
}

fn converge(domain: Domain, mutations: &[Mutation]) -> Result<(), TestCaseError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();

    let store = Arc::new(MemoryRecordStore::new());
    apply_mutations(store.as_ref(), mutations).unwrap();

    // Records acknowledged during the replay exist on the backend.
    let gateway = Arc::new(MockGateway::new(domain));
    for record in store.list_all(domain).unwrap() {
        if let Some(remote_id) = record.remote_id() {
            gateway.insert_remote(RemoteRecord::new(
                remote_id.clone(),
                record.payload.clone(),
                record.updated_at,
            ));
        }
    }

    let coordinator = SyncCoordinator::with_default_rules(
        store.clone(),
        gateway.clone(),
        Arc::new(SyncEventBus::new()),
        SyncConfig::default(),
    );

    let result = runtime.block_on(coordinator.run_sync());
    prop_assert!(result.is_success(), "{:?}", result);
    prop_assert_eq!(store.unsynced_count(domain).unwrap(), 0);

    let local: BTreeMap<RemoteId, Payload> = store
        .list_all(domain)
        .unwrap()
        .into_iter()
        .filter_map(|record| Some((record.remote_id()?.clone(), record.payload)))
        .collect();
    let remote: BTreeMap<RemoteId, Payload> = gateway
        .remote_records()
        .into_iter()
        .map(|record| (record.remote_id, record.payload))
        .collect();
    prop_assert_eq!(&local, &remote);

    let writes = gateway.calls(GatewayOp::Create)
        + gateway.calls(GatewayOp::Update)
        + gateway.calls(GatewayOp::Delete);
    let again = runtime.block_on(coordinator.run_sync());
    prop_assert!(again.is_success());
    prop_assert_eq!(again.attempted, 0);
    prop_assert_eq!(
        gateway.calls(GatewayOp::Create)
            + gateway.calls(GatewayOp::Update)
            + gateway.calls(GatewayOp::Delete),
        writes
    );
    Ok(())
}

proptest! {
    #![proptest_config(PropTestConfig::quick().to_proptest_config())]

    #[test]
    fn sync_converges_local_and_remote(
        (domain, mutations) in domain_strategy()
            .prop_flat_map(|domain| (Just(domain), mutation_sequence_strategy(domain, 1, 30)))
    ) {
        converge(domain, &mutations)?;
    }
}
