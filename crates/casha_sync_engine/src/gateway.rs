//! Remote entity gateway abstraction.

use crate::error::{GatewayError, GatewayResult};
use async_trait::async_trait;
use casha_model::{Domain, Payload, RemoteId, RemoteRecord};
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// The backend API for one domain.
///
/// This trait abstracts the REST client, allowing for different
/// implementations (HTTP, mock for testing, etc.). One gateway serves
/// exactly one domain.
#[async_trait]
pub trait RemoteGateway: Send + Sync {
    /// Returns the domain this gateway serves.
    fn domain(&self) -> Domain;

    /// Creates an entity and returns the backend's canonical copy.
    async fn create(&self, payload: &Payload) -> GatewayResult<RemoteRecord>;

    /// Replaces an entity and returns the backend's canonical copy.
    async fn update(&self, remote_id: &RemoteId, payload: &Payload) -> GatewayResult<RemoteRecord>;

    /// Deletes an entity.
    async fn delete(&self, remote_id: &RemoteId) -> GatewayResult<()>;

    /// Lists every entity of the domain.
    async fn list(&self) -> GatewayResult<Vec<RemoteRecord>>;
}

/// Gateway operations, for scripting failures and counting calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayOp {
    /// [`RemoteGateway::create`].
    Create,
    /// [`RemoteGateway::update`].
    Update,
    /// [`RemoteGateway::delete`].
    Delete,
    /// [`RemoteGateway::list`].
    List,
}

#[derive(Debug, Default)]
struct MockState {
    remote: BTreeMap<RemoteId, RemoteRecord>,
    next_id: u64,
    scripted: HashMap<GatewayOp, VecDeque<GatewayError>>,
    rejected_names: HashMap<String, GatewayError>,
    calls: HashMap<GatewayOp, usize>,
}

/// An in-memory backend for one domain, for tests and the CLI.
///
/// Remote ids are `{prefix}_{n}` with `n` counting from 1, so the first
/// transaction created is `tx_1`. Names are trimmed and budget `remaining`
/// is recomputed, mimicking a backend that canonicalises what it stores.
#[derive(Debug)]
pub struct MockGateway {
    domain: Domain,
    state: Mutex<MockState>,
    online: AtomicBool,
    latency: Mutex<Option<Duration>>,
}

impl MockGateway {
    /// Creates an empty, online mock backend.
    pub fn new(domain: Domain) -> Self {
        Self {
            domain,
            state: Mutex::new(MockState {
                next_id: 1,
                ..MockState::default()
            }),
            online: AtomicBool::new(true),
            latency: Mutex::new(None),
        }
    }

    /// Creates a mock backend already holding `records`.
    pub fn with_records(domain: Domain, records: impl IntoIterator<Item = RemoteRecord>) -> Self {
        let gateway = Self::new(domain);
        for record in records {
            gateway.insert_remote(record);
        }
        gateway
    }

    /// Stores a record directly on the backend, as another device would.
    pub fn insert_remote(&self, record: RemoteRecord) {
        let mut state = self.state.lock();
        if let Some(n) = self.id_number(&record.remote_id) {
            state.next_id = state.next_id.max(n + 1);
        }
        state.remote.insert(record.remote_id.clone(), record);
    }

    /// Removes a record directly from the backend.
    pub fn remove_remote(&self, remote_id: &RemoteId) -> Option<RemoteRecord> {
        self.state.lock().remote.remove(remote_id)
    }

    /// Returns the backend's copy of a record.
    pub fn get_remote(&self, remote_id: &RemoteId) -> Option<RemoteRecord> {
        self.state.lock().remote.get(remote_id).cloned()
    }

    /// Returns every record on the backend.
    pub fn remote_records(&self) -> Vec<RemoteRecord> {
        self.state.lock().remote.values().cloned().collect()
    }

    /// Makes the next call of `op` fail with `error`. Calls queue up.
    pub fn fail_next(&self, op: GatewayOp, error: GatewayError) {
        self.state
            .lock()
            .scripted
            .entry(op)
            .or_default()
            .push_back(error);
    }

    /// Makes every create or update of a payload named `name` fail.
    pub fn reject_name(&self, name: impl Into<String>, error: GatewayError) {
        self.state.lock().rejected_names.insert(name.into(), error);
    }

    /// Simulates losing or regaining the connection.
    pub fn set_offline(&self, offline: bool) {
        self.online.store(!offline, Ordering::SeqCst);
    }

    /// Delays every call by `latency`.
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock() = latency;
    }

    /// Returns how many times `op` was called.
    pub fn calls(&self, op: GatewayOp) -> usize {
        self.state.lock().calls.get(&op).copied().unwrap_or(0)
    }

    /// Returns how many calls were made in total.
    pub fn total_calls(&self) -> usize {
        self.state.lock().calls.values().sum()
    }

    fn id_number(&self, remote_id: &RemoteId) -> Option<u64> {
        remote_id
            .as_str()
            .strip_prefix(self.domain.remote_prefix())
            .and_then(|rest| rest.strip_prefix('_'))
            .and_then(|n| n.parse().ok())
    }

    async fn enter(&self, op: GatewayOp, payload: Option<&Payload>) -> GatewayResult<()> {
        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.state.lock();
        *state.calls.entry(op).or_default() += 1;

        if !self.online.load(Ordering::SeqCst) {
            return Err(GatewayError::Connectivity("network unreachable".into()));
        }
        if let Some(error) = state.scripted.get_mut(&op).and_then(VecDeque::pop_front) {
            return Err(error);
        }
        if let Some(payload) = payload {
            if payload.domain() != self.domain {
                return Err(GatewayError::from_status(
                    400,
                    format!("{} payload sent to {} endpoint", payload.domain(), self.domain),
                ));
            }
            if let Some(error) = payload
                .name()
                .and_then(|name| state.rejected_names.get(name.trim()))
            {
                return Err(error.clone());
            }
        }
        Ok(())
    }
}

fn canonicalize(payload: &Payload) -> Payload {
    let mut payload = payload.clone();
    match &mut payload {
        Payload::Transaction(tx) => tx.name = tx.name.trim().to_string(),
        Payload::Income(income) => income.name = income.name.trim().to_string(),
        Payload::Category(category) => category.name = category.name.trim().to_string(),
        Payload::Budget(budget) => budget.remaining = budget.amount - budget.spent,
    }
    payload
}

#[async_trait]
impl RemoteGateway for MockGateway {
    fn domain(&self) -> Domain {
        self.domain
    }

    async fn create(&self, payload: &Payload) -> GatewayResult<RemoteRecord> {
        self.enter(GatewayOp::Create, Some(payload)).await?;
        let mut state = self.state.lock();
        let remote_id = RemoteId::new(format!("{}_{}", self.domain.remote_prefix(), state.next_id));
        state.next_id += 1;

        let record = RemoteRecord::new(remote_id.clone(), canonicalize(payload), Utc::now());
        state.remote.insert(remote_id, record.clone());
        Ok(record)
    }

    async fn update(&self, remote_id: &RemoteId, payload: &Payload) -> GatewayResult<RemoteRecord> {
        self.enter(GatewayOp::Update, Some(payload)).await?;
        let mut state = self.state.lock();
        let slot = state
            .remote
            .get_mut(remote_id)
            .ok_or_else(|| GatewayError::not_found(format!("{remote_id} not found")))?;

        *slot = RemoteRecord::new(remote_id.clone(), canonicalize(payload), Utc::now());
        Ok(slot.clone())
    }

    async fn delete(&self, remote_id: &RemoteId) -> GatewayResult<()> {
        self.enter(GatewayOp::Delete, None).await?;
        match self.state.lock().remote.remove(remote_id) {
            Some(_) => Ok(()),
            None => Err(GatewayError::not_found(format!("{remote_id} not found"))),
        }
    }

    async fn list(&self) -> GatewayResult<Vec<RemoteRecord>> {
        self.enter(GatewayOp::List, None).await?;
        Ok(self.remote_records())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use casha_model::{BudgetPayload, CategoryPayload};
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn category(name: &str) -> Payload {
        Payload::Category(CategoryPayload {
            name: name.into(),
            is_active: true,
        })
    }

    #[tokio::test]
    async fn mock_gateway_assigns_sequential_ids() {
        let gateway = MockGateway::new(Domain::Category);
        let first = gateway.create(&category("Food")).await.unwrap();
        let second = gateway.create(&category("Travel")).await.unwrap();

        assert_eq!(first.remote_id.as_str(), "ct_1");
        assert_eq!(second.remote_id.as_str(), "ct_2");
        assert_eq!(gateway.list().await.unwrap().len(), 2);
        assert_eq!(gateway.calls(GatewayOp::Create), 2);
    }

    #[tokio::test]
    async fn mock_gateway_ids_skip_seeded_records() {
        let at = Utc.with_ymd_and_hms(2026, 10, 1, 0, 0, 0).unwrap();
        let gateway = MockGateway::with_records(
            Domain::Category,
            [RemoteRecord::new("ct_7", category("Food"), at)],
        );
        let created = gateway.create(&category("Travel")).await.unwrap();
        assert_eq!(created.remote_id.as_str(), "ct_8");
    }

    #[tokio::test]
    async fn mock_gateway_canonicalizes() {
        let gateway = MockGateway::new(Domain::Budget);
        let at = Utc.with_ymd_and_hms(2026, 10, 1, 0, 0, 0).unwrap();
        let budget = Payload::Budget(BudgetPayload {
            amount: dec!(500),
            spent: dec!(120),
            remaining: dec!(0),
            period: "2026-10".into(),
            start_date: at,
            end_date: at,
            category: "Food".into(),
            currency: "IDR".into(),
        });

        let created = gateway.create(&budget).await.unwrap();
        match created.payload {
            Payload::Budget(budget) => assert_eq!(budget.remaining, dec!(380)),
            other => panic!("unexpected payload {other:?}"),
        }

        let gateway = MockGateway::new(Domain::Category);
        let created = gateway.create(&category("  Food ")).await.unwrap();
        assert_eq!(created.payload, category("Food"));
    }

    #[tokio::test]
    async fn mock_gateway_offline() {
        let gateway = MockGateway::new(Domain::Category);
        gateway.set_offline(true);

        let err = gateway.list().await.unwrap_err();
        assert!(err.is_connectivity());
        assert_eq!(gateway.calls(GatewayOp::List), 1);

        gateway.set_offline(false);
        assert!(gateway.list().await.is_ok());
    }

    #[tokio::test]
    async fn mock_gateway_scripted_failures_queue() {
        let gateway = MockGateway::new(Domain::Category);
        gateway.fail_next(GatewayOp::Create, GatewayError::from_status(500, "boom"));

        assert!(gateway.create(&category("Food")).await.is_err());
        assert!(gateway.create(&category("Food")).await.is_ok());
    }

    #[tokio::test]
    async fn mock_gateway_missing_entities() {
        let gateway = MockGateway::new(Domain::Category);
        let missing = RemoteId::new("ct_42");

        assert!(gateway
            .update(&missing, &category("Food"))
            .await
            .unwrap_err()
            .is_not_found());
        assert!(gateway.delete(&missing).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn mock_gateway_rejects_named_payloads_and_wrong_domain() {
        let gateway = MockGateway::new(Domain::Category);
        gateway.reject_name("Taken", GatewayError::from_status(409, "duplicate"));

        let err = gateway.create(&category("Taken")).await.unwrap_err();
        assert!(matches!(err, GatewayError::Client { status: 409, .. }));

        let gateway = MockGateway::new(Domain::Transaction);
        let err = gateway.create(&category("Food")).await.unwrap_err();
        assert!(matches!(err, GatewayError::Client { status: 400, .. }));
    }
}
