//! Property-based test generators using proptest.
//!
//! Provides strategies for generating valid payloads and sequences of
//! local mutations, plus a helper that replays a sequence against a store.

use casha_model::{
    BudgetPayload, CategoryPayload, Domain, IncomePayload, IncomeType, LocalId, Payload, Record,
    RemoteId, SyncState, TransactionPayload,
};
use casha_store::{RecordStore, RecordStoreExt, StoreResult};
use chrono::Duration;
use proptest::prelude::*;
use rust_decimal::Decimal;

use crate::fixtures::{at_minute, base_time};

/// Strategy for positive amounts with two decimal places.
pub fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy for non-empty display names.
pub fn name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Z][a-z]{2,11}( [a-z]{3,8})?").expect("Invalid regex")
}

/// Strategy for any of the four domains.
pub fn domain_strategy() -> impl Strategy<Value = Domain> {
    prop::sample::select(Domain::ALL.to_vec())
}

fn income_type_strategy() -> impl Strategy<Value = IncomeType> {
    prop_oneof![
        Just(IncomeType::Salary),
        Just(IncomeType::Freelance),
        Just(IncomeType::Business),
        Just(IncomeType::Investment),
        Just(IncomeType::Gift),
        Just(IncomeType::Refund),
        Just(IncomeType::Other),
    ]
}

/// Strategy for payloads of `domain` that pass the built-in domain rules.
pub fn payload_strategy(domain: Domain) -> BoxedStrategy<Payload> {
    match domain {
        Domain::Transaction => (name_strategy(), name_strategy(), amount_strategy(), 0i64..43_200)
            .prop_map(|(name, category, amount, minute)| {
                Payload::Transaction(TransactionPayload {
                    name,
                    category,
                    amount,
                    datetime: at_minute(minute),
                    note: None,
                })
            })
            .boxed(),
        Domain::Income => (
            name_strategy(),
            amount_strategy(),
            income_type_strategy(),
            0i64..43_200,
        )
            .prop_map(|(name, amount, income_type, minute)| {
                Payload::Income(IncomePayload {
                    name,
                    amount,
                    datetime: at_minute(minute),
                    income_type,
                    source: None,
                    asset_id: None,
                    is_recurring: false,
                    frequency: None,
                    note: None,
                })
            })
            .boxed(),
        Domain::Budget => (name_strategy(), amount_strategy(), 0i64..=100)
            .prop_map(|(category, amount, percent)| {
                let spent = (amount * Decimal::new(percent, 2)).round_dp(2);
                Payload::Budget(BudgetPayload {
                    amount,
                    spent,
                    remaining: amount - spent,
                    period: "2026-10".to_string(),
                    start_date: base_time(),
                    end_date: base_time() + Duration::days(30),
                    category,
                    currency: "IDR".to_string(),
                })
            })
            .boxed(),
        Domain::Category => (name_strategy(), any::<bool>())
            .prop_map(|(name, is_active)| Payload::Category(CategoryPayload { name, is_active }))
            .boxed(),
    }
}

/// A local mutation, addressed by slot into the records created so far.
#[derive(Debug, Clone)]
pub enum Mutation {
    /// Create a record
    Create(Payload),
    /// Edit the record in a slot
    Update {
        /// Slot index (taken modulo the number of created records)
        slot: usize,
        /// New payload
        payload: Payload,
    },
    /// Delete the record in a slot
    Delete {
        /// Slot index
        slot: usize,
    },
    /// Acknowledge the slot's pending operation as a successful push would
    Acknowledge {
        /// Slot index
        slot: usize,
    },
}

/// Strategy for mutations of one domain.
pub fn mutation_strategy(domain: Domain) -> impl Strategy<Value = Mutation> {
    prop_oneof![
        3 => payload_strategy(domain).prop_map(Mutation::Create),
        2 => (any::<usize>(), payload_strategy(domain))
            .prop_map(|(slot, payload)| Mutation::Update { slot, payload }),
        1 => any::<usize>().prop_map(|slot| Mutation::Delete { slot }),
        2 => any::<usize>().prop_map(|slot| Mutation::Acknowledge { slot }),
    ]
}

/// Strategy for a sequence of mutations of one domain.
pub fn mutation_sequence_strategy(
    domain: Domain,
    min_ops: usize,
    max_ops: usize,
) -> impl Strategy<Value = Vec<Mutation>> {
    prop::collection::vec(mutation_strategy(domain), min_ops..max_ops)
}

/// Replays `mutations` against `store`, returning the local id of every
/// record created, in creation order.
///
/// Updates of tombstones are skipped, as the app never offers editing a
/// deleted record. `Acknowledge` assigns remote ids `{prefix}_{n}` the way
/// the backend would.
///
/// # Errors
///
/// Returns the first store error that is not a rejected tombstone edit.
pub fn apply_mutations(
    store: &dyn RecordStore,
    mutations: &[Mutation],
) -> StoreResult<Vec<LocalId>> {
    let mut created: Vec<LocalId> = Vec::new();
    let mut next_remote = 1u64;

    for (step, mutation) in mutations.iter().enumerate() {
        let at = at_minute(step as i64);
        match mutation {
            Mutation::Create(payload) => {
                created.push(store.record_create(payload.clone(), at)?.local_id);
            }
            Mutation::Update { slot, payload } => {
                let Some(local_id) = pick(&created, *slot) else {
                    continue;
                };
                match store.get(local_id)? {
                    Some(record) if !record.is_tombstone() => {
                        store.record_update(local_id, payload.clone(), at)?;
                    }
                    _ => {}
                }
            }
            Mutation::Delete { slot } => {
                if let Some(local_id) = pick(&created, *slot) {
                    store.record_delete(local_id, at)?;
                }
            }
            Mutation::Acknowledge { slot } => {
                let Some(local_id) = pick(&created, *slot) else {
                    continue;
                };
                let Some(record) = store.get(local_id)? else {
                    continue;
                };
                acknowledge(store, record, &mut next_remote)?;
            }
        }
    }
    Ok(created)
}

fn pick(created: &[LocalId], slot: usize) -> Option<LocalId> {
    if created.is_empty() {
        None
    } else {
        Some(created[slot % created.len()])
    }
}

fn acknowledge(store: &dyn RecordStore, record: Record, next_remote: &mut u64) -> StoreResult<()> {
    let remote_id = match &record.sync_state {
        SyncState::Synced { .. } => return Ok(()),
        SyncState::PendingDelete { .. } => {
            store.delete(record.local_id)?;
            return Ok(());
        }
        SyncState::PendingUpdate { remote_id } => remote_id.clone(),
        SyncState::PendingCreate => {
            let id = RemoteId::new(format!("{}_{}", record.domain().remote_prefix(), next_remote));
            *next_remote += 1;
            id
        }
    };
    store.upsert(Record {
        sync_state: SyncState::Synced { remote_id },
        unresolved: None,
        ..record
    })
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
