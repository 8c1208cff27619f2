//! Payload and record fixtures.
//!
//! Every timestamp is derived from [`base_time`] so tests are deterministic.

use casha_model::{
    BudgetPayload, CategoryPayload, Domain, IncomePayload, IncomeType, Payload, Record,
    RemoteRecord, SyncState, TransactionPayload,
};
use casha_store::MemoryRecordStore;
use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;

/// 2026-10-01 09:00 UTC.
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 1, 9, 0, 0)
        .single()
        .expect("valid fixture time")
}

/// [`base_time`] plus `minutes`.
pub fn at_minute(minutes: i64) -> DateTime<Utc> {
    base_time() + Duration::minutes(minutes)
}

/// An expense in the "Food" category.
pub fn transaction(name: &str, amount: Decimal) -> Payload {
    Payload::Transaction(TransactionPayload {
        name: name.to_string(),
        category: "Food".to_string(),
        amount,
        datetime: base_time(),
        note: None,
    })
}

/// A one-off salary income.
pub fn income(name: &str, amount: Decimal) -> Payload {
    Payload::Income(IncomePayload {
        name: name.to_string(),
        amount,
        datetime: base_time(),
        income_type: IncomeType::Salary,
        source: None,
        asset_id: None,
        is_recurring: false,
        frequency: None,
        note: None,
    })
}

/// An October 2026 budget for `category`, with `remaining` computed.
pub fn budget(category: &str, amount: Decimal, spent: Decimal) -> Payload {
    Payload::Budget(BudgetPayload {
        amount,
        spent,
        remaining: amount - spent,
        period: "2026-10".to_string(),
        start_date: base_time(),
        end_date: base_time() + Duration::days(30),
        category: category.to_string(),
        currency: "IDR".to_string(),
    })
}

/// An active category.
pub fn category(name: &str) -> Payload {
    Payload::Category(CategoryPayload {
        name: name.to_string(),
        is_active: true,
    })
}

/// A valid payload of any domain, titled `name`.
pub fn payload_for(domain: Domain, name: &str) -> Payload {
    let amount = Decimal::new(2500, 2);
    match domain {
        Domain::Transaction => transaction(name, amount),
        Domain::Income => income(name, amount),
        Domain::Budget => budget(name, amount, Decimal::ZERO),
        Domain::Category => category(name),
    }
}

/// A record the backend knows as `remote_id`.
pub fn synced_record(remote_id: &str, payload: Payload, updated_at: DateTime<Utc>) -> Record {
    Record::from_remote(RemoteRecord::new(remote_id, payload, updated_at))
}

/// A never-pushed record.
pub fn pending_create(payload: Payload, updated_at: DateTime<Utc>) -> Record {
    Record::pending_create(payload, updated_at)
}

/// A pushed record with an unpushed edit.
pub fn pending_update(remote_id: &str, payload: Payload, updated_at: DateTime<Utc>) -> Record {
    Record {
        sync_state: SyncState::PendingUpdate {
            remote_id: remote_id.into(),
        },
        ..synced_record(remote_id, payload, updated_at)
    }
}

/// A pushed record with an unpushed delete.
pub fn pending_delete(remote_id: &str, payload: Payload, updated_at: DateTime<Utc>) -> Record {
    Record {
        sync_state: SyncState::PendingDelete {
            remote_id: remote_id.into(),
        },
        ..synced_record(remote_id, payload, updated_at)
    }
}

/// An in-memory store holding `records`.
pub fn seeded_store(records: impl IntoIterator<Item = Record>) -> Arc<MemoryRecordStore> {
    Arc::new(MemoryRecordStore::from_records(records))
}
