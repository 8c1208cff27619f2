//! Cashflow and budget read models.
//!
//! Cashflow is not a stored domain of its own: expenses live in the
//! transaction domain and incomes in the income domain. These helpers
//! combine the two for display, and split a backend cashflow history
//! back into per-domain remote records.

use crate::payload::{BudgetPayload, IncomePayload, IncomeType, Payload, TransactionPayload};
use crate::record::{Record, RemoteRecord};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Currency assumed when there are no budgets to take one from.
const DEFAULT_CURRENCY: &str = "IDR";

/// Direction of a cashflow entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CashflowKind {
    /// Money out (transaction domain).
    Expense,
    /// Money in (income domain).
    Income,
}

/// One line of the combined cashflow view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashflowEntry {
    /// Local id for locally built entries, remote id for backend history.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Amount, always positive.
    pub amount: Decimal,
    /// Category (expenses) or income type (incomes).
    pub category: String,
    /// Direction.
    #[serde(rename = "type")]
    pub kind: CashflowKind,
    /// When it happened.
    pub date: DateTime<Utc>,
}

/// Builds the combined cashflow view from local records.
///
/// Only transactions and incomes dated within `[from, to]` are included.
/// Delete tombstones are skipped. Entries are sorted newest first.
pub fn cashflow_entries(
    records: &[Record],
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Vec<CashflowEntry> {
    let mut entries: Vec<CashflowEntry> = records
        .iter()
        .filter(|record| !record.is_tombstone())
        .filter_map(|record| match &record.payload {
            Payload::Transaction(tx) => Some(CashflowEntry {
                id: record.local_id.to_string(),
                title: tx.name.clone(),
                amount: tx.amount,
                category: tx.category.clone(),
                kind: CashflowKind::Expense,
                date: tx.datetime,
            }),
            Payload::Income(income) => Some(CashflowEntry {
                id: record.local_id.to_string(),
                title: income.name.clone(),
                amount: income.amount,
                category: income_type_label(income.income_type).to_string(),
                kind: CashflowKind::Income,
                date: income.datetime,
            }),
            _ => None,
        })
        .filter(|entry| entry.date >= from && entry.date <= to)
        .collect();

    entries.sort_by(|a, b| b.date.cmp(&a.date));
    entries
}

fn income_type_label(income_type: IncomeType) -> &'static str {
    match income_type {
        IncomeType::Salary => "SALARY",
        IncomeType::Freelance => "FREELANCE",
        IncomeType::Business => "BUSINESS",
        IncomeType::Investment => "INVESTMENT",
        IncomeType::Gift => "GIFT",
        IncomeType::Refund => "REFUND",
        IncomeType::Other => "OTHER",
    }
}

/// Income versus expense totals for a labelled period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashflowSummary {
    /// Sum of incomes.
    pub total_income: Decimal,
    /// Sum of expenses.
    pub total_expense: Decimal,
    /// Income minus expense.
    pub net_balance: Decimal,
    /// Human label of the period, e.g. `October 2026`.
    pub period_label: String,
}

impl CashflowSummary {
    /// Summarises a set of entries.
    pub fn from_entries(entries: &[CashflowEntry], period_label: impl Into<String>) -> Self {
        let (total_income, total_expense) =
            entries
                .iter()
                .fold((Decimal::ZERO, Decimal::ZERO), |(inc, exp), entry| {
                    match entry.kind {
                        CashflowKind::Income => (inc + entry.amount, exp),
                        CashflowKind::Expense => (inc, exp + entry.amount),
                    }
                });

        Self {
            total_income,
            total_expense,
            net_balance: total_income - total_expense,
            period_label: period_label.into(),
        }
    }
}

/// A backend cashflow history split by domain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CashflowSplit {
    /// Expense entries as transaction-domain remote records.
    pub expenses: Vec<RemoteRecord>,
    /// Income entries as income-domain remote records.
    pub incomes: Vec<RemoteRecord>,
}

/// Splits a backend cashflow history into transaction and income records.
///
/// History entries carry no income type, so incomes come back as
/// [`IncomeType::Other`]. The entry date doubles as the server timestamp.
pub fn split_cashflow_history(entries: impl IntoIterator<Item = CashflowEntry>) -> CashflowSplit {
    let mut split = CashflowSplit::default();

    for entry in entries {
        match entry.kind {
            CashflowKind::Expense => split.expenses.push(RemoteRecord::new(
                entry.id,
                Payload::Transaction(TransactionPayload {
                    name: entry.title,
                    category: entry.category,
                    amount: entry.amount,
                    datetime: entry.date,
                    note: None,
                }),
                entry.date,
            )),
            CashflowKind::Income => split.incomes.push(RemoteRecord::new(
                entry.id,
                Payload::Income(IncomePayload {
                    name: entry.title,
                    amount: entry.amount,
                    datetime: entry.date,
                    income_type: IncomeType::Other,
                    source: None,
                    asset_id: None,
                    is_recurring: false,
                    frequency: None,
                    note: None,
                }),
                entry.date,
            )),
        }
    }

    split
}

/// Totals across a set of budgets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetSummary {
    /// Sum of budgeted amounts.
    pub total_budget: Decimal,
    /// Sum of spent amounts.
    pub total_spent: Decimal,
    /// Sum of remaining amounts.
    pub total_remaining: Decimal,
    /// Currency of the first budget.
    pub currency: String,
}

impl BudgetSummary {
    /// Summarises budgets computed locally (used while offline).
    pub fn from_budgets<'a>(budgets: impl IntoIterator<Item = &'a BudgetPayload>) -> Self {
        let mut summary = Self {
            total_budget: Decimal::ZERO,
            total_spent: Decimal::ZERO,
            total_remaining: Decimal::ZERO,
            currency: String::new(),
        };

        for budget in budgets {
            if summary.currency.is_empty() {
                summary.currency = budget.currency.clone();
            }
            summary.total_budget += budget.amount;
            summary.total_spent += budget.spent;
            summary.total_remaining += budget.remaining;
        }

        if summary.currency.is_empty() {
            summary.currency = DEFAULT_CURRENCY.to_string();
        }
        summary
    }
}
