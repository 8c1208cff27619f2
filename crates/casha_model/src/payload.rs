//! Domain payloads.
//!
//! A payload is the user-visible content of a record. It is what gets sent
//! to the backend on create/update and what the backend returns in its
//! canonical form.

use crate::domain::Domain;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An expense transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionPayload {
    /// Display name.
    pub name: String,
    /// Category name.
    pub category: String,
    /// Amount spent.
    pub amount: Decimal,
    /// When the expense happened.
    pub datetime: DateTime<Utc>,
    /// Free-form note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Kind of income.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncomeType {
    /// Regular salary.
    Salary,
    /// Freelance work.
    Freelance,
    /// Business revenue.
    Business,
    /// Investment returns.
    Investment,
    /// Gifts received.
    Gift,
    /// Refunds.
    Refund,
    /// Anything else.
    Other,
}

/// How often a recurring income repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncomeFrequency {
    /// Every day.
    Daily,
    /// Every week.
    Weekly,
    /// Every two weeks.
    Biweekly,
    /// Every month.
    Monthly,
    /// Every year.
    Yearly,
}

/// An income entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomePayload {
    /// Display name.
    pub name: String,
    /// Amount received.
    pub amount: Decimal,
    /// When the income was received.
    pub datetime: DateTime<Utc>,
    /// Kind of income.
    #[serde(rename = "type")]
    pub income_type: IncomeType,
    /// Payer or source description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Linked asset, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<String>,
    /// Whether this income repeats.
    #[serde(default)]
    pub is_recurring: bool,
    /// Repeat cadence for recurring income.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<IncomeFrequency>,
    /// Free-form note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// A budget for one category over one period.
///
/// `spent` and `remaining` are computed by the backend; local values are
/// provisional until the server's canonical copy comes back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetPayload {
    /// Budgeted amount.
    pub amount: Decimal,
    /// Amount spent so far.
    pub spent: Decimal,
    /// Amount left.
    pub remaining: Decimal,
    /// Period label, e.g. `2026-10`.
    pub period: String,
    /// First day covered.
    pub start_date: DateTime<Utc>,
    /// Last day covered.
    pub end_date: DateTime<Utc>,
    /// Category name.
    pub category: String,
    /// ISO currency code.
    pub currency: String,
}

/// A spending category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryPayload {
    /// Category name.
    pub name: String,
    /// Whether the category is offered for new entries.
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

/// The content of a record, tagged by domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "domain", rename_all = "snake_case")]
pub enum Payload {
    /// Transaction payload.
    Transaction(TransactionPayload),
    /// Income payload.
    Income(IncomePayload),
    /// Budget payload.
    Budget(BudgetPayload),
    /// Category payload.
    Category(CategoryPayload),
}

impl Payload {
    /// Returns the domain this payload belongs to.
    pub fn domain(&self) -> Domain {
        match self {
            Payload::Transaction(_) => Domain::Transaction,
            Payload::Income(_) => Domain::Income,
            Payload::Budget(_) => Domain::Budget,
            Payload::Category(_) => Domain::Category,
        }
    }

    /// Returns the display name, if the domain has one.
    pub fn name(&self) -> Option<&str> {
        match self {
            Payload::Transaction(tx) => Some(&tx.name),
            Payload::Income(income) => Some(&income.name),
            Payload::Category(category) => Some(&category.name),
            Payload::Budget(_) => None,
        }
    }

    /// Returns the monetary amount, if the domain has one.
    pub fn amount(&self) -> Option<Decimal> {
        match self {
            Payload::Transaction(tx) => Some(tx.amount),
            Payload::Income(income) => Some(income.amount),
            Payload::Budget(budget) => Some(budget.amount),
            Payload::Category(_) => None,
        }
    }
}

impl From<TransactionPayload> for Payload {
    fn from(payload: TransactionPayload) -> Self {
        Payload::Transaction(payload)
    }
}

impl From<IncomePayload> for Payload {
    fn from(payload: IncomePayload) -> Self {
        Payload::Income(payload)
    }
}

impl From<BudgetPayload> for Payload {
    fn from(payload: BudgetPayload) -> Self {
        Payload::Budget(payload)
    }
}

impl From<CategoryPayload> for Payload {
    fn from(payload: CategoryPayload) -> Self {
        Payload::Category(payload)
    }
}
