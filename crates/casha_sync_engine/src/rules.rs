//! Per-domain payload rules.
//!
//! The four coordinators share one reconciliation core. What differs per
//! domain is checked here before any request leaves the device.

use crate::error::{SyncError, SyncResult};
use casha_model::{BudgetPayload, Domain, IncomePayload, Payload, TransactionPayload};
use rust_decimal::Decimal;
use std::sync::Arc;

/// Domain-specific checks applied to a payload before it is pushed.
pub trait DomainRules: Send + Sync {
    /// Returns the domain these rules apply to.
    fn domain(&self) -> Domain;

    /// Checks a payload about to be created or updated remotely.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::ClientValidation`] describing the first problem.
    fn validate(&self, payload: &Payload) -> SyncResult<()>;
}

/// Returns the built-in rules for `domain`.
pub fn rules_for(domain: Domain) -> Arc<dyn DomainRules> {
    match domain {
        Domain::Transaction => Arc::new(TransactionRules),
        Domain::Income => Arc::new(IncomeRules),
        Domain::Budget => Arc::new(BudgetRules),
        Domain::Category => Arc::new(CategoryRules),
    }
}

fn require_name(field: &str, value: &str) -> SyncResult<()> {
    if value.trim().is_empty() {
        return Err(SyncError::validation(format!("{field} must not be empty")));
    }
    Ok(())
}

fn require_positive(field: &str, value: Decimal) -> SyncResult<()> {
    if value <= Decimal::ZERO {
        return Err(SyncError::validation(format!("{field} must be positive")));
    }
    Ok(())
}

fn wrong_domain(expected: Domain, payload: &Payload) -> SyncError {
    SyncError::validation(format!(
        "expected {expected} payload, got {}",
        payload.domain()
    ))
}

/// Rules for expense transactions.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransactionRules;

impl TransactionRules {
    fn check(tx: &TransactionPayload) -> SyncResult<()> {
        require_name("name", &tx.name)?;
        require_name("category", &tx.category)?;
        require_positive("amount", tx.amount)
    }
}

impl DomainRules for TransactionRules {
    fn domain(&self) -> Domain {
        Domain::Transaction
    }

    fn validate(&self, payload: &Payload) -> SyncResult<()> {
        match payload {
            Payload::Transaction(tx) => Self::check(tx),
            other => Err(wrong_domain(self.domain(), other)),
        }
    }
}

/// Rules for income entries.
#[derive(Debug, Clone, Copy, Default)]
pub struct IncomeRules;

impl IncomeRules {
    fn check(income: &IncomePayload) -> SyncResult<()> {
        require_name("name", &income.name)?;
        require_positive("amount", income.amount)
    }
}

impl DomainRules for IncomeRules {
    fn domain(&self) -> Domain {
        Domain::Income
    }

    fn validate(&self, payload: &Payload) -> SyncResult<()> {
        match payload {
            Payload::Income(income) => Self::check(income),
            other => Err(wrong_domain(self.domain(), other)),
        }
    }
}

/// Rules for budgets.
#[derive(Debug, Clone, Copy, Default)]
pub struct BudgetRules;

impl BudgetRules {
    fn check(budget: &BudgetPayload) -> SyncResult<()> {
        require_name("category", &budget.category)?;
        require_positive("amount", budget.amount)?;
        if budget.spent < Decimal::ZERO {
            return Err(SyncError::validation("spent must not be negative"));
        }
        if budget.end_date < budget.start_date {
            return Err(SyncError::validation("end date is before start date"));
        }
        Ok(())
    }
}

impl DomainRules for BudgetRules {
    fn domain(&self) -> Domain {
        Domain::Budget
    }

    fn validate(&self, payload: &Payload) -> SyncResult<()> {
        match payload {
            Payload::Budget(budget) => Self::check(budget),
            other => Err(wrong_domain(self.domain(), other)),
        }
    }
}

/// Rules for categories.
#[derive(Debug, Clone, Copy, Default)]
pub struct CategoryRules;

impl DomainRules for CategoryRules {
    fn domain(&self) -> Domain {
        Domain::Category
    }

    fn validate(&self, payload: &Payload) -> SyncResult<()> {
        match payload {
            Payload::Category(category) => require_name("name", &category.name),
            other => Err(wrong_domain(self.domain(), other)),
        }
    }
}
