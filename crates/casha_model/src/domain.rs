//! Synced entity families.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// An entity family with its own local partition and remote endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    /// Expense transactions.
    Transaction,
    /// Income entries (the income half of cashflow).
    Income,
    /// Monthly budgets.
    Budget,
    /// Spending categories.
    Category,
}

impl Domain {
    /// All domains, in the order the orchestrator reports them.
    pub const ALL: [Domain; 4] = [
        Domain::Transaction,
        Domain::Income,
        Domain::Budget,
        Domain::Category,
    ];

    /// Returns the canonical lowercase name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Domain::Transaction => "transaction",
            Domain::Income => "income",
            Domain::Budget => "budget",
            Domain::Category => "category",
        }
    }

    /// Returns the prefix the backend uses for remote ids of this domain.
    pub const fn remote_prefix(&self) -> &'static str {
        match self {
            Domain::Transaction => "tx",
            Domain::Income => "in",
            Domain::Budget => "bg",
            Domain::Category => "ct",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a domain name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown domain: {0}")]
pub struct ParseDomainError(pub String);

impl FromStr for Domain {
    type Err = ParseDomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "transaction" | "transactions" | "expense" => Ok(Domain::Transaction),
            "income" | "incomes" | "cashflow" => Ok(Domain::Income),
            "budget" | "budgets" => Ok(Domain::Budget),
            "category" | "categories" => Ok(Domain::Category),
            _ => Err(ParseDomainError(s.to_string())),
        }
    }
}
