//! Status command implementation.

use super::{CliError, Fixture, OutputFormat};
use casha_model::{
    cashflow_entries, BudgetSummary, CashflowSummary, Domain, Payload, Record,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

/// Local state summary.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    /// Records waiting to be pushed, per domain.
    pub unsynced: BTreeMap<Domain, usize>,
    /// Records whose last push was rejected.
    pub unresolved: usize,
    /// Income against expenses over every local entry.
    pub cashflow: CashflowSummary,
    /// Totals across local budgets.
    pub budgets: BudgetSummary,
}

/// Runs the status command.
pub fn run(fixture: &Path) -> Result<StatusReport, CliError> {
    let fixture = Fixture::load(fixture)?;
    Ok(summarize(&fixture.local))
}

fn summarize(records: &[Record]) -> StatusReport {
    let unsynced = Domain::ALL
        .iter()
        .map(|domain| {
            let count = records
                .iter()
                .filter(|record| record.domain() == *domain && record.is_dirty())
                .count();
            (*domain, count)
        })
        .collect();

    let entries = cashflow_entries(records, DateTime::<Utc>::MIN_UTC, DateTime::<Utc>::MAX_UTC);
    let budgets = BudgetSummary::from_budgets(records.iter().filter_map(|record| {
        match &record.payload {
            Payload::Budget(budget) if !record.is_tombstone() => Some(budget),
            _ => None,
        }
    }));

    StatusReport {
        unsynced,
        unresolved: records
            .iter()
            .filter(|record| record.unresolved.is_some())
            .count(),
        cashflow: CashflowSummary::from_entries(&entries, "all time"),
        budgets,
    }
}

/// Formats a report for printing.
pub fn render(report: &StatusReport, format: OutputFormat) -> Result<String, CliError> {
    if format == OutputFormat::Json {
        return Ok(serde_json::to_string_pretty(report)?);
    }

    let mut out = String::new();
    for (domain, count) in &report.unsynced {
        let _ = writeln!(out, "{:<12} {count} unsynced", domain.as_str());
    }
    let _ = writeln!(out, "unresolved   {}", report.unresolved);
    let cashflow = &report.cashflow;
    let _ = writeln!(
        out,
        "cashflow ({}): income {} expense {} net {}",
        cashflow.period_label, cashflow.total_income, cashflow.total_expense, cashflow.net_balance
    );
    let budgets = &report.budgets;
    let _ = write!(
        out,
        "budgets ({}): {} budgeted, {} spent, {} remaining",
        budgets.currency, budgets.total_budget, budgets.total_spent, budgets.total_remaining
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::{lunch, write_fixture};
    use casha_model::{BudgetPayload, SyncState};
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn food_budget() -> Payload {
        let start = Utc.with_ymd_and_hms(2026, 10, 1, 0, 0, 0).unwrap();
        Payload::Budget(BudgetPayload {
            amount: dec!(500),
            spent: dec!(200),
            remaining: dec!(300),
            period: "2026-10".into(),
            start_date: start,
            end_date: start + chrono::Duration::days(30),
            category: "Food".into(),
            currency: "IDR".into(),
        })
    }

    #[test]
    fn status_counts_and_sums_local_records() {
        let now = Utc::now();
        let tombstone = Record {
            sync_state: SyncState::PendingDelete {
                remote_id: "tx_2".into(),
            },
            ..Record::pending_create(lunch(), now)
        };
        let file = write_fixture(&Fixture {
            local: vec![
                Record::pending_create(lunch(), now),
                tombstone,
                Record::pending_create(food_budget(), now),
            ],
            ..Fixture::default()
        });

        let report = run(file.path()).unwrap();

        assert_eq!(report.unsynced[&Domain::Transaction], 2);
        assert_eq!(report.unsynced[&Domain::Budget], 1);
        assert_eq!(report.unsynced[&Domain::Category], 0);
        assert_eq!(report.cashflow.total_expense, dec!(50));
        assert_eq!(report.cashflow.net_balance, dec!(-50));
        assert_eq!(report.budgets.total_remaining, dec!(300));

        let text = render(&report, OutputFormat::Text).unwrap();
        assert!(text.contains("transaction  2 unsynced"));
        assert!(text.contains("budgets (IDR)"));
    }
}
