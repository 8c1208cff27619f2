//! Run command implementation.

use super::{CliError, Fixture, OutputFormat, Workspace};
use casha_model::Domain;
use casha_sync_engine::{SyncConfig, SyncSessionResult};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Options of the run command.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Only sync this domain.
    pub domain: Option<Domain>,
    /// Simulate a device without network.
    pub offline: bool,
    /// Where to write the resulting state.
    pub output: Option<PathBuf>,
    /// Per-call timeout.
    pub call_timeout: Duration,
}

/// Result of the run command.
#[derive(Debug, Serialize)]
pub struct RunReport {
    /// One result per domain synced.
    pub sessions: Vec<SyncSessionResult>,
    /// Records still waiting to be pushed after the run.
    pub unsynced: usize,
}

/// Runs the run command.
pub async fn run(fixture: &Path, options: &RunOptions) -> Result<RunReport, CliError> {
    let workspace = Workspace::from_fixture(Fixture::load(fixture)?, options.offline);
    let orchestrator =
        workspace.orchestrator(SyncConfig::new().with_call_timeout(options.call_timeout))?;

    tracing::info!(fixture = %fixture.display(), domain = ?options.domain, offline = options.offline, "running sync");
    let sessions = orchestrator.on_manual_refresh(options.domain).await?;

    let snapshot = workspace.snapshot();
    let unsynced = snapshot.local.iter().filter(|record| record.is_dirty()).count();
    if let Some(output) = &options.output {
        snapshot.save(output)?;
        tracing::info!(output = %output.display(), "state written");
    }

    Ok(RunReport { sessions, unsynced })
}

/// Formats a report for printing.
pub fn render(report: &RunReport, format: OutputFormat) -> Result<String, CliError> {
    if format == OutputFormat::Json {
        return Ok(serde_json::to_string_pretty(report)?);
    }

    let mut out = String::new();
    for session in &report.sessions {
        let _ = write!(
            out,
            "{:<12} #{} {:?}: {}/{} pushed",
            session.domain.as_str(),
            session.session_id,
            session.status,
            session.succeeded,
            session.attempted,
        );
        if let Some(pull) = &session.pull {
            let _ = write!(
                out,
                ", pulled +{} ~{} -{}",
                pull.inserted, pull.updated, pull.deleted
            );
        }
        if let Some(error) = &session.error {
            let _ = write!(out, " ({error})");
        }
        out.push('\n');
        for failure in &session.failures {
            let _ = writeln!(
                out,
                "  {} {}: {}",
                failure.operation, failure.local_id, failure.error
            );
        }
    }
    let _ = write!(out, "{} record(s) unsynced", report.unsynced);
    Ok(out)
}
