//! Output module for run summaries and statistics
//!
//! This module handles:
//! - Building a report of one run from the ledger
//! - Rendering that report as markdown
//! - Printing ledger statistics and end-of-run summaries

mod markdown;
pub mod stats;

pub use markdown::{format_markdown_summary, generate_markdown_summary};
pub use stats::{load_statistics, print_run_summary, print_statistics, LedgerStatistics};

use crate::state::{AttemptResult, DedupIndex};
use crate::storage::{Ledger, LedgerError, RunRecord};
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("No runs recorded in the ledger")]
    NoRuns,
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Everything a summary needs to know about one run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run: RunRecord,
    pub succeeded: u64,
    pub failed: u64,
    /// Failed attempts in recorded order
    pub failures: Vec<AttemptResult>,
    /// Content hashes shared by two or more targets, with those targets
    pub duplicate_groups: Vec<(String, Vec<String>)>,
}

impl RunReport {
    pub fn total(&self) -> u64 {
        self.succeeded + self.failed
    }

    pub fn success_rate(&self) -> f64 {
        if self.total() == 0 {
            0.0
        } else {
            self.succeeded as f64 / self.total() as f64 * 100.0
        }
    }
}

/// Builds the report for `run_id` from its recorded attempts
pub fn build_run_report(ledger: &dyn Ledger, run_id: i64) -> OutputResult<RunReport> {
    let run = ledger.get_run(run_id)?;
    let attempts = ledger.attempts_for_run(run_id)?;

    let mut dedup = DedupIndex::new();
    let mut failures = Vec::new();
    let mut succeeded = 0;

    for attempt in attempts {
        if attempt.is_success() {
            succeeded += 1;
            if let Some(hash) = &attempt.content_hash {
                dedup.observe(hash, &attempt.target_id);
            }
        } else {
            failures.push(attempt);
        }
    }

    Ok(RunReport {
        run,
        succeeded,
        failed: failures.len() as u64,
        failures,
        duplicate_groups: dedup.duplicate_groups(),
    })
}

/// Builds the report for the most recent run
pub fn latest_run_report(ledger: &dyn Ledger) -> OutputResult<RunReport> {
    let run = ledger.get_latest_run()?.ok_or(OutputError::NoRuns)?;
    build_run_report(ledger, run.id)
}
