//! Ledger trait and error types
//!
//! This module defines the interface of the resume ledger and its error type.

use crate::state::{AttemptResult, AttemptStatus, Strategy};
use crate::storage::{RunRecord, RunStatus};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Errors that can occur during ledger operations
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Corrupt ledger row: {0}")]
    Corrupt(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Durable record of runs and attempts
///
/// The ledger is the `target_id -> last known status` map used for resume.
/// Attempt rows are append-only.
pub trait Ledger: Send {
    // ===== Run Management =====

    /// Creates a new run and returns its ID
    fn create_run(&mut self, config_hash: &str) -> LedgerResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> LedgerResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> LedgerResult<Option<RunRecord>>;

    /// Marks a run as finished with the given status
    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> LedgerResult<()>;

    /// Marks a run as completed with a finish timestamp
    fn complete_run(&mut self, run_id: i64) -> LedgerResult<()> {
        self.finish_run(run_id, RunStatus::Completed)
    }

    /// Marks a run as failed with a finish timestamp
    fn fail_run(&mut self, run_id: i64) -> LedgerResult<()> {
        self.finish_run(run_id, RunStatus::Failed)
    }

    // ===== Attempts =====

    /// Appends one attempt to the ledger
    fn record_attempt(&mut self, run_id: i64, attempt: &AttemptResult) -> LedgerResult<()>;

    /// Last recorded status of a target across all runs
    fn last_status(&self, target_id: &str) -> LedgerResult<Option<AttemptStatus>>;

    /// Targets whose last recorded attempt succeeded
    fn succeeded_target_ids(&self) -> LedgerResult<HashSet<String>>;

    /// All attempts of one run in recording order
    fn attempts_for_run(&self, run_id: i64) -> LedgerResult<Vec<AttemptResult>>;

    /// Failed attempts of one run in recording order
    fn failed_attempts(&self, run_id: i64) -> LedgerResult<Vec<AttemptResult>> {
        Ok(self
            .attempts_for_run(run_id)?
            .into_iter()
            .filter(|attempt| !attempt.is_success())
            .collect())
    }

    // ===== Statistics =====

    /// Number of attempts per status across all runs
    fn count_attempts_by_status(&self) -> LedgerResult<HashMap<AttemptStatus, u64>>;

    /// Number of successful attempts per strategy across all runs
    fn count_successes_by_strategy(&self) -> LedgerResult<HashMap<Strategy, u64>>;

    /// Number of distinct targets ever attempted
    fn count_targets(&self) -> LedgerResult<u64>;
}
