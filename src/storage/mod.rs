//! Storage module for persisting harvest results
//!
//! This module handles:
//! - The SQLite resume ledger (runs and append-only attempts)
//! - The line-delimited JSON attempt report and the plain-text error log
//! - Atomic icon file writes
//! - The recorder task that serializes all attempt writes

mod icons;
mod recorder;
mod report;
mod schema;
mod sqlite;
mod traits;

pub use icons::{
    ensure_output_dir, extension_for_content_type, IconStore, PersistError,
    DEFAULT_ICON_EXTENSION,
};
pub use recorder::Recorder;
pub use report::{ErrorLog, ReportWriter};
pub use sqlite::SqliteLedger;
pub use traits::{Ledger, LedgerError, LedgerResult};

use std::path::Path;

/// Opens the ledger at `path` only if it already exists
///
/// Read-only modes use this so they never leave an empty database behind.
pub fn open_existing_ledger(path: &Path) -> Result<Option<SqliteLedger>, LedgerError> {
    if !path.exists() {
        return Ok(None);
    }
    SqliteLedger::new(path).map(Some)
}

/// Represents a harvest run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
}

/// Status of a harvest run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
