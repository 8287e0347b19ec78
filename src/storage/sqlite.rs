//! SQLite ledger implementation
//!
//! This module provides a SQLite-based implementation of the Ledger trait.

use crate::state::{AttemptResult, AttemptStatus, Strategy};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Ledger, LedgerError, LedgerResult};
use crate::storage::{RunRecord, RunStatus};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::{HashMap, HashSet};
use std::path::Path;

const ATTEMPT_COLUMNS: &str = "target_id, title, url, status, strategy, icon_url, local_path, \
     byte_length, content_hash, duplicate_of, duration_ms, error, recorded_at";

/// SQLite ledger backend
pub struct SqliteLedger {
    conn: Connection,
}

impl SqliteLedger {
    /// Opens or creates the ledger database at `path`
    ///
    /// Missing parent directories are created.
    pub fn new(path: &Path) -> Result<Self, LedgerError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory ledger (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, LedgerError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
            .unwrap_or(RunStatus::Running),
    })
}

/// Raw attempt row; converted to `AttemptResult` outside the rusqlite closure
struct AttemptRow {
    target_id: String,
    title: String,
    url: String,
    status: String,
    strategy: String,
    icon_url: Option<String>,
    local_path: Option<String>,
    byte_length: Option<i64>,
    content_hash: Option<String>,
    duplicate_of: Option<String>,
    duration_ms: i64,
    error: Option<String>,
    recorded_at: String,
}

fn attempt_row(row: &Row<'_>) -> rusqlite::Result<AttemptRow> {
    Ok(AttemptRow {
        target_id: row.get(0)?,
        title: row.get(1)?,
        url: row.get(2)?,
        status: row.get(3)?,
        strategy: row.get(4)?,
        icon_url: row.get(5)?,
        local_path: row.get(6)?,
        byte_length: row.get(7)?,
        content_hash: row.get(8)?,
        duplicate_of: row.get(9)?,
        duration_ms: row.get(10)?,
        error: row.get(11)?,
        recorded_at: row.get(12)?,
    })
}

impl AttemptRow {
    fn into_attempt(self) -> LedgerResult<AttemptResult> {
        let status = AttemptStatus::from_db_string(&self.status)
            .ok_or_else(|| LedgerError::Corrupt(format!("unknown status '{}'", self.status)))?;
        let strategy = Strategy::from_db_string(&self.strategy)
            .ok_or_else(|| LedgerError::Corrupt(format!("unknown strategy '{}'", self.strategy)))?;
        let recorded_at = DateTime::parse_from_rfc3339(&self.recorded_at)
            .map_err(|e| LedgerError::Corrupt(format!("bad timestamp: {}", e)))?
            .with_timezone(&Utc);

        Ok(AttemptResult {
            target_id: self.target_id,
            title: self.title,
            url: self.url,
            status,
            strategy,
            icon_url: self.icon_url,
            local_path: self.local_path,
            byte_length: self.byte_length.map(|n| n as u64),
            content_hash: self.content_hash,
            duplicate_of: self.duplicate_of,
            duration_ms: self.duration_ms as u64,
            error: self.error,
            recorded_at,
        })
    }
}

impl Ledger for SqliteLedger {
    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> LedgerResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> LedgerResult<RunRecord> {
        self.conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status FROM runs WHERE id = ?1",
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or(LedgerError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> LedgerResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status FROM runs ORDER BY id DESC LIMIT 1",
                [],
                run_from_row,
            )
            .optional()?;
        Ok(run)
    }

    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> LedgerResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.to_db_string(), now, run_id],
        )?;
        if updated == 0 {
            return Err(LedgerError::RunNotFound(run_id));
        }
        Ok(())
    }

    // ===== Attempts =====

    fn record_attempt(&mut self, run_id: i64, attempt: &AttemptResult) -> LedgerResult<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO attempts (run_id, {}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                ATTEMPT_COLUMNS
            ),
            params![
                run_id,
                attempt.target_id,
                attempt.title,
                attempt.url,
                attempt.status.to_db_string(),
                attempt.strategy.to_db_string(),
                attempt.icon_url,
                attempt.local_path,
                attempt.byte_length.map(|n| n as i64),
                attempt.content_hash,
                attempt.duplicate_of,
                attempt.duration_ms as i64,
                attempt.error,
                attempt.recorded_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn last_status(&self, target_id: &str) -> LedgerResult<Option<AttemptStatus>> {
        let status: Option<String> = self
            .conn
            .query_row(
                "SELECT status FROM attempts WHERE target_id = ?1 ORDER BY id DESC LIMIT 1",
                params![target_id],
                |row| row.get(0),
            )
            .optional()?;

        status
            .map(|s| {
                AttemptStatus::from_db_string(&s)
                    .ok_or_else(|| LedgerError::Corrupt(format!("unknown status '{}'", s)))
            })
            .transpose()
    }

    fn succeeded_target_ids(&self) -> LedgerResult<HashSet<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT target_id FROM attempts
             WHERE id IN (SELECT MAX(id) FROM attempts GROUP BY target_id)
               AND status = ?1",
        )?;

        let ids = stmt
            .query_map(params![AttemptStatus::Success.to_db_string()], |row| {
                row.get(0)
            })?
            .collect::<Result<HashSet<String>, _>>()?;

        Ok(ids)
    }

    fn attempts_for_run(&self, run_id: i64) -> LedgerResult<Vec<AttemptResult>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM attempts WHERE run_id = ?1 ORDER BY id",
            ATTEMPT_COLUMNS
        ))?;

        let rows = stmt
            .query_map(params![run_id], attempt_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(AttemptRow::into_attempt).collect()
    }

    // ===== Statistics =====

    fn count_attempts_by_status(&self) -> LedgerResult<HashMap<AttemptStatus, u64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT status, COUNT(*) FROM attempts GROUP BY status")?;

        let mut counts = HashMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        for row in rows {
            let (status, count) = row?;
            if let Some(status) = AttemptStatus::from_db_string(&status) {
                counts.insert(status, count as u64);
            }
        }

        Ok(counts)
    }

    fn count_successes_by_strategy(&self) -> LedgerResult<HashMap<Strategy, u64>> {
        let mut stmt = self.conn.prepare(
            "SELECT strategy, COUNT(*) FROM attempts WHERE status = ?1 GROUP BY strategy",
        )?;

        let mut counts = HashMap::new();
        let rows = stmt.query_map(params![AttemptStatus::Success.to_db_string()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        for row in rows {
            let (strategy, count) = row?;
            if let Some(strategy) = Strategy::from_db_string(&strategy) {
                counts.insert(strategy, count as u64);
            }
        }

        Ok(counts)
    }

    fn count_targets(&self) -> LedgerResult<u64> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(DISTINCT target_id) FROM attempts", [], |row| {
                    row.get(0)
                })?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Target;
    use crate::state::SavedIcon;
    use url::Url;

    fn target(id: &str) -> Target {
        Target {
            id: id.to_string(),
            title: format!("Site {}", id),
            url: Url::parse(&format!("https://{}.example.com/", id)).unwrap(),
        }
    }

    fn success(id: &str) -> AttemptResult {
        AttemptResult::success(
            &target(id),
            SavedIcon {
                strategy: Strategy::HtmlParsed,
                icon_url: format!("https://{}.example.com/icon.png", id),
                local_path: format!("icons/{}.example.com.png", id),
                byte_length: 128,
                content_hash: "0f".repeat(32),
                duplicate_of: None,
            },
            25,
        )
    }

    fn failure(id: &str) -> AttemptResult {
        AttemptResult::failed(&target(id), Strategy::None, None, "no icon", 30)
    }

    #[test]
    fn test_create_run() {
        let mut ledger = SqliteLedger::new_in_memory().unwrap();
        let run_id = ledger.create_run("test_hash").unwrap();
        assert!(run_id > 0);

        let run = ledger.get_run(run_id).unwrap();
        assert_eq!(run.status, RunStatus::Running);
        assert_eq!(run.config_hash, "test_hash");
        assert!(run.finished_at.is_none());
    }

    #[test]
    fn test_complete_run() {
        let mut ledger = SqliteLedger::new_in_memory().unwrap();
        let run_id = ledger.create_run("h").unwrap();
        ledger.complete_run(run_id).unwrap();

        let latest = ledger.get_latest_run().unwrap().unwrap();
        assert_eq!(latest.id, run_id);
        assert_eq!(latest.status, RunStatus::Completed);
        assert!(latest.finished_at.is_some());
    }

    #[test]
    fn test_finish_unknown_run() {
        let mut ledger = SqliteLedger::new_in_memory().unwrap();
        assert!(matches!(
            ledger.fail_run(99),
            Err(LedgerError::RunNotFound(99))
        ));
    }

    #[test]
    fn test_attempt_roundtrip() {
        let mut ledger = SqliteLedger::new_in_memory().unwrap();
        let run_id = ledger.create_run("h").unwrap();
        let attempt = success("a");
        ledger.record_attempt(run_id, &attempt).unwrap();

        let stored = ledger.attempts_for_run(run_id).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].target_id, "a");
        assert_eq!(stored[0].strategy, Strategy::HtmlParsed);
        assert_eq!(stored[0].byte_length, Some(128));
        assert_eq!(stored[0].recorded_at, attempt.recorded_at);
    }

    #[test]
    fn test_succeeded_ids_use_last_status() {
        let mut ledger = SqliteLedger::new_in_memory().unwrap();
        let first = ledger.create_run("h").unwrap();
        ledger.record_attempt(first, &success("a")).unwrap();
        ledger.record_attempt(first, &failure("b")).unwrap();
        ledger.record_attempt(first, &success("c")).unwrap();

        let second = ledger.create_run("h").unwrap();
        ledger.record_attempt(second, &success("b")).unwrap();
        ledger.record_attempt(second, &failure("c")).unwrap();

        let ids = ledger.succeeded_target_ids().unwrap();
        assert!(ids.contains("a"));
        assert!(ids.contains("b"));
        assert!(!ids.contains("c"));

        assert_eq!(ledger.last_status("c").unwrap(), Some(AttemptStatus::Failed));
        assert_eq!(ledger.last_status("zzz").unwrap(), None);
    }

    #[test]
    fn test_failed_attempts_filter() {
        let mut ledger = SqliteLedger::new_in_memory().unwrap();
        let run_id = ledger.create_run("h").unwrap();
        ledger.record_attempt(run_id, &success("a")).unwrap();
        ledger.record_attempt(run_id, &failure("b")).unwrap();

        let failed = ledger.failed_attempts(run_id).unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].error.as_deref(), Some("no icon"));
    }

    #[test]
    fn test_statistics() {
        let mut ledger = SqliteLedger::new_in_memory().unwrap();
        let run_id = ledger.create_run("h").unwrap();
        ledger.record_attempt(run_id, &success("a")).unwrap();
        ledger.record_attempt(run_id, &success("b")).unwrap();
        ledger.record_attempt(run_id, &failure("c")).unwrap();
        ledger.record_attempt(run_id, &failure("c")).unwrap();

        let by_status = ledger.count_attempts_by_status().unwrap();
        assert_eq!(by_status.get(&AttemptStatus::Success), Some(&2));
        assert_eq!(by_status.get(&AttemptStatus::Failed), Some(&2));

        let by_strategy = ledger.count_successes_by_strategy().unwrap();
        assert_eq!(by_strategy.get(&Strategy::HtmlParsed), Some(&2));

        assert_eq!(ledger.count_targets().unwrap(), 3);
    }
}
