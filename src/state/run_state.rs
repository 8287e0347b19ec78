use crate::state::attempt::AttemptResult;
use crate::state::dedup::DedupIndex;
use std::time::{Duration, Instant};

/// Process-wide counters for one run
///
/// Lives behind a lock shared by workers and the recorder; dropped when the run ends.
#[derive(Debug)]
pub struct RunState {
    processed: u64,
    succeeded: u64,
    failed: u64,
    skipped: u64,
    started_at: Instant,
    dedup: DedupIndex,
}

/// Snapshot of a run's counters, taken when the run finishes
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub run_id: i64,
    pub processed: u64,
    pub succeeded: u64,
    pub failed: u64,
    /// Targets not attempted because the ledger showed an earlier success
    pub skipped: u64,
    pub unique_hashes: usize,
    pub duplicate_groups: Vec<(String, Vec<String>)>,
    pub elapsed: Duration,
}

impl RunState {
    /// Creates the state for a run that skips `skipped` already-completed targets
    pub fn new(skipped: u64) -> Self {
        Self {
            processed: 0,
            succeeded: 0,
            failed: 0,
            skipped,
            started_at: Instant::now(),
            dedup: DedupIndex::new(),
        }
    }

    /// Counts one recorded attempt
    pub fn record(&mut self, attempt: &AttemptResult) {
        self.processed += 1;
        if attempt.is_success() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
    }

    /// Registers an icon hash; returns the earlier target with the same bytes, if any
    pub fn observe_icon(&mut self, hash: &str, target_id: &str) -> Option<String> {
        self.dedup.observe(hash, target_id)
    }

    pub fn processed(&self) -> u64 {
        self.processed
    }

    pub fn succeeded(&self) -> u64 {
        self.succeeded
    }

    pub fn failed(&self) -> u64 {
        self.failed
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Attempts per second since the run started
    pub fn rate(&self) -> f64 {
        let secs = self.elapsed().as_secs_f64();
        if secs > 0.0 {
            self.processed as f64 / secs
        } else {
            0.0
        }
    }

    pub fn summary(&self, run_id: i64) -> RunSummary {
        RunSummary {
            run_id,
            processed: self.processed,
            succeeded: self.succeeded,
            failed: self.failed,
            skipped: self.skipped,
            unique_hashes: self.dedup.unique_hashes(),
            duplicate_groups: self.dedup.duplicate_groups(),
            elapsed: self.elapsed(),
        }
    }
}
