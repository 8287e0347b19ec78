//! Statistics from the resume ledger
//!
//! This module provides functionality for extracting and displaying
//! harvest statistics from the storage layer.

use crate::state::{AttemptStatus, RunSummary, Strategy};
use crate::storage::{Ledger, LedgerError, RunRecord};
use std::collections::HashMap;

/// Ledger-wide statistics summary
#[derive(Debug, Clone)]
pub struct LedgerStatistics {
    /// Distinct targets with at least one attempt
    pub total_targets: u64,

    /// Attempts across all runs, by status
    pub attempts_by_status: HashMap<AttemptStatus, u64>,

    /// Successful attempts across all runs, by strategy
    pub successes_by_strategy: HashMap<Strategy, u64>,

    /// Targets whose last recorded attempt succeeded
    pub completed_targets: u64,

    pub latest_run: Option<RunRecord>,
}

/// Loads statistics from the ledger
pub fn load_statistics(ledger: &dyn Ledger) -> Result<LedgerStatistics, LedgerError> {
    Ok(LedgerStatistics {
        total_targets: ledger.count_targets()?,
        attempts_by_status: ledger.count_attempts_by_status()?,
        successes_by_strategy: ledger.count_successes_by_strategy()?,
        completed_targets: ledger.succeeded_target_ids()?.len() as u64,
        latest_run: ledger.get_latest_run()?,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &LedgerStatistics) {
    println!("=== Harvest Statistics ===\n");

    println!("Overview:");
    println!("  Targets attempted: {}", stats.total_targets);
    println!("  Targets with an icon: {}", stats.completed_targets);
    println!();

    println!("Attempts by Status:");
    for status in [AttemptStatus::Success, AttemptStatus::Failed] {
        println!(
            "  {}: {}",
            status,
            stats.attempts_by_status.get(&status).copied().unwrap_or(0)
        );
    }
    println!();

    if !stats.successes_by_strategy.is_empty() {
        println!("Successes by Strategy:");
        let mut counts: Vec<_> = stats.successes_by_strategy.iter().collect();
        counts.sort_by(|a, b| b.1.cmp(a.1));

        for (strategy, count) in counts {
            println!("  {}: {}", strategy, count);
        }
        println!();
    }

    if let Some(run) = &stats.latest_run {
        println!("Latest Run:");
        println!("  ID: {}", run.id);
        println!("  Started: {}", run.started_at);
        if let Some(finished) = &run.finished_at {
            println!("  Finished: {}", finished);
        }
        println!("  Status: {}", run.status.to_db_string());
        println!();
    }

    let coverage = if stats.total_targets > 0 {
        (stats.completed_targets as f64 / stats.total_targets as f64) * 100.0
    } else {
        0.0
    };

    println!(
        "Coverage: {:.1}% ({} / {} targets have an icon)",
        coverage, stats.completed_targets, stats.total_targets
    );
}

/// Prints the end-of-run summary
pub fn print_run_summary(summary: &RunSummary) {
    println!("\n=== Harvest Complete ===");
    println!("Run ID: {}", summary.run_id);
    println!("Processed: {}", summary.processed);
    println!("  Succeeded: {}", summary.succeeded);
    println!("  Failed: {}", summary.failed);
    println!("Skipped (already harvested): {}", summary.skipped);
    println!("Unique icons: {}", summary.unique_hashes);
    if !summary.duplicate_groups.is_empty() {
        println!("Duplicate icon groups: {}", summary.duplicate_groups.len());
        for (hash, targets) in &summary.duplicate_groups {
            println!("  {}: {}", hash.get(..12).unwrap_or(hash), targets.join(", "));
        }
    }
    println!("Elapsed: {:.1}s", summary.elapsed.as_secs_f64());
}
