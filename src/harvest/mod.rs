//! Harvest module for icon acquisition
//!
//! This module contains the core harvesting logic, including:
//! - HTTP fetching with retries, backoff and pacing
//! - The global circuit breaker
//! - Icon resolution strategies and HTML icon discovery
//! - The worker pool and overall run coordination

mod breaker;
mod coordinator;
mod fetcher;
mod identity;
mod parser;
mod scheduler;
mod strategy;

pub use breaker::{BreakerState, CircuitBreaker};
pub use coordinator::{Coordinator, Harvester};
pub use fetcher::{build_http_client, DownloadedIcon, Fetcher, HostPacer};
pub use identity::{browser_headers, UserAgentPool, DEFAULT_USER_AGENTS};
pub use parser::extract_icon_link;
pub use scheduler::WorkerPool;
pub use strategy::{is_image_content_type, ResolvedIcon, StrategyChain};

use crate::config::Config;
use crate::source::{read_targets, Target};
use crate::state::RunSummary;
use crate::storage::{open_existing_ledger, Ledger};
use crate::HarvestError;
use std::collections::HashSet;
use std::path::Path;

/// What a run would do, computed without network access
#[derive(Debug, Clone)]
pub struct RunPlan {
    /// Targets that would be attempted
    pub queued: Vec<Target>,
    /// Targets skipped because their last recorded attempt succeeded
    pub skipped: Vec<Target>,
}

/// Runs a complete harvest
///
/// This is the main entry point for a run. It will:
/// 1. Read the link source (an unreadable source aborts before any work)
/// 2. Open the ledger and create a run record
/// 3. Skip targets that already succeeded, unless resume is off or `fresh` is set
/// 4. Process every remaining target and record each outcome
/// 5. Close the run record and return its summary
pub async fn harvest(
    config: Config,
    config_hash: &str,
    fresh: bool,
) -> Result<RunSummary, HarvestError> {
    let targets = read_targets(Path::new(&config.source.path))?;

    Coordinator::new(config, targets, config_hash, fresh)?
        .run()
        .await
}

/// Computes the work a run would do without touching the network
///
/// The ledger is only read when it already exists.
pub fn plan_run(config: &Config, fresh: bool) -> Result<RunPlan, HarvestError> {
    let targets = read_targets(Path::new(&config.source.path))?;
    let ledger = if config.output.resume && !fresh {
        open_existing_ledger(Path::new(&config.output.ledger_path))?
    } else {
        None
    };

    let done: HashSet<String> = match ledger {
        Some(ledger) => ledger.succeeded_target_ids()?,
        None => HashSet::new(),
    };

    let (skipped, queued): (Vec<Target>, Vec<Target>) =
        targets.into_iter().partition(|t| done.contains(&t.id));
    Ok(RunPlan { queued, skipped })
}
