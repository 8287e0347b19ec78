//! Harvest coordinator - run orchestration
//!
//! This module ties the pieces of a run together:
//! - Opening the ledger and creating the run record
//! - Removing targets that already succeeded from the queue
//! - Resolving, downloading, hashing and saving each target's icon
//! - Feeding every outcome to the recorder and closing the run

use crate::config::Config;
use crate::harvest::breaker::CircuitBreaker;
use crate::harvest::fetcher::Fetcher;
use crate::harvest::scheduler::WorkerPool;
use crate::harvest::strategy::{ResolvedIcon, StrategyChain};
use crate::output::{build_run_report, generate_markdown_summary};
use crate::source::Target;
use crate::state::{content_hash, AttemptResult, RunState, RunSummary, SavedIcon, Strategy};
use crate::storage::{ErrorLog, IconStore, Ledger, Recorder, ReportWriter, SqliteLedger};
use crate::HarvestError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Mutex};

/// Per-target work shared by every worker
pub struct Harvester {
    chain: StrategyChain,
    fetcher: Arc<Fetcher>,
    icons: IconStore,
    run_state: Arc<Mutex<RunState>>,
}

impl Harvester {
    pub fn new(
        chain: StrategyChain,
        fetcher: Arc<Fetcher>,
        icons: IconStore,
        run_state: Arc<Mutex<RunState>>,
    ) -> Self {
        Self {
            chain,
            fetcher,
            icons,
            run_state,
        }
    }

    /// Processes one target into its attempt outcome
    ///
    /// Never fails: every error becomes a failed attempt.
    pub async fn process(&self, target: Target) -> AttemptResult {
        let started = Instant::now();

        let resolved = match self.chain.resolve(&target).await {
            Ok(resolved) => resolved,
            Err(e) => {
                return AttemptResult::failed(
                    &target,
                    Strategy::None,
                    None,
                    describe(&e),
                    elapsed_ms(started),
                )
            }
        };

        match self.download_and_save(&target, &resolved).await {
            Ok(icon) => AttemptResult::success(&target, icon, elapsed_ms(started)),
            Err(e) => AttemptResult::failed(
                &target,
                resolved.strategy,
                Some(resolved.url.to_string()),
                describe(&e),
                elapsed_ms(started),
            ),
        }
    }

    async fn download_and_save(
        &self,
        target: &Target,
        resolved: &ResolvedIcon,
    ) -> Result<SavedIcon, HarvestError> {
        let host = target.hostname().ok_or_else(|| HarvestError::NoIconFound {
            target_id: target.id.clone(),
        })?;

        let icon = self.fetcher.download(&resolved.url).await?;
        let hash = content_hash(&icon.bytes);
        let byte_length = icon.bytes.len() as u64;

        let icons = self.icons.clone();
        let content_type = icon.content_type.clone();
        let bytes = icon.bytes;
        let path = tokio::task::spawn_blocking(move || {
            icons.save(&host, content_type.as_deref(), &bytes)
        })
        .await??;

        let duplicate_of = self
            .run_state
            .lock()
            .await
            .observe_icon(&hash, &target.id);

        if let Some(first) = &duplicate_of {
            tracing::info!("{}: icon is identical to {}", target.id, first);
        }

        Ok(SavedIcon {
            strategy: resolved.strategy,
            icon_url: icon.final_url.to_string(),
            local_path: path.display().to_string(),
            byte_length,
            content_hash: hash,
            duplicate_of,
        })
    }
}

fn describe(error: &HarvestError) -> String {
    format!("{}: {}", error.kind(), error)
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

/// Main harvest coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    ledger: Arc<Mutex<SqliteLedger>>,
    run_id: i64,
    queue: Vec<Target>,
    report: ReportWriter,
    error_log: Option<ErrorLog>,
    run_state: Arc<Mutex<RunState>>,
    harvester: Arc<Harvester>,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// Every output sink is opened before the run record is created, so a run
    /// that cannot write its report never appears in the ledger.
    ///
    /// # Arguments
    ///
    /// * `config` - The harvest configuration
    /// * `targets` - Targets read from the link source
    /// * `config_hash` - Hash of the configuration file, stored on the run record
    /// * `fresh` - Ignore earlier successes and attempt every target
    pub fn new(
        config: Config,
        targets: Vec<Target>,
        config_hash: &str,
        fresh: bool,
    ) -> Result<Self, HarvestError> {
        let mut ledger = SqliteLedger::new(Path::new(&config.output.ledger_path))?;

        let (queue, skipped) = if config.output.resume && !fresh {
            let done = ledger.succeeded_target_ids()?;
            let total = targets.len();
            let queue: Vec<Target> = targets
                .into_iter()
                .filter(|t| !done.contains(&t.id))
                .collect();
            let skipped = (total - queue.len()) as u64;
            if skipped > 0 {
                tracing::info!("Resuming: skipping {} targets already harvested", skipped);
            }
            (queue, skipped)
        } else {
            (targets, 0)
        };

        let breaker = Arc::new(CircuitBreaker::from_config(&config.breaker));
        let fetcher = Arc::new(Fetcher::new(config.fetcher.clone(), breaker)?);
        let chain = StrategyChain::new(fetcher.clone(), &config.strategy);
        let icons = IconStore::new(PathBuf::from(&config.output.icon_dir))?;

        let report = ReportWriter::open(Path::new(&config.output.report_path))?;
        let error_log = config
            .output
            .error_log_path
            .as_deref()
            .map(|p| ErrorLog::open(Path::new(p)))
            .transpose()?;

        let run_id = ledger.create_run(config_hash)?;
        let run_state = Arc::new(Mutex::new(RunState::new(skipped)));

        let harvester = Arc::new(Harvester::new(chain, fetcher, icons, run_state.clone()));

        Ok(Self {
            config: Arc::new(config),
            ledger: Arc::new(Mutex::new(ledger)),
            run_id,
            queue,
            report,
            error_log,
            run_state,
            harvester,
        })
    }

    /// Runs every queued target to completion and closes the run record
    pub async fn run(self) -> Result<RunSummary, HarvestError> {
        let Self {
            config,
            ledger,
            run_id,
            queue,
            report,
            error_log,
            run_state,
            harvester,
        } = self;

        tracing::info!("Starting harvest run {} with {} targets", run_id, queue.len());

        let concurrency = config.scheduler.concurrency as usize;
        let (tx, rx) = mpsc::channel(concurrency * 2);
        let recorder = Recorder::new(run_id, ledger.clone(), report, error_log, run_state.clone());
        let recorder_task = tokio::spawn(recorder.run(rx));

        WorkerPool::new(concurrency)
            .run(
                queue,
                move |target| {
                    let harvester = harvester.clone();
                    async move { harvester.process(target).await }
                },
                tx,
            )
            .await;

        let write_failures = match recorder_task.await {
            Ok(count) => count,
            Err(e) => {
                ledger.lock().await.fail_run(run_id)?;
                return Err(e.into());
            }
        };

        if write_failures > 0 {
            tracing::warn!("{} attempt writes failed during run {}", write_failures, run_id);
        }

        let mut ledger = ledger.lock().await;
        ledger.complete_run(run_id)?;

        let summary = run_state.lock().await.summary(run_id);
        tracing::info!(
            "Run {} complete: {} succeeded, {} failed, {} skipped in {:.1}s",
            run_id,
            summary.succeeded,
            summary.failed,
            summary.skipped,
            summary.elapsed.as_secs_f64()
        );

        if let Some(path) = &config.output.summary_path {
            let written = build_run_report(&*ledger, run_id)
                .and_then(|report| generate_markdown_summary(&report, Path::new(path)));
            match written {
                Ok(()) => tracing::info!("Summary written to {}", path),
                Err(e) => tracing::error!("Failed to write summary to {}: {}", path, e),
            }
        }

        Ok(summary)
    }
}
