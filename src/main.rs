//! Favicon-Harvest main entry point
//!
//! This is the command-line interface for the Favicon-Harvest batch job.

use anyhow::{Context, Result};
use clap::Parser;
use favicon_harvest::config::{load_config_with_hash, Config};
use favicon_harvest::harvest::{harvest, plan_run};
use favicon_harvest::output::{
    generate_markdown_summary, latest_run_report, load_statistics, print_run_summary,
    print_statistics,
};
use favicon_harvest::storage::{open_existing_ledger, SqliteLedger};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Summary path used by --export-summary when the config does not name one
const DEFAULT_SUMMARY_PATH: &str = "./icons/summary.md";

/// Favicon-Harvest: resilient batch favicon acquisition
///
/// Reads a list of sites, finds a representative icon for each through several
/// strategies, and saves them with a structured report. Re-running resumes from
/// the ledger and only retries targets that have not succeeded yet.
#[derive(Parser, Debug)]
#[command(name = "favicon-harvest")]
#[command(version = "1.0.0")]
#[command(about = "Resilient batch favicon harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Attempt every target, ignoring earlier successes in the ledger
    #[arg(long)]
    fresh: bool,

    /// Validate config and show what would be harvested without any network access
    #[arg(long, conflicts_with_all = ["stats", "export_summary"])]
    dry_run: bool,

    /// Show statistics from the ledger and exit
    #[arg(long, conflicts_with_all = ["dry_run", "export_summary"])]
    stats: bool,

    /// Generate a markdown summary of the latest run and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    export_summary: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if cli.dry_run {
        handle_dry_run(&config, cli.fresh)?;
    } else if cli.stats {
        handle_stats(&config)?;
    } else if cli.export_summary {
        handle_export_summary(&config)?;
    } else {
        handle_harvest(config, &config_hash, cli.fresh).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("favicon_harvest=info,warn"),
            1 => EnvFilter::new("favicon_harvest=debug,info"),
            2 => EnvFilter::new("favicon_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would be harvested
fn handle_dry_run(config: &Config, fresh: bool) -> Result<()> {
    println!("=== Favicon-Harvest Dry Run ===\n");

    println!("Source: {}", config.source.path);

    println!("\nFetcher:");
    println!("  Max retries: {}", config.fetcher.max_retries);
    println!(
        "  Timeouts: {}ms base, {}ms slow hosts ({})",
        config.fetcher.base_timeout_ms,
        config.fetcher.slow_timeout_ms,
        config.fetcher.slow_host_suffixes.join(", ")
    );
    println!(
        "  Backoff: {}ms doubling, capped at {}ms",
        config.fetcher.backoff_base_ms, config.fetcher.backoff_max_ms
    );

    println!("\nScheduler:");
    println!("  Concurrency: {}", config.scheduler.concurrency);
    println!(
        "  Breaker: {} failures, {}ms cooldown",
        config.breaker.failure_threshold, config.breaker.cooldown_ms
    );
    println!("  Strategy order: {:?}", config.strategy.order);

    println!("\nOutput:");
    println!("  Icons: {}", config.output.icon_dir);
    println!("  Report: {}", config.output.report_path);
    println!("  Ledger: {}", config.output.ledger_path);
    if let Some(path) = &config.output.error_log_path {
        println!("  Error log: {}", path);
    }
    if let Some(path) = &config.output.summary_path {
        println!("  Summary: {}", path);
    }

    let plan = plan_run(config, fresh).context("failed to read link source")?;

    println!("\nTargets to harvest ({}):", plan.queued.len());
    for target in &plan.queued {
        println!("  - {} ({})", target.id, target.url);
    }

    if !plan.skipped.is_empty() {
        println!("\nSkipped, already harvested ({}):", plan.skipped.len());
        for target in &plan.skipped {
            println!("  - {}", target.id);
        }
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would harvest {} targets", plan.queued.len());

    Ok(())
}

/// Handles the --stats mode: shows statistics from the ledger
fn handle_stats(config: &Config) -> Result<()> {
    println!("Ledger: {}\n", config.output.ledger_path);

    let Some(ledger) = open_ledger_read_only(config)? else {
        println!("No ledger found; nothing has been harvested yet.");
        return Ok(());
    };
    let stats = load_statistics(&ledger)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --export-summary mode: generates markdown summary of the latest run
fn handle_export_summary(config: &Config) -> Result<()> {
    let output = config
        .output
        .summary_path
        .as_deref()
        .unwrap_or(DEFAULT_SUMMARY_PATH);

    println!("=== Exporting Harvest Summary ===\n");
    println!("Ledger: {}", config.output.ledger_path);
    println!("Output: {}", output);
    println!();

    let ledger = open_ledger_read_only(config)?
        .with_context(|| format!("no ledger at {}", config.output.ledger_path))?;

    tracing::info!("Loading latest run from ledger...");
    let report = latest_run_report(&ledger)?;

    tracing::info!("Generating markdown summary...");
    generate_markdown_summary(&report, Path::new(output))?;

    println!("✓ Summary exported to: {}", output);

    Ok(())
}

/// Opens the configured ledger without creating it
fn open_ledger_read_only(config: &Config) -> Result<Option<SqliteLedger>> {
    open_existing_ledger(Path::new(&config.output.ledger_path)).context("failed to open ledger")
}

/// Handles the main harvest operation
async fn handle_harvest(config: Config, config_hash: &str, fresh: bool) -> Result<()> {
    if fresh {
        tracing::info!("Starting fresh harvest (ignoring earlier successes)");
    } else if config.output.resume {
        tracing::info!("Starting harvest (targets already harvested will be skipped)");
    }

    match harvest(config, config_hash, fresh).await {
        Ok(summary) => {
            print_run_summary(&summary);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            Err(e.into())
        }
    }
}
