use serde::Deserialize;
use std::time::Duration;

/// Default icon-rendering service used by the fallback strategy
pub const DEFAULT_FALLBACK_SERVICE: &str = "https://www.google.com/s2/favicons?domain={host}&sz=64";

/// Main configuration structure for Favicon-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub source: SourceConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub breaker: BreakerConfig,
    #[serde(default)]
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Where the target list comes from
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Path to the link list (JSON array, or TOML with `[[link]]` tables)
    pub path: String,
}

/// Fetch engine behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FetcherConfig {
    /// Retries after the first attempt of every fetch call
    pub max_retries: u32,

    /// Per-request timeout for ordinary hosts (milliseconds)
    pub base_timeout_ms: u64,

    /// Per-request timeout for hosts in the slow class (milliseconds)
    pub slow_timeout_ms: u64,

    /// Hostname suffixes that put a host in the slow class
    pub slow_host_suffixes: Vec<String>,

    /// First backoff delay; doubles on every further retry (milliseconds)
    pub backoff_base_ms: u64,

    /// Upper bound for a single backoff delay (milliseconds)
    pub backoff_max_ms: u64,

    /// Upper bound of the random delay before each request (milliseconds)
    pub pacing_jitter_ms: u64,

    /// Minimum spacing between two requests to the same host (milliseconds)
    pub min_host_interval_ms: u64,

    /// Overrides the built-in User-Agent pool when non-empty
    pub user_agents: Vec<String>,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_timeout_ms: 10_000,
            slow_timeout_ms: 30_000,
            slow_host_suffixes: vec![
                ".gov".to_string(),
                ".mil".to_string(),
                ".gov.uk".to_string(),
                ".gouv.fr".to_string(),
                ".gc.ca".to_string(),
                ".gov.au".to_string(),
            ],
            backoff_base_ms: 1_000,
            backoff_max_ms: 30_000,
            pacing_jitter_ms: 500,
            min_host_interval_ms: 250,
            user_agents: Vec::new(),
        }
    }
}

impl FetcherConfig {
    pub fn base_timeout(&self) -> Duration {
        Duration::from_millis(self.base_timeout_ms)
    }

    pub fn slow_timeout(&self) -> Duration {
        Duration::from_millis(self.slow_timeout_ms)
    }
}

/// Worker pool sizing
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SchedulerConfig {
    /// Number of concurrent workers
    pub concurrency: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { concurrency: 20 }
    }
}

/// Global circuit breaker settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BreakerConfig {
    /// Consecutive failed fetch calls that open the breaker
    pub failure_threshold: u32,

    /// How long all traffic pauses once the breaker opens (milliseconds)
    pub cooldown_ms: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 10,
            cooldown_ms: 60_000,
        }
    }
}

impl BreakerConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}

/// Which strategy runs first; the icon-service fallback always runs last
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyOrder {
    #[default]
    RootFirst,
    HtmlFirst,
}

/// Strategy chain settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct StrategyConfig {
    pub order: StrategyOrder,

    /// URL template for the icon-rendering service; `{host}` is replaced by the hostname
    pub fallback_service: String,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            order: StrategyOrder::default(),
            fallback_service: DEFAULT_FALLBACK_SERVICE.to_string(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Directory receiving `{hostname}.{ext}` icon files
    pub icon_dir: String,

    /// Append-only JSON lines attempt report
    pub report_path: String,

    /// SQLite resume ledger
    pub ledger_path: String,

    /// Optional plain-text error log
    pub error_log_path: Option<String>,

    /// Optional markdown summary written at the end of a run
    pub summary_path: Option<String>,

    /// Skip targets whose last recorded attempt succeeded
    pub resume: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            icon_dir: "./icons".to_string(),
            report_path: "./icons/report.jsonl".to_string(),
            ledger_path: "./icons/ledger.db".to_string(),
            error_log_path: None,
            summary_path: None,
            resume: true,
        }
    }
}
