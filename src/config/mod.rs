//! Configuration module for Favicon-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use favicon_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Workers: {}", config.scheduler.concurrency);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    BreakerConfig, Config, FetcherConfig, OutputConfig, SchedulerConfig, SourceConfig,
    StrategyConfig, StrategyOrder, DEFAULT_FALLBACK_SERVICE,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
