//! Favicon-Harvest: resilient batch favicon acquisition
//!
//! This crate takes a list of external websites and obtains a representative icon
//! for each one, trying several strategies against flaky hosts with retries,
//! backoff, a global circuit breaker, resumable runs and content deduplication.

pub mod config;
pub mod harvest;
pub mod output;
pub mod source;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Favicon-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Not found: {url}")]
    NotFound { url: String },

    #[error("Transient network failure for {url} after {attempts} attempts: {message}")]
    TransientNetwork {
        url: String,
        attempts: u32,
        message: String,
    },

    #[error("No icon found for target {target_id}")]
    NoIconFound { target_id: String },

    #[error("Invalid icon at {url}: {reason}")]
    InvalidIcon { url: String, reason: String },

    #[error("Ledger error: {0}")]
    Ledger(#[from] storage::LedgerError),

    #[error("Persist error: {0}")]
    Persist(#[from] storage::PersistError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl HarvestError {
    /// Short machine-friendly label used in reports
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Source(_) => "source_unreadable",
            Self::NotFound { .. } => "not_found",
            Self::TransientNetwork { .. } => "transient_network",
            Self::NoIconFound { .. } => "no_icon_found",
            Self::InvalidIcon { .. } => "invalid_icon",
            Self::Ledger(_) => "ledger",
            Self::Persist(_) => "persist",
            Self::UrlParse(_) => "url_parse",
            Self::Http(_) => "http",
            Self::Io(_) => "io",
            Self::Join(_) => "join",
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Link source errors
///
/// Any of these aborts the run before work starts.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Link source {path} is unreadable: {reason}")]
    Unreadable { path: String, reason: String },
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

// Re-export commonly used types
pub use config::Config;
pub use source::Target;
pub use state::{AttemptResult, AttemptStatus, Strategy};
