use crate::config::types::{
    BreakerConfig, Config, FetcherConfig, OutputConfig, SchedulerConfig, StrategyConfig,
};
use crate::ConfigError;
use reqwest::header::HeaderValue;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.source.path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "source path cannot be empty".to_string(),
        ));
    }
    validate_fetcher_config(&config.fetcher)?;
    validate_scheduler_config(&config.scheduler)?;
    validate_breaker_config(&config.breaker)?;
    validate_strategy_config(&config.strategy)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates fetch engine configuration
fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    if config.base_timeout_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "base_timeout_ms must be >= 100ms, got {}ms",
            config.base_timeout_ms
        )));
    }

    if config.slow_timeout_ms < config.base_timeout_ms {
        return Err(ConfigError::Validation(format!(
            "slow_timeout_ms ({}ms) must be >= base_timeout_ms ({}ms)",
            config.slow_timeout_ms, config.base_timeout_ms
        )));
    }

    if config.backoff_max_ms < config.backoff_base_ms {
        return Err(ConfigError::Validation(format!(
            "backoff_max_ms ({}ms) must be >= backoff_base_ms ({}ms)",
            config.backoff_max_ms, config.backoff_base_ms
        )));
    }

    for suffix in &config.slow_host_suffixes {
        validate_host_suffix(suffix)?;
    }

    if config.user_agents.iter().any(|ua| ua.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "user_agents entries cannot be empty".to_string(),
        ));
    }

    if let Some(ua) = config
        .user_agents
        .iter()
        .find(|ua| HeaderValue::from_str(ua).is_err())
    {
        return Err(ConfigError::Validation(format!(
            "user_agents entry {:?} is not a valid header value",
            ua
        )));
    }

    Ok(())
}

fn validate_scheduler_config(config: &SchedulerConfig) -> Result<(), ConfigError> {
    if config.concurrency < 1 || config.concurrency > 100 {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and 100, got {}",
            config.concurrency
        )));
    }
    Ok(())
}

fn validate_breaker_config(config: &BreakerConfig) -> Result<(), ConfigError> {
    if config.failure_threshold < 1 {
        return Err(ConfigError::Validation(format!(
            "failure_threshold must be >= 1, got {}",
            config.failure_threshold
        )));
    }
    Ok(())
}

/// Validates the fallback service template
fn validate_strategy_config(config: &StrategyConfig) -> Result<(), ConfigError> {
    if !config.fallback_service.contains("{host}") {
        return Err(ConfigError::Validation(format!(
            "fallback_service must contain a {{host}} placeholder, got '{}'",
            config.fallback_service
        )));
    }

    let probe = config.fallback_service.replace("{host}", "example.com");
    let url = Url::parse(&probe)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid fallback_service: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "fallback_service must use http or https, got '{}'",
            url.scheme()
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.icon_dir.is_empty() {
        return Err(ConfigError::Validation(
            "icon_dir cannot be empty".to_string(),
        ));
    }

    if config.report_path.is_empty() {
        return Err(ConfigError::Validation(
            "report_path cannot be empty".to_string(),
        ));
    }

    if config.ledger_path.is_empty() {
        return Err(ConfigError::Validation(
            "ledger_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates a hostname suffix such as `.gov` or `.gov.uk`
fn validate_host_suffix(suffix: &str) -> Result<(), ConfigError> {
    let Some(body) = suffix.strip_prefix('.') else {
        return Err(ConfigError::Validation(format!(
            "Host suffix '{}' must start with '.'",
            suffix
        )));
    };

    if body.is_empty()
        || body.ends_with('.')
        || body.contains("..")
        || !body
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "Host suffix '{}' is not a valid domain suffix",
            suffix
        )));
    }

    Ok(())
}
