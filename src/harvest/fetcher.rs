//! HTTP fetch engine
//!
//! This module handles every request the harvester makes, including:
//! - Building the shared HTTP client (browser headers, lenient TLS)
//! - Per-request timeouts chosen by host class
//! - Random user agents, per-host pacing and jitter
//! - Retry with capped exponential backoff
//! - Reporting outcomes to the circuit breaker

use crate::config::FetcherConfig;
use crate::harvest::breaker::CircuitBreaker;
use crate::harvest::identity::{browser_headers, UserAgentPool};
use crate::url::{extract_hostname, is_slow_host};
use crate::HarvestError;
use rand::Rng;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::{redirect::Policy, Client, Method, Response, StatusCode};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use url::Url;

/// Maximum redirect hops followed per request
const MAX_REDIRECTS: usize = 10;

/// A downloaded icon body
#[derive(Debug, Clone)]
pub struct DownloadedIcon {
    pub bytes: Vec<u8>,
    /// `Content-Type` header of the final response, if any
    pub content_type: Option<String>,
    /// URL after redirects
    pub final_url: Url,
}

/// Builds the HTTP client shared by all workers
///
/// Certificate validation is disabled on this client only. Timeouts are set per
/// request; `connect_timeout` bounds connection setup for every host class.
pub fn build_http_client(connect_timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .default_headers(browser_headers())
        .danger_accept_invalid_certs(true)
        .connect_timeout(connect_timeout)
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Reserves per-host request slots spaced `interval` apart
#[derive(Debug)]
pub struct HostPacer {
    interval: Duration,
    next_slot: Mutex<HashMap<String, Instant>>,
}

impl HostPacer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_slot: Mutex::new(HashMap::new()),
        }
    }

    /// Reserves the next free slot for `host` and returns how long to wait for it
    pub async fn reserve(&self, host: &str) -> Duration {
        if self.interval.is_zero() {
            return Duration::ZERO;
        }

        let now = Instant::now();
        let mut slots = self.next_slot.lock().await;
        let slot = match slots.get(host) {
            Some(next) if *next > now => *next,
            _ => now,
        };
        slots.insert(host.to_string(), slot + self.interval);
        slot.saturating_duration_since(now)
    }
}

/// Fetch engine shared by all workers
pub struct Fetcher {
    client: Client,
    config: FetcherConfig,
    agents: UserAgentPool,
    breaker: Arc<CircuitBreaker>,
    pacer: HostPacer,
}

impl Fetcher {
    pub fn new(config: FetcherConfig, breaker: Arc<CircuitBreaker>) -> Result<Self, HarvestError> {
        let client = build_http_client(config.slow_timeout())?;
        let agents = UserAgentPool::new(&config.user_agents);
        let pacer = HostPacer::new(Duration::from_millis(config.min_host_interval_ms));

        Ok(Self {
            client,
            config,
            agents,
            breaker,
            pacer,
        })
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    /// Timeout for one request to `url`, longer for slow host classes
    pub fn timeout_for(&self, url: &Url) -> Duration {
        match extract_hostname(url) {
            Some(host) if is_slow_host(&host, &self.config.slow_host_suffixes) => {
                self.config.slow_timeout()
            }
            _ => self.config.base_timeout(),
        }
    }

    /// Delay after the `attempt`-th failure (1-based), capped at the configured maximum
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        let delay = self
            .config
            .backoff_base_ms
            .saturating_mul(1u64 << exponent)
            .min(self.config.backoff_max_ms);
        Duration::from_millis(delay)
    }

    async fn pace(&self, url: &Url) {
        let host = extract_hostname(url).unwrap_or_default();
        let mut wait = self.pacer.reserve(&host).await;

        if self.config.pacing_jitter_ms > 0 {
            let jitter = rand::thread_rng().gen_range(0..=self.config.pacing_jitter_ms);
            wait += Duration::from_millis(jitter);
        }

        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
    }

    /// Sends `method` to `url`, retrying up to `max_retries` times
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | 2xx | Return, reset breaker counter |
    /// | HTTP 404 | Immediate `NotFound`, breaker untouched |
    /// | Request cannot be built | Immediate `Http`, breaker untouched |
    /// | Other status (incl. 403, 5xx) | Retry with backoff |
    /// | Transport error / timeout | Retry with backoff |
    /// | Retries exhausted | `TransientNetwork`, breaker counter +1 |
    pub async fn fetch(
        &self,
        method: Method,
        url: &Url,
        max_retries: u32,
    ) -> Result<Response, HarvestError> {
        let total_attempts = max_retries.saturating_add(1);
        let timeout = self.timeout_for(url);
        let mut last_error = String::new();

        for attempt in 1..=total_attempts {
            self.breaker.wait_if_open().await;
            self.pace(url).await;

            let result = self
                .client
                .request(method.clone(), url.clone())
                .header(USER_AGENT, self.agents.pick())
                .timeout(timeout)
                .send()
                .await;

            match result {
                Ok(response) if response.status().is_success() => {
                    self.breaker.record_success().await;
                    return Ok(response);
                }
                Ok(response) if response.status() == StatusCode::NOT_FOUND => {
                    tracing::debug!("{} {}: 404", method, url);
                    return Err(HarvestError::NotFound {
                        url: url.to_string(),
                    });
                }
                Ok(response) => {
                    last_error = format!("HTTP {}", response.status());
                }
                Err(e) if e.is_builder() => {
                    tracing::debug!("{} {}: request could not be built: {}", method, url, e);
                    return Err(HarvestError::Http(e));
                }
                Err(e) => {
                    last_error = describe_transport_error(&e);
                }
            }

            tracing::debug!(
                "{} {} attempt {}/{} failed: {}",
                method,
                url,
                attempt,
                total_attempts,
                last_error
            );

            if attempt < total_attempts {
                tokio::time::sleep(self.backoff_delay(attempt)).await;
            }
        }

        self.breaker.record_failure().await;
        Err(HarvestError::TransientNetwork {
            url: url.to_string(),
            attempts: total_attempts,
            message: last_error,
        })
    }

    pub async fn head(&self, url: &Url) -> Result<Response, HarvestError> {
        self.fetch(Method::HEAD, url, self.config.max_retries).await
    }

    pub async fn get(&self, url: &Url) -> Result<Response, HarvestError> {
        self.fetch(Method::GET, url, self.config.max_retries).await
    }

    /// Downloads an icon body, rejecting empty and HTML responses
    pub async fn download(&self, url: &Url) -> Result<DownloadedIcon, HarvestError> {
        let response = self.get(url).await?;
        let final_url = response.url().clone();
        let content_type = header_content_type(&response);
        let bytes = response.bytes().await?.to_vec();

        if bytes.is_empty() {
            return Err(HarvestError::InvalidIcon {
                url: url.to_string(),
                reason: "empty body".to_string(),
            });
        }

        if content_type
            .as_deref()
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("text/html"))
        {
            return Err(HarvestError::InvalidIcon {
                url: url.to_string(),
                reason: "response is an HTML page".to_string(),
            });
        }

        Ok(DownloadedIcon {
            bytes,
            content_type,
            final_url,
        })
    }
}

/// `Content-Type` header of a response as a string
pub fn header_content_type(response: &Response) -> Option<String> {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

fn describe_transport_error(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        "request timeout".to_string()
    } else if error.is_connect() {
        format!("connection failed: {}", error)
    } else if error.is_redirect() {
        "too many redirects".to_string()
    } else {
        error.to_string()
    }
}
