//! Global circuit breaker
//!
//! Counts consecutive failed fetches across every host. Once the count reaches the
//! threshold all traffic pauses for the cooldown, after which the breaker closes
//! and the count starts again from zero.

use crate::config::BreakerConfig;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open { until: Instant },
}

#[derive(Debug)]
struct Inner {
    state: BreakerState,
    consecutive_failures: u32,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    threshold: u32,
    cooldown: Duration,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(threshold: u32, cooldown: Duration) -> Self {
        Self {
            threshold: threshold.max(1),
            cooldown,
            inner: Mutex::new(Inner {
                state: BreakerState::Closed,
                consecutive_failures: 0,
            }),
        }
    }

    pub fn from_config(config: &BreakerConfig) -> Self {
        Self::new(config.failure_threshold, config.cooldown())
    }

    /// Counts one failure; opens the breaker when the threshold is reached
    pub async fn record_failure(&self) {
        let mut inner = self.inner.lock().await;
        inner.consecutive_failures += 1;

        if inner.state == BreakerState::Closed && inner.consecutive_failures >= self.threshold {
            inner.state = BreakerState::Open {
                until: Instant::now() + self.cooldown,
            };
            tracing::warn!(
                "Systemic degradation: {} consecutive failures, pausing all requests for {:?}",
                inner.consecutive_failures,
                self.cooldown
            );
        }
    }

    pub async fn record_success(&self) {
        self.inner.lock().await.consecutive_failures = 0;
    }

    /// Blocks while the breaker is open
    ///
    /// The first caller to wake after the cooldown closes the breaker and resets
    /// the counter; callers arriving later see it closed and pass straight through.
    pub async fn wait_if_open(&self) {
        loop {
            let until = match self.inner.lock().await.state {
                BreakerState::Closed => return,
                BreakerState::Open { until } => until,
            };

            tokio::time::sleep_until(until).await;

            let mut inner = self.inner.lock().await;
            if let BreakerState::Open { until } = inner.state {
                if Instant::now() >= until {
                    inner.state = BreakerState::Closed;
                    inner.consecutive_failures = 0;
                    tracing::info!("Circuit breaker closed, resuming requests");
                }
            }
        }
    }

    pub async fn consecutive_failures(&self) -> u32 {
        self.inner.lock().await.consecutive_failures
    }

    pub async fn is_open(&self) -> bool {
        matches!(self.inner.lock().await.state, BreakerState::Open { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stays_closed_below_threshold() {
        let breaker = CircuitBreaker::new(3, Duration::from_secs(60));
        breaker.record_failure().await;
        breaker.record_failure().await;

        assert!(!breaker.is_open().await);
        assert_eq!(breaker.consecutive_failures().await, 2);
    }

    #[tokio::test]
    async fn test_success_resets_counter() {
        let breaker = CircuitBreaker::new(3, Duration::from_secs(60));
        breaker.record_failure().await;
        breaker.record_failure().await;
        breaker.record_success().await;
        breaker.record_failure().await;

        assert!(!breaker.is_open().await);
        assert_eq!(breaker.consecutive_failures().await, 1);
    }

    #[tokio::test]
    async fn test_trips_at_threshold_and_recovers() {
        let cooldown = Duration::from_millis(150);
        let breaker = CircuitBreaker::new(3, cooldown);
        for _ in 0..3 {
            breaker.record_failure().await;
        }
        assert!(breaker.is_open().await);

        let start = std::time::Instant::now();
        breaker.wait_if_open().await;

        assert!(start.elapsed() >= Duration::from_millis(140));
        assert!(!breaker.is_open().await);
        assert_eq!(breaker.consecutive_failures().await, 0);
    }

    #[tokio::test]
    async fn test_closed_breaker_does_not_block() {
        let breaker = CircuitBreaker::new(1, Duration::from_secs(60));
        let start = std::time::Instant::now();
        breaker.wait_if_open().await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_waiters_all_released() {
        let breaker = std::sync::Arc::new(CircuitBreaker::new(1, Duration::from_millis(100)));
        breaker.record_failure().await;

        let mut handles = Vec::new();
        for _ in 0..4 {
            let breaker = breaker.clone();
            handles.push(tokio::spawn(async move { breaker.wait_if_open().await }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert!(!breaker.is_open().await);
    }
}
