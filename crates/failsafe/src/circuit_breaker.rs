//! Circuit breaker pattern implementation
//!
//! Stops calling a dependency after it has failed too many times in a row,
//! and lets calls through again once a cooldown has passed.

use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// Circuit breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Circuit is closed - requests flow normally
    Closed,
    /// Circuit is open - requests are rejected
    Open,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::Open => write!(f, "open"),
        }
    }
}

/// Configuration for circuit breaker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Name for logging
    pub name: String,
    /// Number of consecutive failures before opening circuit
    pub maximum_failures: u32,
    /// Time to stay open before letting calls through again
    #[serde(rename = "reset_timeout_ms", with = "crate::config::duration_millis")]
    pub reset_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            maximum_failures: 2,
            reset_timeout: Duration::from_secs(60),
        }
    }
}

impl CircuitBreakerConfig {
    /// Create a new config with a name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set failure threshold
    pub fn with_maximum_failures(mut self, maximum_failures: u32) -> Self {
        self.maximum_failures = maximum_failures;
        self
    }

    /// Set reset timeout
    pub fn with_reset_timeout(mut self, timeout: Duration) -> Self {
        self.reset_timeout = timeout;
        self
    }
}

/// Error when circuit is open
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("circuit '{name}' is open, retry after {retry_after:?}")]
pub struct CircuitOpenError {
    /// Name of the circuit breaker
    pub name: String,
    /// Time until the circuit lets calls through again
    pub retry_after: Duration,
}

/// Circuit breaker metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitMetrics {
    /// Current state
    pub state: CircuitState,
    /// Consecutive failures since the last success or close
    pub failure_count: u32,
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    failure_count: u32,
    opened_at: Option<Instant>,
}

/// Circuit breaker for preventing cascading failures
///
/// Shared by every call site guarding the same dependency, usually behind an
/// `Arc`. All bookkeeping happens under a short mutex section that never
/// spans an `.await`.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Mutex<Inner>,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

impl CircuitBreaker {
    /// Create a new circuit breaker with config
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                failure_count: 0,
                opened_at: None,
            }),
        }
    }

    /// Create an unnamed breaker from its two limits
    pub fn with_limits(maximum_failures: u32, reset_timeout: Duration) -> Self {
        Self::new(
            CircuitBreakerConfig::default()
                .with_maximum_failures(maximum_failures)
                .with_reset_timeout(reset_timeout),
        )
    }

    /// Create with default limits and a name
    pub fn with_name(name: impl Into<String>) -> Self {
        Self::new(CircuitBreakerConfig::new(name))
    }

    /// Breaker name
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Breaker configuration
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    // State stays consistent between statements, so a poisoned lock is usable.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Get current state
    ///
    /// A plain read: an open circuit whose reset timeout has passed still
    /// reports `Open` until [`allows_execution`](Self::allows_execution) is
    /// called.
    pub fn current_state(&self) -> CircuitState {
        self.lock().state
    }

    /// Consecutive failures recorded so far
    pub fn failure_count(&self) -> u32 {
        self.lock().failure_count
    }

    /// Check whether a call may proceed.
    ///
    /// This query has a side effect: when the circuit is open and the reset
    /// timeout has elapsed, the circuit is closed and the failure count reset
    /// before returning `true`. There is no background timer; the transition
    /// only ever happens here.
    pub fn allows_execution(&self) -> bool {
        self.check().is_ok()
    }

    /// Like [`allows_execution`](Self::allows_execution), but reports how long
    /// the circuit will stay open
    pub fn check(&self) -> Result<(), CircuitOpenError> {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => Ok(()),
            CircuitState::Open => {
                let elapsed = inner
                    .opened_at
                    .map(|opened| opened.elapsed())
                    .unwrap_or(self.config.reset_timeout);

                if elapsed >= self.config.reset_timeout {
                    inner.state = CircuitState::Closed;
                    inner.failure_count = 0;
                    inner.opened_at = None;
                    tracing::info!(
                        circuit = %self.config.name,
                        "Circuit closed after reset timeout"
                    );
                    Ok(())
                } else {
                    Err(CircuitOpenError {
                        name: self.config.name.clone(),
                        retry_after: self.config.reset_timeout - elapsed,
                    })
                }
            }
        }
    }

    /// Record a successful operation
    pub fn report_success(&self) {
        self.lock().failure_count = 0;
    }

    /// Record a failed operation
    ///
    /// Failures reported while the circuit is already open are counted but
    /// leave `opened_at` alone, so late failures do not delay recovery.
    pub fn report_failure(&self) {
        let mut inner = self.lock();
        inner.failure_count = inner.failure_count.saturating_add(1);

        if inner.state == CircuitState::Closed
            && inner.failure_count >= self.config.maximum_failures
        {
            let failures = inner.failure_count;
            Self::trip(&mut inner);
            tracing::warn!(
                circuit = %self.config.name,
                failures,
                "Circuit opened due to failures"
            );
        }
    }

    /// Force the circuit open, regardless of the failure count
    pub fn open(&self) {
        Self::trip(&mut self.lock());
        tracing::warn!(circuit = %self.config.name, "Circuit forced open");
    }

    /// Force the circuit closed and forget past failures
    pub fn close(&self) {
        let mut inner = self.lock();
        inner.state = CircuitState::Closed;
        inner.failure_count = 0;
        inner.opened_at = None;
        tracing::info!(circuit = %self.config.name, "Circuit forced closed");
    }

    /// Get metrics
    pub fn metrics(&self) -> CircuitMetrics {
        let inner = self.lock();
        CircuitMetrics {
            state: inner.state,
            failure_count: inner.failure_count,
        }
    }

    fn trip(inner: &mut Inner) {
        inner.state = CircuitState::Open;
        inner.opened_at = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circuit_starts_closed() {
        let cb = CircuitBreaker::with_name("test");
        assert_eq!(cb.current_state(), CircuitState::Closed);
        assert!(cb.allows_execution());
    }

    #[test]
    fn test_default_limits() {
        let config = CircuitBreakerConfig::default();
        assert_eq!(config.maximum_failures, 2);
        assert_eq!(config.reset_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_circuit_opens_after_failures() {
        let cb = CircuitBreaker::with_limits(3, Duration::from_secs(30));

        cb.report_failure();
        cb.report_failure();
        assert_eq!(cb.current_state(), CircuitState::Closed);
        assert!(cb.allows_execution());

        cb.report_failure();
        assert_eq!(cb.current_state(), CircuitState::Open);
        assert!(!cb.allows_execution());
    }

    #[test]
    fn test_success_resets_failure_count() {
        let cb = CircuitBreaker::with_limits(3, Duration::from_secs(30));

        cb.report_failure();
        cb.report_failure();
        cb.report_success();
        assert_eq!(cb.failure_count(), 0);

        cb.report_failure();
        cb.report_failure();
        assert_eq!(cb.current_state(), CircuitState::Closed);
    }

    #[test]
    fn test_force_open_and_close() {
        let cb = CircuitBreaker::with_name("test");
        cb.open();
        assert_eq!(cb.current_state(), CircuitState::Open);
        assert!(!cb.allows_execution());

        cb.report_failure();
        cb.close();
        assert_eq!(cb.current_state(), CircuitState::Closed);
        assert_eq!(cb.failure_count(), 0);
        assert!(cb.allows_execution());
    }

    #[test]
    fn test_check_reports_retry_after() {
        let cb = CircuitBreaker::new(
            CircuitBreakerConfig::new("rpc").with_reset_timeout(Duration::from_secs(30)),
        );
        cb.open();

        let err = cb.check().unwrap_err();
        assert_eq!(err.name, "rpc");
        assert!(err.retry_after <= Duration::from_secs(30));
        assert!(err.to_string().contains("rpc"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_closes_after_reset_timeout() {
        let cb = CircuitBreaker::with_limits(1, Duration::from_secs(10));
        cb.report_failure();
        assert!(!cb.allows_execution());

        tokio::time::advance(Duration::from_secs(9)).await;
        assert!(!cb.allows_execution());
        assert_eq!(cb.current_state(), CircuitState::Open);

        tokio::time::advance(Duration::from_secs(1)).await;
        // Reading the state alone does not close the circuit
        assert_eq!(cb.current_state(), CircuitState::Open);
        assert!(cb.allows_execution());
        assert_eq!(cb.current_state(), CircuitState::Closed);
        assert_eq!(cb.failure_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_after_reopen_window() {
        let cb = CircuitBreaker::with_limits(2, Duration::from_secs(5));
        cb.report_failure();
        cb.report_failure();
        assert_eq!(cb.current_state(), CircuitState::Open);

        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(cb.allows_execution());

        // Counter was reset by the transition, so one failure is not enough
        cb.report_failure();
        assert_eq!(cb.current_state(), CircuitState::Closed);
        cb.report_failure();
        assert_eq!(cb.current_state(), CircuitState::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_while_open_keeps_reset_deadline() {
        let cb = CircuitBreaker::with_limits(1, Duration::from_secs(10));
        cb.report_failure();
        assert_eq!(cb.current_state(), CircuitState::Open);

        tokio::time::advance(Duration::from_secs(9)).await;
        cb.report_failure();
        assert_eq!(cb.failure_count(), 2);

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(cb.allows_execution());
        assert_eq!(cb.current_state(), CircuitState::Closed);
        assert_eq!(cb.failure_count(), 0);
    }

    #[test]
    fn test_metrics() {
        let cb = CircuitBreaker::with_name("test");
        cb.report_failure();

        let metrics = cb.metrics();
        assert_eq!(metrics.state, CircuitState::Closed);
        assert_eq!(metrics.failure_count, 1);
    }

    #[test]
    fn test_concurrent_reports() {
        let cb = std::sync::Arc::new(CircuitBreaker::with_limits(1000, Duration::from_secs(30)));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cb = cb.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        cb.report_failure();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cb.failure_count(), 800);
        assert_eq!(cb.current_state(), CircuitState::Closed);
    }
}
