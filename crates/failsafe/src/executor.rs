//! Executor combining retry and circuit breaking
//!
//! Runs one logical call: gates it on the circuit breaker, retries failed
//! attempts per the retry policy and reports every attempt's outcome back to
//! the breaker.

use crate::circuit_breaker::CircuitBreaker;
use crate::error::FailsafeError;
use crate::kind::{Classify, FailureKind};
use crate::retry_policy::{RetryDecision, RetryPolicy};
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

/// Runs async operations under a retry policy and a circuit breaker
///
/// Both are optional: without a retry policy every call gets exactly one
/// attempt, without a circuit breaker every call is allowed. The executor keeps
/// no per-call state, so one instance can serve any number of concurrent calls.
#[derive(Debug, Clone)]
pub struct Executor<K = FailureKind>
where
    K: Eq + Hash,
{
    retry_policy: Option<RetryPolicy<K>>,
    circuit_breaker: Option<Arc<CircuitBreaker>>,
}

impl<K: Eq + Hash> Default for Executor<K> {
    fn default() -> Self {
        Self {
            retry_policy: None,
            circuit_breaker: None,
        }
    }
}

impl<K: Eq + Hash> Executor<K> {
    /// Executor with neither retries nor a circuit breaker
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the retry policy
    pub fn with_retry_policy(mut self, policy: RetryPolicy<K>) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    /// Guard calls with a (possibly shared) circuit breaker
    pub fn with_circuit_breaker(mut self, breaker: Arc<CircuitBreaker>) -> Self {
        self.circuit_breaker = Some(breaker);
        self
    }

    /// The retry policy, if any
    pub fn retry_policy(&self) -> Option<&RetryPolicy<K>> {
        self.retry_policy.as_ref()
    }

    /// The circuit breaker, if any
    pub fn circuit_breaker(&self) -> Option<&Arc<CircuitBreaker>> {
        self.circuit_breaker.as_ref()
    }

    fn decide<E>(&self, attempt: u32, failure: &E) -> RetryDecision
    where
        E: Classify<Kind = K>,
    {
        match &self.retry_policy {
            Some(policy) => policy.decide(attempt, failure),
            None => RetryDecision::Exhausted,
        }
    }

    /// Run `operation` until it succeeds or the policies give up.
    ///
    /// `operation` is called once per attempt and must return a fresh future
    /// each time. Retries follow immediately, without delay. The breaker is
    /// consulted once, before the first attempt; every failed attempt is
    /// reported to it, including those that are retried.
    ///
    /// Dropping the returned future while an attempt is pending leaves the
    /// breaker untouched: outcomes are only reported once the attempt resolves.
    pub async fn run<F, Fut, T, E>(&self, mut operation: F) -> Result<T, FailsafeError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Classify<Kind = K>,
        K: Debug,
    {
        if let Some(breaker) = &self.circuit_breaker {
            if let Err(open) = breaker.check() {
                tracing::trace!(circuit = %open.name, "Call rejected by open circuit");
                return Err(FailsafeError::CircuitOpen(open));
            }
        }

        let mut attempt: u32 = 1;
        loop {
            match operation().await {
                Ok(value) => {
                    if let Some(breaker) = &self.circuit_breaker {
                        breaker.report_success();
                    }
                    return Ok(value);
                }
                Err(failure) => {
                    if let Some(breaker) = &self.circuit_breaker {
                        breaker.report_failure();
                    }

                    let decision = self.decide(attempt, &failure);
                    tracing::debug!(
                        attempt,
                        kind = ?failure.kind(),
                        decision = %decision,
                        "Attempt failed"
                    );

                    match decision {
                        RetryDecision::Retry => attempt = attempt.saturating_add(1),
                        RetryDecision::Exhausted => {
                            return Err(FailsafeError::RetriesExhausted {
                                attempts: attempt,
                                source: failure,
                            });
                        }
                        RetryDecision::NotRetriable => {
                            return Err(FailsafeError::Failure(failure));
                        }
                    }
                }
            }
        }
    }
}
