//! Declarative configuration
//!
//! Serde-friendly records for building executors from configuration files.
//! Every field has a default, so partial documents are accepted.

use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
use crate::executor::Executor;
use crate::kind::FailureKind;
use crate::retry_policy::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::hash::Hash;
use std::sync::Arc;

/// Retry settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig<K = FailureKind> {
    /// Retries after the initial attempt
    pub allowed_retries: u32,
    /// Kinds eligible for retry; empty means all
    pub retriable_kinds: Vec<K>,
}

impl<K> Default for RetryConfig<K> {
    fn default() -> Self {
        Self {
            allowed_retries: 0,
            retriable_kinds: Vec::new(),
        }
    }
}

impl<K: Eq + Hash + Clone> RetryConfig<K> {
    /// Build the policy
    pub fn build(&self) -> RetryPolicy<K> {
        RetryPolicy::with_retries(self.allowed_retries)
            .with_retriable_kinds(self.retriable_kinds.iter().cloned())
    }
}

/// Settings for a single [`Executor`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FailsafeConfig<K = FailureKind> {
    /// Retry policy, if any
    pub retry: Option<RetryConfig<K>>,
    /// Circuit breaker, if any
    pub circuit_breaker: Option<CircuitBreakerConfig>,
}

impl<K> Default for FailsafeConfig<K> {
    fn default() -> Self {
        Self {
            retry: None,
            circuit_breaker: None,
        }
    }
}

impl<K: Eq + Hash + Clone> FailsafeConfig<K> {
    /// Build an executor with a fresh circuit breaker
    pub fn build(&self) -> Executor<K> {
        let mut executor = Executor::new();
        if let Some(retry) = &self.retry {
            executor = executor.with_retry_policy(retry.build());
        }
        if let Some(breaker) = &self.circuit_breaker {
            let breaker = Arc::new(CircuitBreaker::new(breaker.clone()));
            executor = executor.with_circuit_breaker(breaker);
        }
        executor
    }
}

/// Serialize a `Duration` as whole milliseconds
pub(crate) mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
