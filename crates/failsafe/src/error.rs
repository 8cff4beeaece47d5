//! Error types returned by the executors

use crate::circuit_breaker::CircuitOpenError;
use thiserror::Error;

/// Terminal failure of [`Executor::run`](crate::Executor::run)
#[derive(Error, Debug)]
pub enum FailsafeError<E> {
    /// The operation failed with a kind the retry policy does not retry.
    /// The original error is passed through untouched.
    #[error(transparent)]
    Failure(E),

    /// Every attempt failed and the retry budget is spent
    #[error("retries exhausted after {attempts} attempt(s): {source}")]
    RetriesExhausted {
        /// Attempts made, including the initial one
        attempts: u32,
        /// Failure of the last attempt
        #[source]
        source: E,
    },

    /// The circuit breaker refused the call; the operation never ran
    #[error(transparent)]
    CircuitOpen(#[from] CircuitOpenError),
}

impl<E> FailsafeError<E> {
    /// Returns true if the circuit breaker rejected the call
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, Self::CircuitOpen(_))
    }

    /// Returns true if the retry budget ran out
    pub fn is_retries_exhausted(&self) -> bool {
        matches!(self, Self::RetriesExhausted { .. })
    }

    /// The underlying operation failure, if one occurred
    pub fn failure(&self) -> Option<&E> {
        match self {
            Self::Failure(e) | Self::RetriesExhausted { source: e, .. } => Some(e),
            Self::CircuitOpen(_) => None,
        }
    }

    /// Consume the error and return the operation failure, if one occurred
    pub fn into_inner(self) -> Option<E> {
        match self {
            Self::Failure(e) | Self::RetriesExhausted { source: e, .. } => Some(e),
            Self::CircuitOpen(_) => None,
        }
    }
}

/// One target's failure inside [`AllTargetsFailed`]
#[derive(Error, Debug)]
#[error("target #{index} failed: {error}")]
pub struct TargetFailure<C, E> {
    /// Position of the target in the fallback list
    pub index: usize,
    /// The target itself
    pub target: C,
    /// Why it failed
    #[source]
    pub error: FailsafeError<E>,
}

/// Every target of a [`FallbackExecutor`](crate::FallbackExecutor) failed
#[derive(Error, Debug)]
#[error("all {} fallback target(s) failed", .failures.len())]
pub struct AllTargetsFailed<C, E> {
    /// Per-target failures, in target order
    pub failures: Vec<TargetFailure<C, E>>,
}

impl<C, E> AllTargetsFailed<C, E> {
    /// The failure of the last target tried
    pub fn last(&self) -> Option<&TargetFailure<C, E>> {
        self.failures.last()
    }
}

/// Invalid executor construction
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A fallback executor needs at least one target
    #[error("fallback executor requires at least one target")]
    NoTargets,
}
