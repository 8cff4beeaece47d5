//! Ordered fallback across alternative targets
//!
//! Drives the same operation against a list of targets (typically redundant
//! endpoints), each through its own [`Executor`], and returns the first
//! success.

use crate::circuit_breaker::CircuitBreaker;
use crate::error::{AllTargetsFailed, ConfigError, FailsafeError, TargetFailure};
use crate::executor::Executor;
use crate::kind::{Classify, FailureKind};
use crate::retry_policy::RetryPolicy;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

#[derive(Debug, Clone)]
struct Target<C, K>
where
    K: Eq + Hash,
{
    context: C,
    executor: Executor<K>,
}

/// Executor that falls through an ordered list of targets
///
/// Each target has its own retry policy and circuit breaker, so a target
/// whose breaker is open is skipped without affecting the others.
#[derive(Debug, Clone)]
pub struct FallbackExecutor<C, K = FailureKind>
where
    K: Eq + Hash,
{
    targets: Vec<Target<C, K>>,
}

impl<C, K: Eq + Hash> FallbackExecutor<C, K> {
    /// Create a fallback executor over `targets`, tried in order
    ///
    /// Every target starts with a plain [`Executor`]; use
    /// [`with_retry_policy`](Self::with_retry_policy) and
    /// [`with_circuit_breaker`](Self::with_circuit_breaker) to add policies.
    pub fn new(targets: impl IntoIterator<Item = C>) -> Result<Self, ConfigError> {
        let targets: Vec<_> = targets
            .into_iter()
            .map(|context| Target {
                context,
                executor: Executor::new(),
            })
            .collect();

        if targets.is_empty() {
            return Err(ConfigError::NoTargets);
        }
        Ok(Self { targets })
    }

    /// Give every target a retry policy built from the target
    pub fn with_retry_policy<F>(mut self, mut factory: F) -> Self
    where
        F: FnMut(&C) -> RetryPolicy<K>,
    {
        for target in &mut self.targets {
            let policy = factory(&target.context);
            target.executor = std::mem::take(&mut target.executor).with_retry_policy(policy);
        }
        self
    }

    /// Give every target a circuit breaker built from the target
    ///
    /// Returning the same `Arc` for several targets makes them share a breaker.
    pub fn with_circuit_breaker<F>(mut self, mut factory: F) -> Self
    where
        F: FnMut(&C) -> Arc<CircuitBreaker>,
    {
        for target in &mut self.targets {
            let breaker = factory(&target.context);
            target.executor = std::mem::take(&mut target.executor).with_circuit_breaker(breaker);
        }
        self
    }

    /// Targets in the order they are tried
    pub fn targets(&self) -> impl Iterator<Item = &C> {
        self.targets.iter().map(|target| &target.context)
    }

    /// Number of targets
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Always false; construction rejects an empty list
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Executor driving the target at `index`
    pub fn executor(&self, index: usize) -> Option<&Executor<K>> {
        self.targets.get(index).map(|target| &target.executor)
    }

    /// Run the operation against each target until one succeeds.
    ///
    /// `operation` receives the target and returns a fresh future per
    /// attempt. Call arguments are captured by the closure; see
    /// [`run_with`](Self::run_with) to pass them explicitly.
    pub async fn run<F, Fut, T, E>(&self, mut operation: F) -> Result<T, AllTargetsFailed<C, E>>
    where
        C: Clone,
        F: FnMut(&C) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Classify<Kind = K>,
        K: Debug,
    {
        let mut failures = Vec::new();

        for (index, target) in self.targets.iter().enumerate() {
            let context = &target.context;
            match target.executor.run(|| operation(context)).await {
                Ok(value) => return Ok(value),
                Err(error) => {
                    tracing::debug!(
                        target_index = index,
                        remaining = self.targets.len() - index - 1,
                        circuit_open = error.is_circuit_open(),
                        "Fallback target failed"
                    );
                    failures.push(TargetFailure {
                        index,
                        target: context.clone(),
                        error,
                    });
                }
            }
        }

        Err(AllTargetsFailed { failures })
    }

    /// Like [`run`](Self::run), passing `args` to the operation with each target
    pub async fn run_with<A, F, Fut, T, E>(
        &self,
        args: &A,
        mut operation: F,
    ) -> Result<T, AllTargetsFailed<C, E>>
    where
        C: Clone,
        A: ?Sized,
        F: FnMut(&C, &A) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Classify<Kind = K>,
        K: Debug,
    {
        self.run(|target| operation(target, args)).await
    }
}

impl<C, E> AllTargetsFailed<C, E> {
    /// Iterate over the per-target errors, in target order
    pub fn errors(&self) -> impl Iterator<Item = &FailsafeError<E>> {
        self.failures.iter().map(|failure| &failure.error)
    }
}
