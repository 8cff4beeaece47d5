//! Retry policies
//!
//! Determines whether a failed attempt should be followed by another one.

use crate::kind::{Classify, FailureKind};
use std::collections::HashSet;
use std::hash::Hash;

/// Outcome of consulting a [`RetryPolicy`] after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Make another attempt
    Retry,
    /// The failure is retriable but the attempt budget is spent
    Exhausted,
    /// The failure kind is not in the retriable set
    NotRetriable,
}

impl std::fmt::Display for RetryDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Retry => write!(f, "retry"),
            Self::Exhausted => write!(f, "exhausted"),
            Self::NotRetriable => write!(f, "not retriable"),
        }
    }
}

/// Bounded, immediate retry policy
///
/// Attempts are 1-indexed: attempt 1 is the initial call and attempts
/// `2..=allowed_retries + 1` are retries. An empty `retriable_kinds` set means
/// every failure kind may be retried; there is no "retry nothing" mode, use
/// `allowed_retries = 0` for that.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy<K = FailureKind>
where
    K: Eq + Hash,
{
    allowed_retries: u32,
    retriable_kinds: HashSet<K>,
}

impl<K: Eq + Hash> Default for RetryPolicy<K> {
    fn default() -> Self {
        Self {
            allowed_retries: 0,
            retriable_kinds: HashSet::new(),
        }
    }
}

impl<K: Eq + Hash> RetryPolicy<K> {
    /// Single attempt, every kind retriable
    pub fn new() -> Self {
        Self::default()
    }

    /// Policy allowing `allowed_retries` retries of any failure
    pub fn with_retries(allowed_retries: u32) -> Self {
        Self::new().with_allowed_retries(allowed_retries)
    }

    /// Set the number of retries after the initial attempt
    pub fn with_allowed_retries(mut self, allowed_retries: u32) -> Self {
        self.allowed_retries = allowed_retries;
        self
    }

    /// Restrict retries to the given failure kinds
    pub fn with_retriable_kinds(mut self, kinds: impl IntoIterator<Item = K>) -> Self {
        self.retriable_kinds.extend(kinds);
        self
    }

    /// Add one retriable failure kind
    pub fn with_retriable_kind(mut self, kind: K) -> Self {
        self.retriable_kinds.insert(kind);
        self
    }

    /// Number of retries after the initial attempt
    pub fn allowed_retries(&self) -> u32 {
        self.allowed_retries
    }

    /// Total number of attempts this policy permits
    pub fn max_attempts(&self) -> u32 {
        self.allowed_retries.saturating_add(1)
    }

    /// The retriable kinds; empty means unrestricted
    pub fn retriable_kinds(&self) -> &HashSet<K> {
        &self.retriable_kinds
    }

    /// Whether failures of `kind` may be retried at all
    pub fn is_retriable(&self, kind: &K) -> bool {
        self.retriable_kinds.is_empty() || self.retriable_kinds.contains(kind)
    }

    /// Classify a failure seen on attempt `attempt` (1-indexed)
    ///
    /// A non-retriable kind is fatal regardless of the remaining budget, so
    /// classification wins over exhaustion on the last attempt.
    pub fn decide<E>(&self, attempt: u32, failure: &E) -> RetryDecision
    where
        E: Classify<Kind = K>,
    {
        if !self.is_retriable(&failure.kind()) {
            RetryDecision::NotRetriable
        } else if attempt >= self.max_attempts() {
            RetryDecision::Exhausted
        } else {
            RetryDecision::Retry
        }
    }

    /// Whether another attempt should follow attempt `attempt`
    pub fn should_retry<E>(&self, attempt: u32, failure: &E) -> bool
    where
        E: Classify<Kind = K>,
    {
        self.decide(attempt, failure) == RetryDecision::Retry
    }
}

impl RetryPolicy<FailureKind> {
    /// Retry only transient failures (timeouts, connection, 5xx, 429)
    pub fn transient(allowed_retries: u32) -> Self {
        Self::with_retries(allowed_retries).with_retriable_kinds(FailureKind::transient())
    }
}
