//! Shared fixtures for the integration tests

#![allow(dead_code)]

use failsafe::{Classify, FailureKind};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Error type of the fake remote service
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("request timed out")]
    Timeout,
    #[error("service unavailable")]
    Unavailable,
    #[error("invalid request: {0}")]
    BadRequest(String),
}

impl Classify for ServiceError {
    type Kind = FailureKind;

    fn kind(&self) -> FailureKind {
        match self {
            ServiceError::Timeout => FailureKind::Timeout,
            ServiceError::Unavailable => FailureKind::ServerError,
            ServiceError::BadRequest(_) => FailureKind::ClientError,
        }
    }
}

/// Counts how many times an operation was invoked
#[derive(Debug, Clone, Default)]
pub struct CallCounter(Arc<AtomicU32>);

impl CallCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hit(&self) -> u32 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn count(&self) -> u32 {
        self.0.load(Ordering::SeqCst)
    }
}
