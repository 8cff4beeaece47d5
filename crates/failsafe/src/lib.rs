//! # Failsafe
//!
//! Resilience primitives for calling dependencies that fail transiently.
//!
//! Three strategies compose into one pipeline around an async operation:
//!
//! - **Retry Policies**: bounded, immediate retries filtered by failure kind
//! - **Circuit Breaker**: stop calling a dependency after repeated failures,
//!   let calls through again after a cooldown
//! - **Fallback**: try an ordered list of alternative targets until one works
//!
//! ## Quick Start
//!
//! ```rust
//! use failsafe::{CircuitBreaker, Executor, FailureKind, RetryPolicy};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() {
//! // One breaker per dependency, shared by every call site
//! let breaker = Arc::new(CircuitBreaker::with_limits(3, Duration::from_secs(30)));
//!
//! let executor = Executor::new()
//!     .with_retry_policy(RetryPolicy::transient(2))
//!     .with_circuit_breaker(breaker);
//!
//! let result = executor
//!     .run(|| async {
//!         // Your RPC call here
//!         Ok::<_, FailureKind>("success")
//!     })
//!     .await;
//! assert_eq!(result.unwrap(), "success");
//! # }
//! ```
//!
//! ## Circuit Breaker
//!
//! ```rust
//! use failsafe::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
//! use std::time::Duration;
//!
//! let cb = CircuitBreaker::new(
//!     CircuitBreakerConfig::new("ethereum_rpc")
//!         .with_maximum_failures(2)
//!         .with_reset_timeout(Duration::from_secs(30)),
//! );
//!
//! cb.report_failure();
//! cb.report_failure();
//! assert_eq!(cb.current_state(), CircuitState::Open);
//! assert!(!cb.allows_execution());
//! ```
//!
//! ## Fallback
//!
//! ```rust
//! use failsafe::{FailureKind, FallbackExecutor, RetryPolicy};
//!
//! # async fn example() -> Result<(), failsafe::ConfigError> {
//! let fallback = FallbackExecutor::new(["https://rpc-a.example", "https://rpc-b.example"])?
//!     .with_retry_policy(|_| RetryPolicy::transient(1));
//!
//! let result = fallback
//!     .run(|url| {
//!         let url = url.to_string();
//!         async move { Ok::<_, FailureKind>(url) }
//!     })
//!     .await;
//! assert_eq!(result.unwrap(), "https://rpc-a.example");
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod circuit_breaker;
pub mod config;
pub mod error;
pub mod executor;
pub mod fallback;
pub mod kind;
pub mod retry_policy;

// Re-export main types
pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitMetrics, CircuitOpenError, CircuitState,
};

pub use config::{FailsafeConfig, RetryConfig};

pub use error::{AllTargetsFailed, ConfigError, FailsafeError, TargetFailure};

pub use executor::Executor;

pub use fallback::FallbackExecutor;

pub use kind::{Classify, FailureKind};

pub use retry_policy::{RetryDecision, RetryPolicy};
