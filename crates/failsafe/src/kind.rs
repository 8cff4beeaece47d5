//! Failure classification
//!
//! Maps operation errors onto a small set of categories so retry policies can
//! decide by membership instead of by inspecting error messages.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::hash::Hash;

/// Broad failure categories for calls against remote services
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The call did not complete in time
    Timeout,
    /// The connection could not be established or was dropped
    Connection,
    /// The remote side failed (5xx)
    ServerError,
    /// The remote side is throttling us (429)
    RateLimited,
    /// The request itself was rejected (4xx)
    ClientError,
    /// Anything else
    Other,
}

impl FailureKind {
    /// Classify an HTTP status code
    pub fn from_http_status(status: u16) -> Self {
        match status {
            408 => FailureKind::Timeout,
            429 => FailureKind::RateLimited,
            500..=599 => FailureKind::ServerError,
            400..=499 => FailureKind::ClientError,
            _ => FailureKind::Other,
        }
    }

    /// Whether failures of this kind usually go away on their own
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FailureKind::Timeout
                | FailureKind::Connection
                | FailureKind::ServerError
                | FailureKind::RateLimited
        )
    }

    /// All transient kinds
    pub fn transient() -> [FailureKind; 4] {
        [
            FailureKind::Timeout,
            FailureKind::Connection,
            FailureKind::ServerError,
            FailureKind::RateLimited,
        ]
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout => write!(f, "timeout"),
            Self::Connection => write!(f, "connection"),
            Self::ServerError => write!(f, "server error"),
            Self::RateLimited => write!(f, "rate limited"),
            Self::ClientError => write!(f, "client error"),
            Self::Other => write!(f, "other"),
        }
    }
}

impl std::error::Error for FailureKind {}

/// Assigns a failure category to an error
///
/// Implemented by the error type of every operation run through an
/// [`Executor`](crate::Executor). `Kind` is usually [`FailureKind`], but any
/// closed set of tags works.
pub trait Classify {
    /// The category type
    type Kind: Eq + Hash + Clone + Debug;

    /// Category of this failure
    fn kind(&self) -> Self::Kind;
}

impl Classify for FailureKind {
    type Kind = FailureKind;

    fn kind(&self) -> FailureKind {
        *self
    }
}

impl Classify for std::io::Error {
    type Kind = FailureKind;

    fn kind(&self) -> FailureKind {
        use std::io::ErrorKind;

        match std::io::Error::kind(self) {
            ErrorKind::TimedOut => FailureKind::Timeout,
            ErrorKind::ConnectionRefused
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::NotConnected
            | ErrorKind::BrokenPipe => FailureKind::Connection,
            _ => FailureKind::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_classification() {
        assert_eq!(FailureKind::from_http_status(408), FailureKind::Timeout);
        assert_eq!(FailureKind::from_http_status(429), FailureKind::RateLimited);
        assert_eq!(FailureKind::from_http_status(503), FailureKind::ServerError);
        assert_eq!(FailureKind::from_http_status(404), FailureKind::ClientError);
        assert_eq!(FailureKind::from_http_status(302), FailureKind::Other);
    }

    #[test]
    fn test_transient_kinds() {
        for kind in FailureKind::transient() {
            assert!(kind.is_transient());
        }
        assert!(!FailureKind::ClientError.is_transient());
        assert!(!FailureKind::Other.is_transient());
    }

    #[test]
    fn test_io_error_classification() {
        use std::io::{Error, ErrorKind};

        assert_eq!(
            Classify::kind(&Error::new(ErrorKind::TimedOut, "slow")),
            FailureKind::Timeout
        );
        assert_eq!(
            Classify::kind(&Error::new(ErrorKind::ConnectionRefused, "refused")),
            FailureKind::Connection
        );
        assert_eq!(
            Classify::kind(&Error::new(ErrorKind::InvalidData, "garbage")),
            FailureKind::Other
        );
    }

    #[tokio::test]
    async fn test_usable_as_boxed_error() {
        async fn call() -> Result<u32, Box<dyn std::error::Error + Send + Sync>> {
            let executor = crate::Executor::new();
            let value = executor
                .run(|| async { Err::<u32, _>(FailureKind::RateLimited) })
                .await?;
            Ok(value)
        }

        let err = call().await.unwrap_err();
        assert!(err.to_string().contains("rate limited"));
    }

    #[test]
    fn test_serde_names() {
        let kind: FailureKind = serde_json::from_str("\"server_error\"").unwrap();
        assert_eq!(kind, FailureKind::ServerError);
    }
}
