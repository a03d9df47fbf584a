//! Error types for the busbridge library.
//!
//! Three families of errors exist, matching the three places a caller can
//! observe a failure:
//!
//! - [`ConstructionError`] while building adapters and chains,
//! - [`TransportError`] from a single attempt against one backend,
//! - [`ExhaustedError`] when every backend in a chain gave up on a call.
//!
//! The library never panics; all errors are returned as `Result` values.

use crate::core::types::{BackendKind, Operation};

use std::time::Duration;
use thiserror::Error;

/// Error raised while building an adapter or a chain of adapters.
#[derive(Debug, Error)]
pub enum ConstructionError {
    /// The backend name is not one of the known backends.
    #[error("invalid backend name '{value}' (expected one of KAFKA, REDIS, PULSAR, RABBITMQ)")]
    UnknownBackend {
        /// The value that failed to parse.
        value: String,
    },

    /// The chain specification contained no backends.
    #[error("backend chain specification is empty")]
    EmptyChain,

    /// One `/`-separated segment of the chain specification was empty.
    #[error("empty backend name at position {position} in '{spec}'")]
    EmptySegment {
        /// The full specification string.
        spec: String,
        /// Zero-based index of the empty segment.
        position: usize,
    },

    /// The backend is known but was not compiled into this build.
    #[error("backend {backend} is not available in this build (enable the `{feature}` feature)")]
    BackendDisabled {
        /// The requested backend.
        backend: BackendKind,
        /// Cargo feature that provides it.
        feature: &'static str,
    },

    /// The underlying client library could not be initialized.
    #[error("failed to create {backend} client: {message}")]
    ClientInit {
        /// The backend being built.
        backend: BackendKind,
        /// Description of the failure.
        message: String,
    },
}

impl ConstructionError {
    /// Creates an `UnknownBackend` error.
    pub fn unknown_backend(value: impl Into<String>) -> Self {
        Self::UnknownBackend {
            value: value.into(),
        }
    }

    /// Creates a `ClientInit` error.
    pub fn client_init(backend: BackendKind, message: impl Into<String>) -> Self {
        Self::ClientInit {
            backend,
            message: message.into(),
        }
    }

    /// Returns the backend this error concerns, if known.
    pub fn backend(&self) -> Option<BackendKind> {
        match self {
            Self::BackendDisabled { backend, .. } | Self::ClientInit { backend, .. } => {
                Some(*backend)
            }
            _ => None,
        }
    }
}

/// Error raised by one adapter for one `send`/`receive`/`close` attempt.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Could not reach the backend.
    #[error("connection to backend '{backend}' failed: {message}")]
    ConnectionFailed {
        /// Name of the backend.
        backend: String,
        /// Error message describing the failure.
        message: String,
    },

    /// The operation did not complete in time.
    #[error("operation on backend '{backend}' timed out after {elapsed:?}")]
    Timeout {
        /// Name of the backend.
        backend: String,
        /// How long the operation ran.
        elapsed: Duration,
    },

    /// The backend answered but refused the operation.
    #[error("backend '{backend}' rejected the operation: {reason}")]
    Rejected {
        /// Name of the backend.
        backend: String,
        /// Reason given by the backend.
        reason: String,
    },

    /// The adapter has already been closed.
    #[error("backend '{backend}' is closed")]
    Closed {
        /// Name of the backend.
        backend: String,
    },

    /// An internal error occurred.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },

    /// A failover chain gave up on the call.
    #[error(transparent)]
    Exhausted(#[from] ExhaustedError),
}

impl TransportError {
    /// Returns the backend name if this error is associated with one.
    pub fn backend(&self) -> Option<&str> {
        match self {
            Self::ConnectionFailed { backend, .. }
            | Self::Timeout { backend, .. }
            | Self::Rejected { backend, .. }
            | Self::Closed { backend } => Some(backend),
            _ => None,
        }
    }

    /// Returns `true` if this error came out of an exhausted failover chain.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted(_))
    }

    /// Creates a `ConnectionFailed` error.
    pub fn connection_failed(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            backend: backend.into(),
            message: message.into(),
        }
    }

    /// Creates a `Timeout` error.
    pub fn timeout(backend: impl Into<String>, elapsed: Duration) -> Self {
        Self::Timeout {
            backend: backend.into(),
            elapsed,
        }
    }

    /// Creates a `Rejected` error.
    pub fn rejected(backend: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Rejected {
            backend: backend.into(),
            reason: reason.into(),
        }
    }

    /// Creates a `Closed` error.
    pub fn closed(backend: impl Into<String>) -> Self {
        Self::Closed {
            backend: backend.into(),
        }
    }

    /// Creates an `Internal` error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

/// Every backend in a failover chain used up its attempt budget for one call.
#[derive(Debug, Clone, Error)]
#[error(
    "no backend accepted {operation} on topic '{topic}' after {max_attempts} attempts each (tried: {})",
    .backends.join(", ")
)]
pub struct ExhaustedError {
    /// The operation that failed.
    pub operation: Operation,
    /// Topic the call targeted.
    pub topic: String,
    /// Names of the backends tried, in chain order.
    pub backends: Vec<String>,
    /// Attempt budget per backend.
    pub max_attempts: u32,
}

/// One adapter that failed to close during a best-effort teardown.
#[derive(Debug, Error)]
#[error("failed to close backend '{backend}': {error}")]
pub struct CloseFailure {
    /// Name of the adapter.
    pub backend: String,
    /// The close error.
    #[source]
    pub error: TransportError,
}

/// A specialized `Result` type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// A specialized `Result` type for adapter and chain construction.
pub type ConstructionResult<T> = Result<T, ConstructionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_backend() {
        let err = TransportError::connection_failed("redis", "connection refused");
        assert_eq!(err.backend(), Some("redis"));

        let internal = TransportError::internal("boom");
        assert_eq!(internal.backend(), None);
    }

    #[test]
    fn test_exhausted_error_display() {
        let err = ExhaustedError {
            operation: Operation::Send,
            topic: "orders".into(),
            backends: vec!["pulsar".into(), "redis".into()],
            max_attempts: 10,
        };
        let message = err.to_string();
        assert!(message.contains("send"));
        assert!(message.contains("'orders'"));
        assert!(message.contains("pulsar, redis"));
        assert!(message.contains("10 attempts"));
    }

    #[test]
    fn test_exhausted_converts_into_transport_error() {
        let err: TransportError = ExhaustedError {
            operation: Operation::Receive,
            topic: "t".into(),
            backends: vec!["kafka".into()],
            max_attempts: 3,
        }
        .into();
        assert!(err.is_exhausted());
        assert_eq!(err.backend(), None);
    }

    #[test]
    fn test_construction_error_names_invalid_value() {
        let err = ConstructionError::unknown_backend("MQTT");
        assert!(err.to_string().contains("'MQTT'"));
        assert_eq!(err.backend(), None);

        let err = ConstructionError::BackendDisabled {
            backend: BackendKind::Kafka,
            feature: "kafka",
        };
        assert_eq!(err.backend(), Some(BackendKind::Kafka));
        assert!(err.to_string().contains("`kafka` feature"));
    }

    #[test]
    fn test_close_failure_source() {
        use std::error::Error as _;

        let failure = CloseFailure {
            backend: "pulsar".into(),
            error: TransportError::closed("pulsar"),
        };
        assert!(failure.to_string().contains("'pulsar'"));
        assert!(failure.source().is_some());
    }
}
