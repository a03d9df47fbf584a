//! Core traits for the busbridge library.
//!
//! This module defines the `TransportAdapter` trait that every backend, and
//! the failover coordinator itself, implements.

use crate::core::error::TransportResult;

use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;

/// Uniform send/receive capability over one message-transport backend.
///
/// # Implementation Notes
///
/// - Implementations must be `Send + Sync`; one adapter serves concurrent
///   callers.
/// - Timeouts and reconnection inside one backend are the adapter's own
///   business; the failover layer treats every `Err` as one failed attempt.
/// - Implementations should never panic; all errors are returned as
///   `TransportError`.
///
/// # Example Implementation
///
/// ```rust,ignore
/// use busbridge::core::{TransportAdapter, TransportError};
/// use async_trait::async_trait;
///
/// #[derive(Debug)]
/// struct StdoutAdapter;
///
/// #[async_trait]
/// impl TransportAdapter for StdoutAdapter {
///     fn name(&self) -> &str {
///         "stdout"
///     }
///
///     async fn send(&self, topic: &str, payload: &str) -> Result<(), TransportError> {
///         println!("{topic}: {payload}");
///         Ok(())
///     }
///
///     async fn receive(&self, _topic: &str) -> Result<Vec<String>, TransportError> {
///         Ok(Vec::new())
///     }
///
///     async fn close(&self) -> Result<(), TransportError> {
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait TransportAdapter: Send + Sync + Debug {
    /// Returns a stable, human-readable name such as "redis" or "kafka".
    fn name(&self) -> &str;

    /// Publishes `payload` to `topic`.
    async fn send(&self, topic: &str, payload: &str) -> TransportResult<()>;

    /// Returns the messages currently available on `topic`.
    ///
    /// An empty vector means the call succeeded and nothing was pending.
    async fn receive(&self, topic: &str) -> TransportResult<Vec<String>>;

    /// Checks that the backend is reachable.
    ///
    /// The default implementation reports healthy.
    async fn health_check(&self) -> TransportResult<()> {
        Ok(())
    }

    /// Releases the connections held by this adapter.
    async fn close(&self) -> TransportResult<()>;
}

/// An arc-wrapped adapter for shared ownership.
pub type ArcAdapter = Arc<dyn TransportAdapter>;
