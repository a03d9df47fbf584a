//! In-memory adapter for testing.
//!
//! This module provides a configurable mock adapter that can be used in
//! tests to simulate healthy, flaky and dead backends without running a
//! broker.

use crate::core::{TransportAdapter, TransportError};

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Duration;

/// A mock adapter for testing purposes.
///
/// Messages sent to a topic are kept in memory and handed back, oldest
/// first, by the next `receive` on that topic. Failures can be injected
/// permanently, for the next few calls, or at a fixed rate.
///
/// # Examples
///
/// ```rust
/// use busbridge::backends::MockAdapter;
/// use std::time::Duration;
///
/// // An adapter that accepts everything
/// let adapter = MockAdapter::new().with_name("primary");
///
/// // An adapter whose first three calls fail
/// let flaky = MockAdapter::new().with_name("flaky");
/// flaky.fail_next(3);
///
/// // A slow adapter that fails half of its calls
/// let slow = MockAdapter::new()
///     .with_latency(Duration::from_millis(50))
///     .with_fail_rate(0.5);
/// ```
#[derive(Debug)]
pub struct MockAdapter {
    /// Name of this adapter instance.
    name: String,
    /// Pending messages per topic.
    topics: RwLock<HashMap<String, VecDeque<String>>>,
    /// Simulated latency for send and receive.
    latency: Option<Duration>,
    /// Probability of failure (0.0 to 1.0).
    fail_rate: f32,
    /// Number of upcoming calls that fail.
    fail_next: AtomicU32,
    /// Whether every call fails.
    failing: AtomicBool,
    /// Whether `close` fails.
    fail_on_close: bool,
    /// Whether health checks fail.
    unhealthy: AtomicBool,
    /// Counter for send operations.
    send_count: AtomicU64,
    /// Counter for receive operations.
    receive_count: AtomicU64,
    /// Counter for close operations.
    close_count: AtomicU64,
}

impl MockAdapter {
    /// Creates a new mock adapter with default settings.
    pub fn new() -> Self {
        Self {
            name: "mock".to_string(),
            topics: RwLock::new(HashMap::new()),
            latency: None,
            fail_rate: 0.0,
            fail_next: AtomicU32::new(0),
            failing: AtomicBool::new(false),
            fail_on_close: false,
            unhealthy: AtomicBool::new(false),
            send_count: AtomicU64::new(0),
            receive_count: AtomicU64::new(0),
            close_count: AtomicU64::new(0),
        }
    }

    /// Creates a mock adapter that fails every send and receive.
    pub fn new_failing() -> Self {
        let adapter = Self::new();
        adapter.set_failing(true);
        adapter
    }

    /// Sets the name of this adapter.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the simulated latency for send and receive.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Sets the probability of failure.
    pub fn with_fail_rate(mut self, rate: f32) -> Self {
        self.fail_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Makes `close` return an error.
    pub fn with_close_failure(mut self) -> Self {
        self.fail_on_close = true;
        self
    }

    /// Makes every send and receive fail until turned off again.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Makes the next `count` sends or receives fail.
    pub fn fail_next(&self, count: u32) {
        self.fail_next.store(count, Ordering::SeqCst);
    }

    /// Queues a message on `topic` as if another producer had sent it.
    pub fn push_message(&self, topic: &str, payload: impl Into<String>) {
        self.topics
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .entry(topic.to_string())
            .or_default()
            .push_back(payload.into());
    }

    /// Returns the number of messages waiting on `topic`.
    pub fn pending(&self, topic: &str) -> usize {
        self.topics
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(topic)
            .map_or(0, VecDeque::len)
    }

    /// Returns the number of send calls, including failed ones.
    pub fn send_count(&self) -> u64 {
        self.send_count.load(Ordering::Relaxed)
    }

    /// Returns the number of receive calls, including failed ones.
    pub fn receive_count(&self) -> u64 {
        self.receive_count.load(Ordering::Relaxed)
    }

    /// Returns the number of close calls.
    pub fn close_count(&self) -> u64 {
        self.close_count.load(Ordering::Relaxed)
    }

    /// Sets the health status.
    pub fn set_healthy(&self, healthy: bool) {
        self.unhealthy.store(!healthy, Ordering::SeqCst);
    }

    /// Makes the adapter unhealthy (health checks will fail).
    pub fn make_unhealthy(&self) {
        self.set_healthy(false);
    }

    /// Makes the adapter healthy again.
    pub fn make_healthy(&self) {
        self.set_healthy(true);
    }

    fn should_fail(&self, calls: u64) -> bool {
        if self.failing.load(Ordering::SeqCst) {
            return true;
        }

        let consumed = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if consumed.is_ok() {
            return true;
        }

        if self.fail_rate <= 0.0 {
            return false;
        }
        if self.fail_rate >= 1.0 {
            return true;
        }
        // Simple deterministic "randomness" based on the call count
        (calls as f32 * 0.618_034) % 1.0 < self.fail_rate
    }

    async fn simulate(&self, calls: u64) -> Result<(), TransportError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if self.should_fail(calls) {
            return Err(TransportError::connection_failed(
                &self.name,
                "simulated failure",
            ));
        }
        Ok(())
    }
}

impl Default for MockAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TransportAdapter for MockAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, topic: &str, payload: &str) -> Result<(), TransportError> {
        let calls = self.send_count.fetch_add(1, Ordering::Relaxed);
        self.simulate(calls).await?;
        self.push_message(topic, payload);
        Ok(())
    }

    async fn receive(&self, topic: &str) -> Result<Vec<String>, TransportError> {
        let calls = self.receive_count.fetch_add(1, Ordering::Relaxed);
        self.simulate(calls).await?;

        let drained = self
            .topics
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(topic)
            .map(Vec::from)
            .unwrap_or_default();
        Ok(drained)
    }

    async fn health_check(&self) -> Result<(), TransportError> {
        if self.unhealthy.load(Ordering::SeqCst) {
            return Err(TransportError::connection_failed(
                &self.name,
                "mock adapter is unhealthy",
            ));
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.close_count.fetch_add(1, Ordering::Relaxed);
        if self.fail_on_close {
            return Err(TransportError::internal(format!(
                "{} refused to close",
                self.name
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_adapter_round_trip() {
        let adapter = MockAdapter::new();

        adapter.send("orders", "first").await.unwrap();
        adapter.send("orders", "second").await.unwrap();
        assert_eq!(adapter.pending("orders"), 2);

        let messages = adapter.receive("orders").await.unwrap();
        assert_eq!(messages, vec!["first", "second"]);
        assert!(adapter.receive("orders").await.unwrap().is_empty());
        assert_eq!(adapter.send_count(), 2);
        assert_eq!(adapter.receive_count(), 2);
    }

    #[tokio::test]
    async fn test_topics_are_isolated() {
        let adapter = MockAdapter::new();
        adapter.push_message("a", "x");

        assert!(adapter.receive("b").await.unwrap().is_empty());
        assert_eq!(adapter.pending("a"), 1);
    }

    #[tokio::test]
    async fn test_fail_next() {
        let adapter = MockAdapter::new();
        adapter.fail_next(2);

        assert!(adapter.send("t", "1").await.is_err());
        assert!(adapter.send("t", "2").await.is_err());
        assert!(adapter.send("t", "3").await.is_ok());
        assert_eq!(adapter.pending("t"), 1);
    }

    #[tokio::test]
    async fn test_failing_adapter() {
        let adapter = MockAdapter::new_failing().with_name("dead");

        let err = adapter.receive("t").await.unwrap_err();
        assert_eq!(err.backend(), Some("dead"));

        adapter.set_failing(false);
        assert!(adapter.receive("t").await.is_ok());
    }

    #[tokio::test]
    async fn test_fail_rate_bounds() {
        let always = MockAdapter::new().with_fail_rate(2.0);
        assert!(always.send("t", "m").await.is_err());

        let never = MockAdapter::new().with_fail_rate(0.0);
        assert!(never.send("t", "m").await.is_ok());
    }

    #[tokio::test]
    async fn test_mock_adapter_health_check() {
        let adapter = MockAdapter::new();

        // Initially healthy
        assert!(adapter.health_check().await.is_ok());

        adapter.make_unhealthy();
        assert!(adapter.health_check().await.is_err());

        adapter.make_healthy();
        assert!(adapter.health_check().await.is_ok());
    }

    #[tokio::test]
    async fn test_close_failure() {
        let adapter = MockAdapter::new().with_close_failure();
        assert!(adapter.close().await.is_err());
        assert_eq!(adapter.close_count(), 1);
    }
}
