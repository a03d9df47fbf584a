//! Redis transport backend.
//!
//! Each topic is a Redis list. `send` pushes onto the head of the list;
//! `receive` reads the whole list and deletes it in one `MULTI`/`EXEC`
//! transaction, then returns the messages oldest first.
//!
//! # Requirements
//!
//! - A reachable Redis server (standalone or the master of a replica set)

use crate::backends::config::RedisConfig;
use crate::core::{BackendKind, ConstructionError, TransportAdapter, TransportError};

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

const NAME: &str = "redis";

/// Redis adapter implementation.
///
/// The connection is opened on first use and reused by every caller. A
/// failed command drops it so the next attempt reconnects.
///
/// # Example
///
/// ```rust,ignore
/// use busbridge::backends::{RedisAdapter, RedisConfig};
///
/// let adapter = RedisAdapter::new(RedisConfig::default())?;
/// adapter.send("orders", "order-1").await?;
/// ```
pub struct RedisAdapter {
    config: RedisConfig,
    client: redis::Client,
    connection: Mutex<Option<MultiplexedConnection>>,
    closed: AtomicBool,
}

impl RedisAdapter {
    /// Creates a new Redis adapter with the given configuration.
    ///
    /// Only validates the URL; no connection is made until the first call.
    pub fn new(config: RedisConfig) -> Result<Self, ConstructionError> {
        let client = redis::Client::open(config.url())
            .map_err(|e| ConstructionError::client_init(BackendKind::Redis, e.to_string()))?;

        tracing::debug!(url = %config.url(), "Created Redis adapter");

        Ok(Self {
            config,
            client,
            connection: Mutex::new(None),
            closed: AtomicBool::new(false),
        })
    }

    /// Creates a Redis adapter with default configuration.
    pub fn with_defaults() -> Result<Self, ConstructionError> {
        Self::new(RedisConfig::default())
    }

    /// Returns the configuration.
    pub fn config(&self) -> &RedisConfig {
        &self.config
    }

    async fn connection(&self) -> Result<MultiplexedConnection, TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::closed(NAME));
        }

        let mut cached = self.connection.lock().await;
        if let Some(conn) = cached.as_ref() {
            return Ok(conn.clone());
        }

        let conn = tokio::time::timeout(
            self.config.connect_timeout,
            self.client.get_multiplexed_async_connection(),
        )
        .await
        .map_err(|_| TransportError::timeout(NAME, self.config.connect_timeout))?
        .map_err(|e| TransportError::connection_failed(NAME, e.to_string()))?;

        tracing::debug!(url = %self.config.url(), "Connected to Redis");
        *cached = Some(conn.clone());
        Ok(conn)
    }

    async fn discard_connection(&self) {
        self.connection.lock().await.take();
    }

    async fn command_failed(&self, error: redis::RedisError) -> TransportError {
        if error.is_io_error() || error.is_connection_dropped() || error.is_timeout() {
            self.discard_connection().await;
            TransportError::connection_failed(NAME, error.to_string())
        } else {
            TransportError::rejected(NAME, error.to_string())
        }
    }
}

impl std::fmt::Debug for RedisAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisAdapter")
            .field("config", &self.config)
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish()
    }
}

#[async_trait]
impl TransportAdapter for RedisAdapter {
    fn name(&self) -> &str {
        NAME
    }

    async fn send(&self, topic: &str, payload: &str) -> Result<(), TransportError> {
        let mut conn = self.connection().await?;
        match conn.lpush::<_, _, ()>(topic, payload).await {
            Ok(()) => Ok(()),
            Err(e) => Err(self.command_failed(e).await),
        }
    }

    async fn receive(&self, topic: &str) -> Result<Vec<String>, TransportError> {
        let mut conn = self.connection().await?;
        let result: redis::RedisResult<(Vec<String>,)> = redis::pipe()
            .atomic()
            .lrange(topic, 0, -1)
            .del(topic)
            .ignore()
            .query_async(&mut conn)
            .await;

        match result {
            Ok((mut messages,)) => {
                // LPUSH stores newest first.
                messages.reverse();
                Ok(messages)
            }
            Err(e) => Err(self.command_failed(e).await),
        }
    }

    async fn health_check(&self) -> Result<(), TransportError> {
        let mut conn = self.connection().await?;
        match redis::cmd("PING").query_async::<String>(&mut conn).await {
            Ok(_) => Ok(()),
            Err(e) => Err(self.command_failed(e).await),
        }
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.closed.store(true, Ordering::SeqCst);
        self.discard_connection().await;
        tracing::debug!("Closed Redis adapter");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_does_not_connect() {
        let adapter = RedisAdapter::with_defaults().unwrap();
        assert_eq!(adapter.name(), "redis");
        assert_eq!(adapter.config().url(), "redis://localhost:6379");
    }

    #[tokio::test]
    async fn test_closed_adapter_rejects_calls() {
        let adapter = RedisAdapter::with_defaults().unwrap();
        adapter.close().await.unwrap();

        let err = adapter.send("t", "m").await.unwrap_err();
        assert!(matches!(err, TransportError::Closed { .. }));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_a_failed_attempt() {
        let config = RedisConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            ..RedisConfig::default()
        }
        .with_connect_timeout(std::time::Duration::from_millis(500));
        let adapter = RedisAdapter::new(config).unwrap();

        let err = adapter.receive("t").await.unwrap_err();
        assert_eq!(err.backend(), Some("redis"));
    }
}
