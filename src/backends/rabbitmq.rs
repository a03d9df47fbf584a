//! RabbitMQ transport backend.
//!
//! Each topic is a durable-less queue of the same name, declared on first
//! use and published to through the default exchange. `receive` drains the
//! queue with `basic.get` until it reports empty.

use crate::backends::config::RabbitMqConfig;
use crate::core::{TransportAdapter, TransportError};

use async_trait::async_trait;
use lapin::options::{BasicGetOptions, BasicPublishOptions, QueueDeclareOptions};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

const NAME: &str = "rabbitmq";

struct Session {
    connection: Connection,
    channel: Channel,
    declared: HashSet<String>,
}

/// RabbitMQ adapter implementation.
///
/// # Example
///
/// ```rust,ignore
/// use busbridge::backends::{RabbitMqAdapter, RabbitMqConfig};
///
/// let adapter = RabbitMqAdapter::new(RabbitMqConfig::default());
/// adapter.send("orders", "order-1").await?;
/// ```
pub struct RabbitMqAdapter {
    config: RabbitMqConfig,
    session: Mutex<Option<Session>>,
    closed: AtomicBool,
}

impl RabbitMqAdapter {
    /// Creates a new RabbitMQ adapter. No connection is made until the first
    /// call.
    pub fn new(config: RabbitMqConfig) -> Self {
        tracing::debug!(address = %config.display_address(), "Created RabbitMQ adapter");

        Self {
            config,
            session: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }

    /// Creates a RabbitMQ adapter with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(RabbitMqConfig::default())
    }

    /// Returns the configuration.
    pub fn config(&self) -> &RabbitMqConfig {
        &self.config
    }

    /// Returns a channel with `topic` declared, connecting if needed.
    async fn channel_for(&self, topic: &str) -> Result<Channel, TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::closed(NAME));
        }

        let mut guard = self.session.lock().await;

        if guard
            .as_ref()
            .is_some_and(|session| !session.connection.status().connected())
        {
            tracing::debug!("RabbitMQ connection lost, reconnecting");
            guard.take();
        }

        if guard.is_none() {
            let uri = self.config.amqp_uri().map_err(|e| {
                TransportError::connection_failed(NAME, format!("invalid AMQP address: {e}"))
            })?;
            let connection = Connection::connect(&uri, ConnectionProperties::default())
                .await
                .map_err(|e| TransportError::connection_failed(NAME, e.to_string()))?;
            let channel = connection
                .create_channel()
                .await
                .map_err(|e| TransportError::connection_failed(NAME, e.to_string()))?;
            tracing::debug!(address = %self.config.display_address(), "Connected to RabbitMQ");
            *guard = Some(Session {
                connection,
                channel,
                declared: HashSet::new(),
            });
        }
        let session = guard
            .as_mut()
            .ok_or_else(|| TransportError::internal("rabbitmq session missing after connect"))?;

        if !session.declared.contains(topic) {
            session
                .channel
                .queue_declare(topic, QueueDeclareOptions::default(), FieldTable::default())
                .await
                .map_err(|e| TransportError::rejected(NAME, e.to_string()))?;
            session.declared.insert(topic.to_string());
        }

        Ok(session.channel.clone())
    }
}

impl std::fmt::Debug for RabbitMqAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RabbitMqAdapter")
            .field("address", &self.config.display_address())
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish()
    }
}

#[async_trait]
impl TransportAdapter for RabbitMqAdapter {
    fn name(&self) -> &str {
        NAME
    }

    async fn send(&self, topic: &str, payload: &str) -> Result<(), TransportError> {
        let channel = self.channel_for(topic).await?;

        channel
            .basic_publish(
                "",
                topic,
                BasicPublishOptions::default(),
                payload.as_bytes(),
                BasicProperties::default(),
            )
            .await
            .map_err(|e| TransportError::connection_failed(NAME, e.to_string()))?
            .await
            .map_err(|e| TransportError::rejected(NAME, e.to_string()))?;
        Ok(())
    }

    async fn receive(&self, topic: &str) -> Result<Vec<String>, TransportError> {
        let channel = self.channel_for(topic).await?;
        let mut messages = Vec::new();

        while let Some(message) = channel
            .basic_get(topic, BasicGetOptions { no_ack: true })
            .await
            .map_err(|e| TransportError::connection_failed(NAME, e.to_string()))?
        {
            match String::from_utf8(message.delivery.data) {
                Ok(payload) => messages.push(payload),
                Err(e) => {
                    tracing::warn!(
                        topic = %topic,
                        error = %e,
                        "Skipping RabbitMQ message with non-UTF-8 payload"
                    );
                }
            }
        }

        Ok(messages)
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.closed.store(true, Ordering::SeqCst);

        let Some(session) = self.session.lock().await.take() else {
            return Ok(());
        };
        session
            .connection
            .close(200, "OK")
            .await
            .map_err(|e| TransportError::internal(format!("rabbitmq close failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_hides_credentials() {
        let config = RabbitMqConfig::default().with_credentials("app", "hunter2");
        let adapter = RabbitMqAdapter::new(config);
        let debug = format!("{adapter:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("localhost:5672"));
    }

    #[tokio::test]
    async fn test_close_without_connection() {
        let adapter = RabbitMqAdapter::with_defaults();
        adapter.close().await.unwrap();

        let err = adapter.receive("t").await.unwrap_err();
        assert!(matches!(err, TransportError::Closed { .. }));
    }
}
