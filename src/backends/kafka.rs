//! Kafka transport backend.
//!
//! Topics map one-to-one to Kafka topics. One producer is shared by every
//! send; a consumer is subscribed lazily per topic and reused, so a receive
//! returns everything delivered to the group since the previous one.
//!
//! # Requirements
//!
//! - A reachable Kafka broker
//! - librdkafka (built by `rdkafka` by default)

use crate::backends::config::KafkaConfig;
use crate::core::{BackendKind, ConstructionError, TransportAdapter, TransportError};

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::Message;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::util::Timeout;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

const NAME: &str = "kafka";
const SEND_TIMEOUT: Duration = Duration::from_secs(5);
const FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// Kafka adapter implementation.
///
/// # Example
///
/// ```rust,ignore
/// use busbridge::backends::{KafkaAdapter, KafkaConfig};
///
/// let adapter = KafkaAdapter::new(KafkaConfig::default())?;
/// adapter.send("orders", "order-1").await?;
/// ```
pub struct KafkaAdapter {
    config: KafkaConfig,
    producer: FutureProducer,
    consumers: Mutex<HashMap<String, Arc<StreamConsumer>>>,
    closed: AtomicBool,
}

impl KafkaAdapter {
    /// Creates a new Kafka adapter with the given configuration.
    pub fn new(config: KafkaConfig) -> Result<Self, ConstructionError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", config.bootstrap_servers())
            .set("security.protocol", &config.protocol)
            .set("client.id", &config.producer_client_id)
            .create()
            .map_err(|e| ConstructionError::client_init(BackendKind::Kafka, e.to_string()))?;

        tracing::debug!(
            bootstrap_servers = %config.bootstrap_servers(),
            protocol = %config.protocol,
            "Created Kafka adapter"
        );

        Ok(Self {
            config,
            producer,
            consumers: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
        })
    }

    /// Creates a Kafka adapter with default configuration.
    pub fn with_defaults() -> Result<Self, ConstructionError> {
        Self::new(KafkaConfig::default())
    }

    /// Returns the configuration.
    pub fn config(&self) -> &KafkaConfig {
        &self.config
    }

    fn ensure_open(&self) -> Result<(), TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::closed(NAME));
        }
        Ok(())
    }

    fn consumer(&self, topic: &str) -> Result<Arc<StreamConsumer>, TransportError> {
        let mut consumers = self
            .consumers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(consumer) = consumers.get(topic) {
            return Ok(consumer.clone());
        }

        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", self.config.bootstrap_servers())
            .set("security.protocol", &self.config.protocol)
            .set("client.id", &self.config.consumer_client_id)
            .set("group.id", &self.config.group_id)
            .set("auto.offset.reset", &self.config.auto_offset_reset)
            .set("enable.auto.commit", "false")
            .create()
            .map_err(|e| TransportError::connection_failed(NAME, e.to_string()))?;

        consumer
            .subscribe(&[topic])
            .map_err(|e| TransportError::rejected(NAME, e.to_string()))?;

        tracing::debug!(topic = %topic, group = %self.config.group_id, "Subscribed Kafka consumer");

        let consumer = Arc::new(consumer);
        consumers.insert(topic.to_string(), consumer.clone());
        Ok(consumer)
    }
}

impl std::fmt::Debug for KafkaAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KafkaAdapter")
            .field("config", &self.config)
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish()
    }
}

#[async_trait]
impl TransportAdapter for KafkaAdapter {
    fn name(&self) -> &str {
        NAME
    }

    async fn send(&self, topic: &str, payload: &str) -> Result<(), TransportError> {
        self.ensure_open()?;

        let record = FutureRecord::<(), str>::to(topic).payload(payload);
        self.producer
            .send(record, Timeout::After(SEND_TIMEOUT))
            .await
            .map(|_| ())
            .map_err(|(e, _)| TransportError::connection_failed(NAME, e.to_string()))
    }

    async fn receive(&self, topic: &str) -> Result<Vec<String>, TransportError> {
        self.ensure_open()?;
        let consumer = self.consumer(topic)?;

        let deadline = Instant::now() + self.config.poll_window;
        let mut messages = Vec::new();

        loop {
            let message = match tokio::time::timeout_at(deadline, consumer.recv()).await {
                Err(_) => break,
                Ok(result) => {
                    result.map_err(|e| TransportError::connection_failed(NAME, e.to_string()))?
                }
            };

            match message.payload_view::<str>() {
                Some(Ok(payload)) => messages.push(payload.to_string()),
                Some(Err(e)) => {
                    tracing::warn!(
                        topic = %topic,
                        offset = message.offset(),
                        error = %e,
                        "Skipping Kafka message with non-UTF-8 payload"
                    );
                }
                None => {}
            }
        }

        if !messages.is_empty() {
            consumer
                .commit_consumer_state(CommitMode::Async)
                .map_err(|e| TransportError::rejected(NAME, e.to_string()))?;
        }

        Ok(messages)
    }

    async fn health_check(&self) -> Result<(), TransportError> {
        self.ensure_open()?;
        self.producer
            .client()
            .fetch_metadata(None, Timeout::After(SEND_TIMEOUT))
            .map(|_| ())
            .map_err(|e| TransportError::connection_failed(NAME, e.to_string()))
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.closed.store(true, Ordering::SeqCst);

        let consumers: Vec<_> = self
            .consumers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .drain()
            .collect();
        for (topic, consumer) in consumers {
            consumer.unsubscribe();
            tracing::debug!(topic = %topic, "Unsubscribed Kafka consumer");
        }

        self.producer
            .flush(Timeout::After(FLUSH_TIMEOUT))
            .map_err(|e| TransportError::internal(format!("kafka flush failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_does_not_contact_broker() {
        let adapter = KafkaAdapter::with_defaults().unwrap();
        assert_eq!(adapter.name(), "kafka");
        assert_eq!(adapter.config().bootstrap_servers(), "localhost:9092");
    }

    #[tokio::test]
    async fn test_closed_adapter_rejects_calls() {
        let adapter = KafkaAdapter::with_defaults().unwrap();
        // Nothing queued, so the flush returns immediately.
        let _ = adapter.close().await;

        let err = adapter.send("t", "m").await.unwrap_err();
        assert!(matches!(err, TransportError::Closed { .. }));
    }
}
