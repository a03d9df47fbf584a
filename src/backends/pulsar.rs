//! Pulsar transport backend.
//!
//! Topics map one-to-one to Pulsar topics. The client connects on first use;
//! producers and shared-subscription consumers are created per topic and
//! kept until [`close`](TransportAdapter::close).

use crate::backends::config::PulsarConfig;
use crate::core::{TransportAdapter, TransportError};

use async_trait::async_trait;
use futures::TryStreamExt;
use pulsar::{Consumer, Producer, Pulsar, SubType, TokioExecutor};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, OnceCell};
use tokio::time::Instant;

const NAME: &str = "pulsar";

/// Pulsar adapter implementation.
///
/// # Example
///
/// ```rust,ignore
/// use busbridge::backends::{PulsarAdapter, PulsarConfig};
///
/// let adapter = PulsarAdapter::new(PulsarConfig::default());
/// adapter.send("orders", "order-1").await?;
/// ```
pub struct PulsarAdapter {
    config: PulsarConfig,
    client: OnceCell<Pulsar<TokioExecutor>>,
    producers: Mutex<HashMap<String, Producer<TokioExecutor>>>,
    consumers: Mutex<HashMap<String, Consumer<String, TokioExecutor>>>,
    closed: AtomicBool,
}

impl PulsarAdapter {
    /// Creates a new Pulsar adapter. No connection is made until the first
    /// call.
    pub fn new(config: PulsarConfig) -> Self {
        tracing::debug!(url = %config.service_url(), "Created Pulsar adapter");

        Self {
            config,
            client: OnceCell::new(),
            producers: Mutex::new(HashMap::new()),
            consumers: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Creates a Pulsar adapter with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(PulsarConfig::default())
    }

    /// Returns the configuration.
    pub fn config(&self) -> &PulsarConfig {
        &self.config
    }

    async fn client(&self) -> Result<&Pulsar<TokioExecutor>, TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::closed(NAME));
        }

        self.client
            .get_or_try_init(|| async {
                let url = self.config.service_url();
                let client = Pulsar::builder(url.as_str(), TokioExecutor)
                    .build()
                    .await
                    .map_err(|e| TransportError::connection_failed(NAME, e.to_string()))?;
                tracing::debug!(url = %url, "Connected to Pulsar");
                Ok(client)
            })
            .await
    }
}

impl std::fmt::Debug for PulsarAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PulsarAdapter")
            .field("config", &self.config)
            .field("connected", &self.client.initialized())
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish()
    }
}

#[async_trait]
impl TransportAdapter for PulsarAdapter {
    fn name(&self) -> &str {
        NAME
    }

    async fn send(&self, topic: &str, payload: &str) -> Result<(), TransportError> {
        let client = self.client().await?;
        let mut producers = self.producers.lock().await;

        if !producers.contains_key(topic) {
            let producer = client
                .producer()
                .with_topic(topic)
                .build()
                .await
                .map_err(|e| TransportError::connection_failed(NAME, e.to_string()))?;
            producers.insert(topic.to_string(), producer);
        }
        let producer = producers
            .get_mut(topic)
            .ok_or_else(|| TransportError::internal("pulsar producer missing after insert"))?;

        let receipt = producer
            .send_non_blocking(payload.to_string())
            .await
            .map_err(|e| TransportError::rejected(NAME, e.to_string()))?;
        if let Err(e) = receipt.await {
            // The producer may be unusable now; rebuild it on the next send.
            producers.remove(topic);
            return Err(TransportError::connection_failed(NAME, e.to_string()));
        }
        Ok(())
    }

    async fn receive(&self, topic: &str) -> Result<Vec<String>, TransportError> {
        let client = self.client().await?;
        let mut consumers = self.consumers.lock().await;

        if !consumers.contains_key(topic) {
            let consumer: Consumer<String, TokioExecutor> = client
                .consumer()
                .with_topic(topic)
                .with_subscription_type(SubType::Shared)
                .with_subscription(&self.config.subscription)
                .build()
                .await
                .map_err(|e| TransportError::connection_failed(NAME, e.to_string()))?;
            tracing::debug!(
                topic = %topic,
                subscription = %self.config.subscription,
                "Subscribed Pulsar consumer"
            );
            consumers.insert(topic.to_string(), consumer);
        }
        let consumer = consumers
            .get_mut(topic)
            .ok_or_else(|| TransportError::internal("pulsar consumer missing after insert"))?;

        let deadline = Instant::now() + self.config.poll_window;
        let mut messages = Vec::new();

        loop {
            let message = match tokio::time::timeout_at(deadline, consumer.try_next()).await {
                Err(_) | Ok(Ok(None)) => break,
                Ok(Ok(Some(message))) => message,
                Ok(Err(e)) => return Err(TransportError::connection_failed(NAME, e.to_string())),
            };

            consumer
                .ack(&message)
                .await
                .map_err(|e| TransportError::rejected(NAME, e.to_string()))?;

            match message.deserialize() {
                Ok(payload) => messages.push(payload),
                Err(e) => {
                    tracing::warn!(
                        topic = %topic,
                        error = %e,
                        "Skipping Pulsar message with non-UTF-8 payload"
                    );
                }
            }
        }

        Ok(messages)
    }

    async fn health_check(&self) -> Result<(), TransportError> {
        self.client().await.map(|_| ())
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.closed.store(true, Ordering::SeqCst);
        let mut first_error = None;

        for (topic, mut producer) in self.producers.lock().await.drain() {
            if let Err(e) = producer.close().await {
                tracing::warn!(topic = %topic, error = %e, "Failed to close Pulsar producer");
                first_error.get_or_insert_with(|| TransportError::internal(e.to_string()));
            }
        }
        for (topic, mut consumer) in self.consumers.lock().await.drain() {
            if let Err(e) = consumer.close().await {
                tracing::warn!(topic = %topic, error = %e, "Failed to close Pulsar consumer");
                first_error.get_or_insert_with(|| TransportError::internal(e.to_string()));
            }
        }

        first_error.map_or(Ok(()), Err)
    }
}
