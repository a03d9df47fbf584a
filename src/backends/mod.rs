//! Transport backend implementations.
//!
//! This module contains implementations of the `TransportAdapter` trait for
//! the supported message brokers.
//!
//! ## Available Backends
//!
//! - [`mock`] - An in-memory adapter for testing
//! - [`redis`] - Redis lists (requires `redis` feature, on by default)
//! - [`kafka`] - Kafka via librdkafka (requires `kafka` feature)
//! - [`pulsar`] - Apache Pulsar (requires `pulsar` feature)
//! - [`rabbitmq`] - RabbitMQ via AMQP 0.9.1 (requires `rabbitmq` feature)
//!
//! Connection settings for every broker live in [`config`] and are compiled
//! regardless of features.
//!
//! ## Implementing a Custom Backend
//!
//! To add a new transport, implement the `TransportAdapter` trait and
//! register a constructor with
//! [`AdapterFactory::with_constructor`](crate::provider::AdapterFactory::with_constructor):
//!
//! ```rust,ignore
//! use busbridge::core::{TransportAdapter, TransportError};
//! use async_trait::async_trait;
//!
//! #[derive(Debug)]
//! pub struct MyAdapter {
//!     // Your adapter's connection state
//! }
//!
//! #[async_trait]
//! impl TransportAdapter for MyAdapter {
//!     fn name(&self) -> &str {
//!         "my-broker"
//!     }
//!
//!     async fn send(&self, topic: &str, payload: &str) -> Result<(), TransportError> {
//!         // Publish the payload
//!         todo!()
//!     }
//!
//!     async fn receive(&self, topic: &str) -> Result<Vec<String>, TransportError> {
//!         // Fetch pending messages
//!         todo!()
//!     }
//!
//!     async fn close(&self) -> Result<(), TransportError> {
//!         Ok(())
//!     }
//! }
//! ```

pub mod config;
pub mod mock;

#[cfg(feature = "kafka")]
pub mod kafka;

#[cfg(feature = "pulsar")]
pub mod pulsar;

#[cfg(feature = "rabbitmq")]
pub mod rabbitmq;

#[cfg(feature = "redis")]
pub mod redis;

// Re-exports
pub use config::{KafkaConfig, PulsarConfig, RabbitMqConfig, RedisConfig};
pub use mock::MockAdapter;

#[cfg(feature = "kafka")]
pub use kafka::KafkaAdapter;

#[cfg(feature = "pulsar")]
pub use self::pulsar::PulsarAdapter;

#[cfg(feature = "rabbitmq")]
pub use rabbitmq::RabbitMqAdapter;

#[cfg(feature = "redis")]
pub use self::redis::RedisAdapter;
