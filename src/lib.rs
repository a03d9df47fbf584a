//! # Busbridge
//!
//! A uniform send/receive API over several message brokers, with level-based
//! failover between them and structured audit logging of every switch.
//!
//! ## Overview
//!
//! Busbridge lets a producer or consumer talk to Kafka, Pulsar, Redis or
//! RabbitMQ through one trait, and:
//!
//! - Build clients from a configuration string such as `"PULSAR/REDIS"`
//! - Fall back to the next broker when the current one keeps failing
//! - Probe the preferred broker again after a quiet period
//! - Log every level change on a dedicated audit target
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use busbridge::provider::ClientProvider;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Reads PRODUCE_CLIENT, CONSUME_CLIENT and CIRCUIT_BREAKER_* once
//!     let provider = ClientProvider::from_process_env();
//!
//!     provider.producer().await?.send("orders", "order-1").await?;
//!
//!     for message in provider.consumer().await?.receive("orders").await? {
//!         println!("received {message}");
//!     }
//!
//!     provider.close().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `default` - Includes the Redis backend
//! - `redis` - Redis backend support
//! - `kafka` - Kafka backend support (librdkafka)
//! - `pulsar` - Apache Pulsar backend support
//! - `rabbitmq` - RabbitMQ backend support
//!
//! ## Architecture
//!
//! The library is organized into several layers:
//!
//! - **Core**: The adapter trait, backend kinds, errors and configuration
//! - **Backends**: Individual broker implementations
//! - **Failover**: The coordinator that moves traffic along a chain
//! - **Provider**: Construction of adapters, chains and clients
//! - **Audit**: Structured logging of failover decisions

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod audit;
pub mod backends;
pub mod core;
pub mod failover;
pub mod provider;

// Re-export commonly used types at the crate root
pub use crate::core::{
    ArcAdapter, BackendKind, ConstructionError, Env, ExhaustedError, Operation, TransportAdapter,
    TransportError,
};

pub use crate::failover::{AdapterChain, FailoverConfig, FailoverCoordinator};
pub use crate::provider::{AdapterFactory, ChainBuilder, ClientProvider, ClientSettings};

/// Prelude module for convenient imports.
///
/// ```rust
/// use busbridge::prelude::*;
/// ```
pub mod prelude {
    pub use crate::core::{
        ArcAdapter, BackendKind, ConstructionError, Env, ExhaustedError, Operation,
        TransportAdapter, TransportError,
    };
    pub use crate::failover::{AdapterChain, FailoverConfig, FailoverCoordinator};
    pub use crate::provider::{AdapterFactory, ChainBuilder, ClientProvider, ClientSettings};
}
