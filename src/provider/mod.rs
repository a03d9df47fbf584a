//! Building clients from configuration.
//!
//! - [`AdapterFactory`] turns one [`BackendKind`](crate::core::BackendKind)
//!   into an adapter.
//! - [`ChainBuilder`] turns a specification such as `"PULSAR/REDIS"` into an
//!   ordered chain, and a chain into a client.
//! - [`ClientProvider`] builds the application's producer and consumer once
//!   and shares them.

mod chain;
mod client;
mod factory;

pub use chain::ChainBuilder;
pub use client::{ClientProvider, ClientSettings, CONSUME_CLIENT_VAR, PRODUCE_CLIENT_VAR};
pub use factory::{AdapterConstructor, AdapterFactory};
