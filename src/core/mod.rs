//! Core types and traits for the busbridge library.
//!
//! - [`types`] - `BackendKind` and `Operation`
//! - [`traits`] - The `TransportAdapter` trait
//! - [`error`] - Structured error types
//! - [`env`] - Configuration snapshot

pub mod env;
pub mod error;
pub mod traits;
pub mod types;

pub use env::Env;
pub use error::{
    CloseFailure, ConstructionError, ConstructionResult, ExhaustedError, TransportError,
    TransportResult,
};
pub use traits::{ArcAdapter, TransportAdapter};
pub use types::{BackendKind, Operation};
