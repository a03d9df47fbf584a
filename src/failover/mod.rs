//! Level-based failover over an ordered chain of adapters.
//!
//! A [`FailoverCoordinator`] holds a chain of adapters and a shared position
//! in it:
//!
//! - **level**: index of the adapter currently in use (0 is the primary)
//! - **attempts**: consecutive failures against that adapter
//!
//! When an adapter fails `max_attempts` times in a row the coordinator moves
//! to the next one within the same call. Once every adapter has spent its
//! budget the call fails with [`ExhaustedError`](crate::core::ExhaustedError)
//! and the next call starts from the primary again. While on a fallback the
//! primary is probed again once `level_reset_interval` has passed.
//!
//! ```text
//!   level 0 ──max_attempts failures──► level 1 ──► … ──► level N-1 ──► exhausted
//!      ▲                                   │                               │
//!      └──────── reset interval elapsed ───┘◄──────── next call ───────────┘
//! ```

mod chain;
mod config;
mod coordinator;
mod state;

pub use chain::AdapterChain;
pub use config::{FailoverConfig, LEVEL_RESET_MS_VAR, MAX_ATTEMPTS_VAR};
pub use coordinator::FailoverCoordinator;
pub use state::{Entry, FailoverMetrics, FailoverSnapshot, FailoverState, ResetReason, Step};
