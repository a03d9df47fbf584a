//! Structured audit logging for failover decisions.
//!
//! Every level change, exhaustion and teardown failure is emitted as a
//! `tracing` event on the `busbridge::audit` target, so any subscriber
//! (JSON file, OpenTelemetry, etc.) can record when and why traffic moved
//! between backends.

mod events;

pub use events::{
    emit_chain_exhausted, emit_close_failed, emit_level_escalated, emit_level_reset,
    FailoverAuditEvent, FailoverEventKind,
};
