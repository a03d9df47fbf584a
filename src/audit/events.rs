//! Failover audit event types and emission functions.

use crate::core::{CloseFailure, ExhaustedError, Operation};
use crate::failover::ResetReason;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kinds of failover lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailoverEventKind {
    /// A backend spent its attempt budget; the next one takes over.
    LevelEscalated,
    /// The coordinator went back to the primary backend.
    LevelReset,
    /// No backend in the chain accepted a call.
    ChainExhausted,
    /// An adapter failed to close during teardown.
    CloseFailed,
}

impl FailoverEventKind {
    /// Returns the snake_case event type name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LevelEscalated => "level_escalated",
            Self::LevelReset => "level_reset",
            Self::ChainExhausted => "chain_exhausted",
            Self::CloseFailed => "close_failed",
        }
    }
}

/// Serializable record of one failover lifecycle event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailoverAuditEvent {
    /// Event type.
    pub event_type: FailoverEventKind,

    /// Timestamp of the event.
    pub timestamp: DateTime<Utc>,

    /// Coordinator that produced the event.
    pub coordinator_id: String,

    /// Backend the event concerns, if any.
    pub backend: Option<String>,

    /// Level before the event.
    pub from_level: Option<usize>,

    /// Level after the event.
    pub to_level: Option<usize>,

    /// Operation in flight, if any.
    pub operation: Option<Operation>,

    /// Topic in flight, if any.
    pub topic: Option<String>,

    /// Human-readable detail.
    pub detail: Option<String>,
}

impl FailoverAuditEvent {
    /// Creates an event of the given kind stamped with the current time.
    pub fn new(event_type: FailoverEventKind, coordinator_id: impl Into<String>) -> Self {
        Self {
            event_type,
            timestamp: Utc::now(),
            coordinator_id: coordinator_id.into(),
            backend: None,
            from_level: None,
            to_level: None,
            operation: None,
            topic: None,
            detail: None,
        }
    }

    /// Sets the backend.
    pub fn with_backend(mut self, backend: impl Into<String>) -> Self {
        self.backend = Some(backend.into());
        self
    }

    /// Sets the level transition.
    pub fn with_levels(mut self, from: usize, to: usize) -> Self {
        self.from_level = Some(from);
        self.to_level = Some(to);
        self
    }

    /// Sets the operation and topic.
    pub fn with_call(mut self, operation: Operation, topic: impl Into<String>) -> Self {
        self.operation = Some(operation);
        self.topic = Some(topic.into());
        self
    }

    /// Sets the detail message.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Emits an audit event for an escalation from one backend to the next.
pub fn emit_level_escalated(
    coordinator_id: &str,
    operation: Operation,
    topic: &str,
    from: (usize, &str),
    to: (usize, &str),
    max_attempts: u32,
) -> FailoverAuditEvent {
    tracing::warn!(
        target: "busbridge::audit",
        event_type = FailoverEventKind::LevelEscalated.as_str(),
        coordinator_id = %coordinator_id,
        operation = %operation,
        topic = %topic,
        from_level = from.0,
        from_backend = %from.1,
        to_level = to.0,
        to_backend = %to.1,
        max_attempts,
        "Backend exhausted its attempts, moving to next level"
    );

    FailoverAuditEvent::new(FailoverEventKind::LevelEscalated, coordinator_id)
        .with_backend(to.1)
        .with_levels(from.0, to.0)
        .with_call(operation, topic)
}

/// Emits an audit event for a return to the primary backend.
pub fn emit_level_reset(
    coordinator_id: &str,
    reason: &ResetReason,
    primary: &str,
) -> FailoverAuditEvent {
    let event = FailoverAuditEvent::new(FailoverEventKind::LevelReset, coordinator_id)
        .with_backend(primary);

    match reason {
        ResetReason::IntervalElapsed { from, elapsed } => {
            tracing::info!(
                target: "busbridge::audit",
                event_type = FailoverEventKind::LevelReset.as_str(),
                coordinator_id = %coordinator_id,
                reason = "interval_elapsed",
                from_level = *from,
                elapsed_ms = elapsed.as_millis() as u64,
                primary = %primary,
                "Level reset interval elapsed, probing primary backend again"
            );
            event
                .with_levels(*from, 0)
                .with_detail(format!("interval elapsed after {}ms", elapsed.as_millis()))
        }
        ResetReason::AfterExhaustion => {
            tracing::info!(
                target: "busbridge::audit",
                event_type = FailoverEventKind::LevelReset.as_str(),
                coordinator_id = %coordinator_id,
                reason = "after_exhaustion",
                primary = %primary,
                "Previous call exhausted every backend, restarting from primary"
            );
            event.with_detail("previous call exhausted the chain")
        }
    }
}

/// Emits an audit event for a call that no backend accepted.
pub fn emit_chain_exhausted(coordinator_id: &str, error: &ExhaustedError) -> FailoverAuditEvent {
    tracing::error!(
        target: "busbridge::audit",
        event_type = FailoverEventKind::ChainExhausted.as_str(),
        coordinator_id = %coordinator_id,
        operation = %error.operation,
        topic = %error.topic,
        backends = ?error.backends,
        max_attempts = error.max_attempts,
        "Message could not be handled by any backend"
    );

    FailoverAuditEvent::new(FailoverEventKind::ChainExhausted, coordinator_id)
        .with_call(error.operation, error.topic.clone())
        .with_detail(error.to_string())
}

/// Emits an audit event for an adapter that failed to close.
pub fn emit_close_failed(coordinator_id: &str, failure: &CloseFailure) -> FailoverAuditEvent {
    tracing::warn!(
        target: "busbridge::audit",
        event_type = FailoverEventKind::CloseFailed.as_str(),
        coordinator_id = %coordinator_id,
        backend = %failure.backend,
        error = %failure.error,
        "Backend could not be closed"
    );

    FailoverAuditEvent::new(FailoverEventKind::CloseFailed, coordinator_id)
        .with_backend(failure.backend.clone())
        .with_detail(failure.error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TransportError;
    use std::time::Duration;

    #[test]
    fn test_escalation_event_fields() {
        let event = emit_level_escalated(
            "c-1",
            Operation::Send,
            "orders",
            (0, "pulsar"),
            (1, "redis"),
            10,
        );
        assert_eq!(event.event_type, FailoverEventKind::LevelEscalated);
        assert_eq!(event.backend.as_deref(), Some("redis"));
        assert_eq!(event.from_level, Some(0));
        assert_eq!(event.to_level, Some(1));
        assert_eq!(event.topic.as_deref(), Some("orders"));
    }

    #[test]
    fn test_reset_event_detail() {
        let reason = ResetReason::IntervalElapsed {
            from: 2,
            elapsed: Duration::from_millis(1500),
        };
        let event = emit_level_reset("c-1", &reason, "kafka");
        assert_eq!(event.from_level, Some(2));
        assert_eq!(event.to_level, Some(0));
        assert!(event.detail.unwrap().contains("1500ms"));

        let event = emit_level_reset("c-1", &ResetReason::AfterExhaustion, "kafka");
        assert_eq!(event.from_level, None);
    }

    #[test]
    fn test_event_serializes_snake_case() {
        let failure = CloseFailure {
            backend: "redis".into(),
            error: TransportError::internal("socket gone"),
        };
        let event = emit_close_failed("c-2", &failure);
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["event_type"], "close_failed");
        assert_eq!(json["backend"], "redis");
        assert_eq!(json["coordinator_id"], "c-2");
    }

    #[test]
    fn test_exhausted_event_records_call() {
        let error = ExhaustedError {
            operation: Operation::Receive,
            topic: "audit".into(),
            backends: vec!["kafka".into(), "redis".into()],
            max_attempts: 2,
        };
        let event = emit_chain_exhausted("c-3", &error);
        assert_eq!(event.operation, Some(Operation::Receive));
        assert_eq!(event.topic.as_deref(), Some("audit"));
        assert!(event.detail.unwrap().contains("kafka, redis"));
    }
}
