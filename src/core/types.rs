//! Core types used throughout the busbridge library.
//!
//! This module defines the closed set of backends a chain can be built from
//! and the operations a transport supports.

use crate::core::error::ConstructionError;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The message-transport backends a chain can be built from.
///
/// Parsing is case-insensitive and ignores surrounding whitespace; the
/// canonical form is upper case.
///
/// ```rust
/// use busbridge::core::BackendKind;
///
/// let kind: BackendKind = "pulsar".parse().unwrap();
/// assert_eq!(kind, BackendKind::Pulsar);
/// assert_eq!(kind.to_string(), "PULSAR");
/// assert!("mqtt".parse::<BackendKind>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BackendKind {
    /// Kafka-like partitioned log broker.
    Kafka,
    /// Redis-like key/value store, one list per topic.
    Redis,
    /// Pulsar-like broker.
    Pulsar,
    /// RabbitMQ-like AMQP broker, one queue per topic.
    RabbitMq,
}

impl BackendKind {
    /// Every known backend, in declaration order.
    pub const ALL: [BackendKind; 4] = [
        BackendKind::Kafka,
        BackendKind::Redis,
        BackendKind::Pulsar,
        BackendKind::RabbitMq,
    ];

    /// Returns the canonical upper-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Kafka => "KAFKA",
            Self::Redis => "REDIS",
            Self::Pulsar => "PULSAR",
            Self::RabbitMq => "RABBITMQ",
        }
    }

    /// Returns the Cargo feature that compiles this backend in.
    pub fn feature(&self) -> &'static str {
        match self {
            Self::Kafka => "kafka",
            Self::Redis => "redis",
            Self::Pulsar => "pulsar",
            Self::RabbitMq => "rabbitmq",
        }
    }

    /// Returns `true` if the backend was compiled into this build.
    pub fn is_enabled(&self) -> bool {
        match self {
            Self::Kafka => cfg!(feature = "kafka"),
            Self::Redis => cfg!(feature = "redis"),
            Self::Pulsar => cfg!(feature = "pulsar"),
            Self::RabbitMq => cfg!(feature = "rabbitmq"),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = ConstructionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "KAFKA" => Ok(Self::Kafka),
            "REDIS" => Ok(Self::Redis),
            "PULSAR" => Ok(Self::Pulsar),
            "RABBIT" | "RABBITMQ" => Ok(Self::RabbitMq),
            _ => Err(ConstructionError::unknown_backend(s)),
        }
    }
}

/// The two message operations a transport performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Publish one message to a topic.
    Send,
    /// Fetch the pending messages of a topic.
    Receive,
}

impl Operation {
    /// Returns the lower-case name of the operation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Send => "send",
            Self::Receive => "receive",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_kind_parse_is_case_insensitive() {
        assert_eq!("kafka".parse::<BackendKind>().unwrap(), BackendKind::Kafka);
        assert_eq!("Redis".parse::<BackendKind>().unwrap(), BackendKind::Redis);
        assert_eq!(" PULSAR ".parse::<BackendKind>().unwrap(), BackendKind::Pulsar);
        assert_eq!("rabbit".parse::<BackendKind>().unwrap(), BackendKind::RabbitMq);
        assert_eq!("RabbitMQ".parse::<BackendKind>().unwrap(), BackendKind::RabbitMq);
    }

    #[test]
    fn test_backend_kind_parse_rejects_unknown() {
        let err = "nats".parse::<BackendKind>().unwrap_err();
        assert!(matches!(err, ConstructionError::UnknownBackend { ref value } if value == "nats"));

        assert!("".parse::<BackendKind>().is_err());
    }

    #[test]
    fn test_backend_kind_display_roundtrips() {
        for kind in BackendKind::ALL {
            assert_eq!(kind.to_string().parse::<BackendKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_backend_kind_features() {
        assert_eq!(BackendKind::RabbitMq.feature(), "rabbitmq");
        assert_eq!(BackendKind::Redis.is_enabled(), cfg!(feature = "redis"));
    }

    #[test]
    fn test_operation_display() {
        assert_eq!(Operation::Send.to_string(), "send");
        assert_eq!(Operation::Receive.to_string(), "receive");
    }
}
