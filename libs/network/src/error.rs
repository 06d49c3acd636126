//! Transport and harness error types
//!
//! Transport errors keep the pub/sub client's own error as their `source`
//! so callers see the broker-level cause unmodified.

use std::time::Duration;

use thiserror::Error;

type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised by a pub/sub transport
#[derive(Error, Debug)]
pub enum TransportError {
    /// Could not establish the broker session; fatal at startup
    #[error("Connect error: {message} (broker: {broker})")]
    Connect {
        broker: String,
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    /// Publish request was rejected or its delivery could not be tracked
    #[error("Publish error on '{topic}': {message}")]
    Publish {
        topic: String,
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    /// Subscription request was rejected
    #[error("Subscribe error on '{topic}': {message}")]
    Subscribe {
        topic: String,
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    /// Delivery acknowledgement did not arrive in time
    #[error("Timeout error: {operation} exceeded {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    /// QoS outside 0..=2
    #[error("Invalid QoS level {level}: expected 0, 1 or 2")]
    InvalidQos { level: u8 },
}

pub type Result<T> = std::result::Result<T, TransportError>;

impl TransportError {
    pub fn connect(broker: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connect {
            broker: broker.into(),
            message: message.into(),
            source: None,
        }
    }

    pub fn connect_with_source(
        broker: impl Into<String>,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Connect {
            broker: broker.into(),
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn publish(topic: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Publish {
            topic: topic.into(),
            message: message.into(),
            source: None,
        }
    }

    pub fn publish_with_source(
        topic: impl Into<String>,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Publish {
            topic: topic.into(),
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn subscribe(topic: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Subscribe {
            topic: topic.into(),
            message: message.into(),
            source: None,
        }
    }

    pub fn subscribe_with_source(
        topic: impl Into<String>,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Subscribe {
            topic: topic.into(),
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn timeout(operation: impl Into<String>, timeout: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms: timeout.as_millis() as u64,
        }
    }

    /// Only a failed connect should stop the process
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Connect { .. })
    }

    /// Short label for logs and failure counters
    pub fn category(&self) -> &'static str {
        match self {
            Self::Connect { .. } => "connect",
            Self::Publish { .. } => "publish",
            Self::Subscribe { .. } => "subscribe",
            Self::Timeout { .. } => "timeout",
            Self::InvalidQos { .. } => "qos",
        }
    }
}

/// Errors raised by a latency harness
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HarnessError {
    #[error("No latency samples recorded for '{label}'")]
    NoSamples { label: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message_in_millis() {
        let err = TransportError::timeout("await_delivery", Duration::from_secs(10));
        assert_eq!(err.to_string(), "Timeout error: await_delivery exceeded 10000ms");
        assert!(!err.is_fatal());
        assert_eq!(err.category(), "timeout");
    }

    #[test]
    fn test_source_is_preserved() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = TransportError::connect_with_source("localhost:1883", "broker unreachable", io);
        assert!(err.is_fatal());
        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "refused");
    }
}
