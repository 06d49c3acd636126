//! Pub/Sub Transport Layer
//!
//! The core only needs to move an opaque byte buffer on a named topic with a
//! quality-of-service level. [`PubSubTransport`] captures exactly that:
//! publish returns a [`DeliveryToken`] that is later awaited with a timeout,
//! and subscriptions deliver payloads to a [`MessageHandler`] on whatever
//! task the transport owns.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::{Result, TransportError};

pub mod loopback;
pub mod metrics;
pub mod mqtt;

pub use loopback::LoopbackTransport;
pub use metrics::{MetricsTracker, TransportMetrics};
pub use mqtt::{ConnectOptions, MqttTransport};

/// Delivery guarantee requested from the broker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(try_from = "u8", into = "u8")]
pub enum QosLevel {
    AtMostOnce,
    #[default]
    AtLeastOnce,
    ExactlyOnce,
}

impl QosLevel {
    pub fn level(&self) -> u8 {
        match self {
            QosLevel::AtMostOnce => 0,
            QosLevel::AtLeastOnce => 1,
            QosLevel::ExactlyOnce => 2,
        }
    }
}

impl TryFrom<u8> for QosLevel {
    type Error = TransportError;

    fn try_from(level: u8) -> Result<Self> {
        match level {
            0 => Ok(QosLevel::AtMostOnce),
            1 => Ok(QosLevel::AtLeastOnce),
            2 => Ok(QosLevel::ExactlyOnce),
            level => Err(TransportError::InvalidQos { level }),
        }
    }
}

impl From<QosLevel> for u8 {
    fn from(qos: QosLevel) -> u8 {
        qos.level()
    }
}

impl fmt::Display for QosLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.level())
    }
}

/// Broker confirmation for one publish
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ack {
    pub token_id: u64,
    /// Broker packet id; zero for QoS 0
    pub packet_id: u16,
}

/// Handle for an in-flight publish
///
/// Resolved by the transport once the broker acknowledges the message (or,
/// for QoS 0, once it is written to the socket).
#[derive(Debug)]
pub struct DeliveryToken {
    id: u64,
    topic: String,
    receiver: oneshot::Receiver<Ack>,
}

impl DeliveryToken {
    /// Token plus the sender the transport completes it with
    pub fn pending(id: u64, topic: impl Into<String>) -> (Self, oneshot::Sender<Ack>) {
        let (sender, receiver) = oneshot::channel();
        let token = Self {
            id,
            topic: topic.into(),
            receiver,
        };
        (token, sender)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Wait for the acknowledgement, failing after `timeout`
    pub async fn wait(self, timeout: Duration) -> Result<Ack> {
        match tokio::time::timeout(timeout, self.receiver).await {
            Ok(Ok(ack)) => Ok(ack),
            Ok(Err(_)) => Err(TransportError::publish(
                self.topic,
                "delivery tracking dropped before acknowledgement",
            )),
            Err(_) => Err(TransportError::timeout("await_delivery", timeout)),
        }
    }
}

/// Arrival callback for subscribed topics
///
/// Called from a task owned by the transport, one message at a time.
pub trait MessageHandler: Send + Sync {
    fn on_message(&self, topic: &str, payload: &[u8]);
}

impl<F> MessageHandler for F
where
    F: Fn(&str, &[u8]) + Send + Sync,
{
    fn on_message(&self, topic: &str, payload: &[u8]) {
        self(topic, payload)
    }
}

/// Publish/subscribe primitives the benchmark runs on
#[async_trait]
pub trait PubSubTransport: Send + Sync {
    /// Hand `payload` to the transport; no framing is added
    async fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
        qos: QosLevel,
        retained: bool,
    ) -> Result<DeliveryToken>;

    /// Wait for the broker to acknowledge a publish
    async fn await_delivery(&self, token: DeliveryToken, timeout: Duration) -> Result<Ack> {
        token.wait(timeout).await
    }

    /// Route messages on `topic` to `handler`
    async fn subscribe(
        &self,
        topic: &str,
        qos: QosLevel,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<()>;

    /// Close the session
    async fn disconnect(&self) -> Result<()>;

    /// Counters for traffic seen by this transport
    fn metrics(&self) -> TransportMetrics;
}

/// MQTT topic filter match with `+` and `#` wildcards
pub fn topic_matches(filter: &str, topic: &str) -> bool {
    let mut filter_levels = filter.split('/');
    let mut topic_levels = topic.split('/');

    loop {
        match (filter_levels.next(), topic_levels.next()) {
            (Some("#"), _) => return true,
            (Some("+"), Some(_)) => {}
            (Some(f), Some(t)) if f == t => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}
