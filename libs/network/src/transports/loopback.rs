//! In-process transport
//!
//! Clones share one in-memory broker, so a publisher and a subscriber built
//! from the same [`LoopbackTransport`] exchange messages without a network.
//! Handlers run inline on the publishing task and every publish is
//! acknowledged immediately unless acks are withheld or failures injected.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tokio::sync::oneshot;
use tracing::debug;

use super::{
    topic_matches, Ack, DeliveryToken, MessageHandler, MetricsTracker, PubSubTransport, QosLevel,
    TransportMetrics,
};
use crate::{Result, TransportError};

#[derive(Default)]
struct Broker {
    subscriptions: RwLock<Vec<(String, Arc<dyn MessageHandler>)>>,
    retained: Mutex<HashMap<String, Vec<u8>>>,
    metrics: MetricsTracker,
    next_token: AtomicU64,
    failures_to_inject: AtomicUsize,
    withhold_acks: AtomicBool,
    withheld: Mutex<Vec<oneshot::Sender<Ack>>>,
}

impl Broker {
    fn handlers_for(&self, topic: &str) -> Vec<Arc<dyn MessageHandler>> {
        self.subscriptions
            .read()
            .iter()
            .filter(|(filter, _)| topic_matches(filter, topic))
            .map(|(_, handler)| Arc::clone(handler))
            .collect()
    }

    fn take_injected_failure(&self) -> bool {
        self.failures_to_inject
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok()
    }
}

/// In-memory pub/sub broker and client in one
#[derive(Clone, Default)]
pub struct LoopbackTransport {
    broker: Arc<Broker>,
}

impl LoopbackTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` publishes fail with a publish error
    pub fn fail_next_publishes(&self, count: usize) {
        self.broker.failures_to_inject.store(count, Ordering::Release);
    }

    /// Stop acknowledging publishes so delivery waits time out
    pub fn withhold_acks(&self, withhold: bool) {
        self.broker.withhold_acks.store(withhold, Ordering::Release);
    }

    /// Deliver raw bytes to subscribers without going through `publish`
    pub fn inject(&self, topic: &str, payload: &[u8]) {
        self.broker.metrics.record_receive(payload.len());
        for handler in self.broker.handlers_for(topic) {
            handler.on_message(topic, payload);
        }
    }
}

#[async_trait]
impl PubSubTransport for LoopbackTransport {
    async fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
        qos: QosLevel,
        retained: bool,
    ) -> Result<DeliveryToken> {
        if self.broker.take_injected_failure() {
            self.broker.metrics.record_error();
            return Err(TransportError::publish(topic, "injected publish failure"));
        }

        let token_id = self.broker.next_token.fetch_add(1, Ordering::Relaxed) + 1;
        let (token, sender) = DeliveryToken::pending(token_id, topic);
        self.broker.metrics.record_send(payload.len());
        debug!(topic, token_id, bytes = payload.len(), qos = %qos, "Loopback publish");

        self.inject(topic, &payload);
        if retained {
            self.broker.retained.lock().insert(topic.to_string(), payload);
        }

        let ack = Ack {
            token_id,
            packet_id: if qos == QosLevel::AtMostOnce {
                0
            } else {
                (token_id % u64::from(u16::MAX)) as u16 + 1
            },
        };
        if self.broker.withhold_acks.load(Ordering::Acquire) {
            self.broker.withheld.lock().push(sender);
        } else {
            let _ = sender.send(ack);
        }
        Ok(token)
    }

    async fn subscribe(
        &self,
        topic: &str,
        _qos: QosLevel,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<()> {
        let retained: Vec<(String, Vec<u8>)> = self
            .broker
            .retained
            .lock()
            .iter()
            .filter(|(name, _)| topic_matches(topic, name))
            .map(|(name, payload)| (name.clone(), payload.clone()))
            .collect();
        for (name, payload) in retained {
            handler.on_message(&name, &payload);
        }

        self.broker
            .subscriptions
            .write()
            .push((topic.to_string(), handler));
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.broker.subscriptions.write().clear();
        Ok(())
    }

    fn metrics(&self) -> TransportMetrics {
        self.broker.metrics.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn collector() -> (Arc<Mutex<Vec<(String, Vec<u8>)>>>, Arc<dyn MessageHandler>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handler: Arc<dyn MessageHandler> = Arc::new(move |topic: &str, payload: &[u8]| {
            sink.lock().push((topic.to_string(), payload.to_vec()));
        });
        (seen, handler)
    }

    #[tokio::test]
    async fn test_publish_reaches_matching_subscriber() {
        let transport = LoopbackTransport::new();
        let (seen, handler) = collector();
        transport
            .subscribe("bench/+", QosLevel::AtLeastOnce, handler)
            .await
            .unwrap();

        let token = transport
            .publish("bench/a", b"hello".to_vec(), QosLevel::AtLeastOnce, false)
            .await
            .unwrap();
        transport
            .publish("other/a", b"skip".to_vec(), QosLevel::AtLeastOnce, false)
            .await
            .unwrap();

        let ack = transport
            .await_delivery(token, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(ack.token_id, 1);
        assert_eq!(*seen.lock(), vec![("bench/a".to_string(), b"hello".to_vec())]);
        assert_eq!(transport.metrics().messages_sent, 2);
    }

    #[tokio::test]
    async fn test_retained_message_replayed_on_subscribe() {
        let transport = LoopbackTransport::new();
        transport
            .publish("bench/state", b"last".to_vec(), QosLevel::AtMostOnce, true)
            .await
            .unwrap();

        let (seen, handler) = collector();
        transport
            .subscribe("bench/#", QosLevel::AtMostOnce, handler)
            .await
            .unwrap();
        assert_eq!(seen.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_injected_failures_then_recovery() {
        let transport = LoopbackTransport::new();
        transport.fail_next_publishes(1);
        let err = transport
            .publish("t", vec![1], QosLevel::AtLeastOnce, false)
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Publish { .. }));
        assert!(transport
            .publish("t", vec![1], QosLevel::AtLeastOnce, false)
            .await
            .is_ok());
        assert_eq!(transport.metrics().errors, 1);
    }

    #[tokio::test]
    async fn test_withheld_ack_times_out() {
        let transport = LoopbackTransport::new();
        transport.withhold_acks(true);
        let token = transport
            .publish("t", vec![1], QosLevel::ExactlyOnce, false)
            .await
            .unwrap();
        let err = transport
            .await_delivery(token, Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Timeout { .. }));
    }
}
