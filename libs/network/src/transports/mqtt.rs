//! MQTT transport over `rumqttc`
//!
//! A background task drives the `rumqttc` event loop. It completes
//! delivery tokens and dispatches incoming publishes to subscription
//! handlers.
//!
//! Delivery tracking relies on the event loop emitting
//! `Outgoing::Publish(pkid)` in the same order publish requests were queued.
//! Each publish pushes a pending entry under a lock held across the client
//! request; the event loop pops the front entry when the matching outgoing
//! event appears. QoS 0 entries complete at that point, QoS 1 and 2 entries
//! move to an in-flight map keyed by packet id and complete on `PubAck` or
//! `PubComp`. A publish the client refuses to send because it exceeds the
//! packet size limit never produces an outgoing event; its entry is dropped
//! when the event loop reports the refusal.
//!
//! Subscriptions are matched the same way on `Outgoing::Subscribe` and
//! resolved by the broker's `SubAck`, so a refused filter surfaces as
//! [`TransportError::Subscribe`].

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use rumqttc::{
    AsyncClient, ConnectReturnCode, ConnectionError, Event, EventLoop, MqttOptions, Outgoing,
    Packet, QoS, StateError, SubscribeReasonCode,
};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{
    topic_matches, Ack, DeliveryToken, MessageHandler, MetricsTracker, PubSubTransport, QosLevel,
    TransportMetrics,
};
use crate::{Result, TransportError};

/// Request channel capacity between the client handle and the event loop
const REQUEST_CAPACITY: usize = 10;

/// Pause before polling again after a connection error
const RECONNECT_BACKOFF: Duration = Duration::from_secs(1);

/// Broker session settings
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub keep_alive: Duration,
    pub clean_session: bool,
    /// How long to wait for the broker's CONNACK, and for each SUBACK
    pub connect_timeout: Duration,
    /// Largest packet accepted or sent; must fit the largest encoded payload
    pub max_packet_size: usize,
}

impl ConnectOptions {
    pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(60);
    pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
    pub const DEFAULT_MAX_PACKET_SIZE: usize = 256 * 1024;

    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            client_id: unique_client_id("mqtt-bench"),
            keep_alive: Self::DEFAULT_KEEP_ALIVE,
            clean_session: true,
            connect_timeout: Self::DEFAULT_CONNECT_TIMEOUT,
            max_packet_size: Self::DEFAULT_MAX_PACKET_SIZE,
        }
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    pub fn with_keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    pub fn with_clean_session(mut self, clean_session: bool) -> Self {
        self.clean_session = clean_session;
        self
    }

    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    pub fn with_max_packet_size(mut self, max_packet_size: usize) -> Self {
        self.max_packet_size = max_packet_size;
        self
    }

    pub fn broker_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Reject a client id the broker or client library cannot accept
    pub fn validate(&self) -> Result<()> {
        if self.client_id.is_empty() {
            return Err(TransportError::connect(
                self.broker_address(),
                "client id must not be empty",
            ));
        }
        if self.client_id.starts_with(char::is_whitespace) {
            return Err(TransportError::connect(
                self.broker_address(),
                format!("client id '{}' must not start with whitespace", self.client_id),
            ));
        }
        Ok(())
    }

    fn to_mqtt_options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(self.client_id.clone(), self.host.clone(), self.port);
        options.set_keep_alive(self.keep_alive);
        options.set_clean_session(self.clean_session);
        options.set_max_packet_size(self.max_packet_size, self.max_packet_size);
        options
    }
}

/// `<prefix>-<uuid v4>`, so concurrent runs never share a session
pub fn unique_client_id(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::new_v4())
}

fn to_mqtt_qos(qos: QosLevel) -> QoS {
    match qos {
        QosLevel::AtMostOnce => QoS::AtMostOnce,
        QosLevel::AtLeastOnce => QoS::AtLeastOnce,
        QosLevel::ExactlyOnce => QoS::ExactlyOnce,
    }
}

struct PendingPublish {
    token_id: u64,
    qos: QosLevel,
    sender: oneshot::Sender<Ack>,
}

impl PendingPublish {
    fn complete(self, packet_id: u16) {
        // Receiver may have timed out already
        let _ = self.sender.send(Ack {
            token_id: self.token_id,
            packet_id,
        });
    }
}

/// Outcome of one subscribe request, as reported by the broker
type SubscribeOutcome = std::result::Result<QoS, String>;

/// Matches outgoing packets and broker acks to publish tokens and
/// subscription requests
#[derive(Default)]
struct DeliveryTracker {
    queued: VecDeque<PendingPublish>,
    in_flight: HashMap<u16, PendingPublish>,
    subscribes_queued: VecDeque<oneshot::Sender<SubscribeOutcome>>,
    subscribes_in_flight: HashMap<u16, oneshot::Sender<SubscribeOutcome>>,
}

impl DeliveryTracker {
    fn enqueue(&mut self, pending: PendingPublish) {
        self.queued.push_back(pending);
    }

    fn cancel(&mut self, token_id: u64) {
        self.queued.retain(|p| p.token_id != token_id);
    }

    fn on_outgoing_publish(&mut self, packet_id: u16) {
        // Retransmission after reconnect; already tracked
        if packet_id != 0 && self.in_flight.contains_key(&packet_id) {
            return;
        }
        let Some(pending) = self.queued.pop_front() else {
            debug!(packet_id, "outgoing publish with no pending token");
            return;
        };
        match pending.qos {
            QosLevel::AtMostOnce => pending.complete(packet_id),
            QosLevel::AtLeastOnce | QosLevel::ExactlyOnce => {
                self.in_flight.insert(packet_id, pending);
            }
        }
    }

    fn on_broker_ack(&mut self, packet_id: u16) {
        if let Some(pending) = self.in_flight.remove(&packet_id) {
            pending.complete(packet_id);
        }
    }

    /// The client refused the oldest queued publish without sending it
    ///
    /// Dropping the entry fails its token; leaving it would shift every
    /// later outgoing event onto the wrong token.
    fn on_publish_refused(&mut self) -> Option<u64> {
        self.queued.pop_front().map(|pending| pending.token_id)
    }

    fn enqueue_subscribe(&mut self, sender: oneshot::Sender<SubscribeOutcome>) {
        self.subscribes_queued.push_back(sender);
    }

    fn cancel_last_subscribe(&mut self) {
        self.subscribes_queued.pop_back();
    }

    fn on_outgoing_subscribe(&mut self, packet_id: u16) {
        match self.subscribes_queued.pop_front() {
            Some(sender) => {
                self.subscribes_in_flight.insert(packet_id, sender);
            }
            None => debug!(packet_id, "outgoing subscribe with no pending request"),
        }
    }

    fn on_suback(&mut self, packet_id: u16, return_codes: &[SubscribeReasonCode]) {
        let Some(sender) = self.subscribes_in_flight.remove(&packet_id) else {
            return;
        };
        let outcome = match return_codes.first() {
            Some(SubscribeReasonCode::Success(qos)) => Ok(*qos),
            Some(SubscribeReasonCode::Failure) => Err("broker refused the subscription".to_string()),
            None => Err("SUBACK carried no return code".to_string()),
        };
        // Subscriber may have timed out already
        let _ = sender.send(outcome);
    }
}

type Subscriptions = RwLock<Vec<(String, Arc<dyn MessageHandler>)>>;

struct Shared {
    tracker: Mutex<DeliveryTracker>,
    subscriptions: Subscriptions,
    metrics: MetricsTracker,
    shutting_down: AtomicBool,
}

impl Shared {
    fn dispatch(&self, topic: &str, payload: &[u8]) {
        self.metrics.record_receive(payload.len());
        let handlers: Vec<Arc<dyn MessageHandler>> = self
            .subscriptions
            .read()
            .iter()
            .filter(|(filter, _)| topic_matches(filter, topic))
            .map(|(_, handler)| Arc::clone(handler))
            .collect();
        for handler in handlers {
            handler.on_message(topic, payload);
        }
    }
}

/// Pub/sub transport backed by an MQTT 3.1.1 broker
pub struct MqttTransport {
    client: AsyncClient,
    shared: Arc<Shared>,
    next_token: AtomicU64,
    suback_timeout: Duration,
    /// Held across tracker enqueue and client request so both stay in order
    request_order: tokio::sync::Mutex<()>,
    event_loop: Mutex<Option<JoinHandle<()>>>,
}

impl MqttTransport {
    /// Open a session and wait for the broker's CONNACK
    ///
    /// Any failure before the first CONNACK, including a timeout or an
    /// unusable client id, is returned as [`TransportError::Connect`].
    pub async fn connect(options: ConnectOptions) -> Result<Self> {
        options.validate()?;
        let broker = options.broker_address();
        let (client, eventloop) = AsyncClient::new(options.to_mqtt_options(), REQUEST_CAPACITY);

        let shared = Arc::new(Shared {
            tracker: Mutex::new(DeliveryTracker::default()),
            subscriptions: RwLock::new(Vec::new()),
            metrics: MetricsTracker::new(),
            shutting_down: AtomicBool::new(false),
        });

        let (ready_tx, ready_rx) = oneshot::channel();
        let handle = tokio::spawn(run_event_loop(
            eventloop,
            Arc::clone(&shared),
            broker.clone(),
            ready_tx,
        ));

        let outcome = match tokio::time::timeout(options.connect_timeout, ready_rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(TransportError::connect(&broker, "event loop exited before CONNACK")),
            Err(_) => Err(TransportError::connect(
                &broker,
                format!("no CONNACK within {}ms", options.connect_timeout.as_millis()),
            )),
        };
        if let Err(err) = outcome {
            handle.abort();
            return Err(err);
        }

        info!(broker = %broker, client_id = %options.client_id, "Connected to MQTT broker");
        Ok(Self {
            client,
            shared,
            next_token: AtomicU64::new(1),
            suback_timeout: options.connect_timeout,
            request_order: tokio::sync::Mutex::new(()),
            event_loop: Mutex::new(Some(handle)),
        })
    }

    fn drop_subscription(&self, topic: &str) {
        self.shared
            .subscriptions
            .write()
            .retain(|(filter, _)| filter != topic);
    }
}

#[async_trait]
impl PubSubTransport for MqttTransport {
    async fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
        qos: QosLevel,
        retained: bool,
    ) -> Result<DeliveryToken> {
        let token_id = self.next_token.fetch_add(1, Ordering::Relaxed);
        let (token, sender) = DeliveryToken::pending(token_id, topic);
        let size = payload.len();

        let _order = self.request_order.lock().await;
        self.shared.tracker.lock().enqueue(PendingPublish {
            token_id,
            qos,
            sender,
        });

        if let Err(err) = self
            .client
            .publish(topic, to_mqtt_qos(qos), retained, payload)
            .await
        {
            self.shared.tracker.lock().cancel(token_id);
            self.shared.metrics.record_error();
            return Err(TransportError::publish_with_source(
                topic,
                "client rejected publish request",
                err,
            ));
        }

        self.shared.metrics.record_send(size);
        debug!(topic, token_id, bytes = size, qos = %qos, "Publish queued");
        Ok(token)
    }

    async fn subscribe(
        &self,
        topic: &str,
        qos: QosLevel,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<()> {
        self.shared
            .subscriptions
            .write()
            .push((topic.to_string(), handler));

        let (sender, receiver) = oneshot::channel();
        {
            let _order = self.request_order.lock().await;
            self.shared.tracker.lock().enqueue_subscribe(sender);
            if let Err(err) = self.client.subscribe(topic, to_mqtt_qos(qos)).await {
                self.shared.tracker.lock().cancel_last_subscribe();
                self.drop_subscription(topic);
                return Err(TransportError::subscribe_with_source(
                    topic,
                    "client rejected subscribe request",
                    err,
                ));
            }
        }

        let failure = match tokio::time::timeout(self.suback_timeout, receiver).await {
            Ok(Ok(Ok(granted))) => {
                info!(topic, qos = %qos, granted = ?granted, "Subscribed");
                return Ok(());
            }
            Ok(Ok(Err(reason))) => reason,
            Ok(Err(_)) => "subscription tracking dropped before SUBACK".to_string(),
            Err(_) => format!("no SUBACK within {}ms", self.suback_timeout.as_millis()),
        };
        self.drop_subscription(topic);
        Err(TransportError::subscribe(topic, failure))
    }

    async fn disconnect(&self) -> Result<()> {
        self.shared.shutting_down.store(true, Ordering::Release);
        if let Err(err) = self.client.disconnect().await {
            // Event loop already gone; nothing left to close
            debug!(error = %err, "Disconnect request not delivered");
        }
        Ok(())
    }

    fn metrics(&self) -> TransportMetrics {
        self.shared.metrics.snapshot()
    }
}

impl Drop for MqttTransport {
    fn drop(&mut self) {
        if let Some(handle) = self.event_loop.lock().take() {
            handle.abort();
        }
    }
}

async fn run_event_loop(
    mut eventloop: EventLoop,
    shared: Arc<Shared>,
    broker: String,
    ready: oneshot::Sender<Result<()>>,
) {
    let mut ready = Some(ready);

    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                if ack.code == ConnectReturnCode::Success {
                    if let Some(ready) = ready.take() {
                        let _ = ready.send(Ok(()));
                    } else {
                        info!(broker = %broker, "Reconnected to MQTT broker");
                    }
                }
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                shared.dispatch(&publish.topic, &publish.payload);
            }
            Ok(Event::Incoming(Packet::PubAck(ack))) => {
                shared.tracker.lock().on_broker_ack(ack.pkid);
            }
            Ok(Event::Incoming(Packet::PubComp(comp))) => {
                shared.tracker.lock().on_broker_ack(comp.pkid);
            }
            Ok(Event::Incoming(Packet::SubAck(ack))) => {
                shared.tracker.lock().on_suback(ack.pkid, &ack.return_codes);
            }
            Ok(Event::Outgoing(Outgoing::Publish(pkid))) => {
                shared.tracker.lock().on_outgoing_publish(pkid);
            }
            Ok(Event::Outgoing(Outgoing::Subscribe(pkid))) => {
                shared.tracker.lock().on_outgoing_subscribe(pkid);
            }
            Ok(_) => {}
            Err(ConnectionError::MqttState(StateError::OutgoingPacketTooLarge { pkt_size, max })) => {
                shared.metrics.record_error();
                let token_id = shared.tracker.lock().on_publish_refused();
                warn!(
                    broker = %broker,
                    token_id = ?token_id,
                    pkt_size,
                    max,
                    "Publish larger than max_packet_size was not sent"
                );
            }
            Err(err) => {
                if let Some(ready) = ready.take() {
                    let _ = ready.send(Err(TransportError::connect_with_source(
                        &broker,
                        "connection failed",
                        err,
                    )));
                    return;
                }
                if shared.shutting_down.load(Ordering::Acquire) {
                    debug!(broker = %broker, "Event loop stopped after disconnect");
                    return;
                }
                shared.metrics.record_error();
                warn!(broker = %broker, error = %err, "MQTT connection error, retrying");
                tokio::time::sleep(RECONNECT_BACKOFF).await;
            }
        }
    }
}
