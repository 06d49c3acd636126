//! # Network: Pub/Sub Transport and Latency Harness
//!
//! ## Purpose
//!
//! Everything between an encoded payload and the broker:
//! - [`PubSubTransport`]: publish, await delivery, subscribe
//! - [`MqttTransport`]: `rumqttc`-backed implementation
//! - [`LoopbackTransport`]: in-process broker for tests and dry runs
//! - [`LatencyHarness`]: per-leg latency samples and summaries
//!
//! ## What This Crate Does NOT Contain
//! - Payload encoding (belongs in `codec`)
//! - Record generation (belongs in `types`)
//!
//! The wire payload is exactly the codec output; no framing is added here.

pub mod error;
pub mod latency;
pub mod transports;

pub use error::{HarnessError, Result, TransportError};
pub use latency::{HarnessKind, LatencyHarness, LatencySummary};
pub use transports::{
    mqtt::unique_client_id, topic_matches, Ack, ConnectOptions, DeliveryToken, LoopbackTransport,
    MessageHandler, MetricsTracker, MqttTransport, PubSubTransport, QosLevel, TransportMetrics,
};
