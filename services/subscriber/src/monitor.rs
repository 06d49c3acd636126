//! Arrival handler feeding the receive-latency harness

use std::sync::atomic::{AtomicU64, Ordering};

use codec::{Codec, CodecResult, WireFormat};
use network::{LatencyHarness, LatencySummary, MessageHandler};
use tokio::sync::Notify;
use tracing::{info, warn};
use types::{unix_time_secs, TelemetryRecord};

/// Counters for a subscriber session
#[derive(Debug, Clone, PartialEq)]
pub struct ReceiveReport {
    pub format: WireFormat,
    pub received: u64,
    pub decode_failures: u64,
    pub bytes_received: u64,
    /// Absent when nothing decoded
    pub summary: Option<LatencySummary>,
}

impl ReceiveReport {
    pub fn log(&self) {
        info!(
            format = %self.format,
            received = self.received,
            decode_failures = self.decode_failures,
            bytes_received = self.bytes_received,
            "Subscriber finished: {} decoded, {} rejected",
            self.received,
            self.decode_failures
        );
    }
}

/// Decodes arrivals and records `arrival - record.timestamp`
pub struct ReceiveMonitor {
    codec: Box<dyn Codec>,
    harness: LatencyHarness,
    clock: fn() -> f64,
    received: AtomicU64,
    decode_failures: AtomicU64,
    bytes_received: AtomicU64,
    max_messages: Option<u64>,
    limit_reached: Notify,
}

impl ReceiveMonitor {
    pub fn new(codec: Box<dyn Codec>) -> Self {
        Self {
            codec,
            harness: LatencyHarness::receive(),
            clock: unix_time_secs,
            received: AtomicU64::new(0),
            decode_failures: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            max_messages: None,
            limit_reached: Notify::new(),
        }
    }

    /// Signal [`ReceiveMonitor::wait_for_limit`] after `max` decoded messages
    pub fn with_max_messages(mut self, max: Option<u64>) -> Self {
        self.max_messages = max;
        self
    }

    /// Override the arrival clock
    pub fn with_clock(mut self, clock: fn() -> f64) -> Self {
        self.clock = clock;
        self
    }

    pub fn harness(&self) -> &LatencyHarness {
        &self.harness
    }

    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Acquire)
    }

    pub fn decode_failures(&self) -> u64 {
        self.decode_failures.load(Ordering::Acquire)
    }

    /// Decode one payload that arrived at `received_at` (Unix seconds)
    ///
    /// On success the latency sample is recorded before the record is
    /// returned. On failure nothing is recorded.
    pub fn handle_at(&self, payload: &[u8], received_at: f64) -> CodecResult<TelemetryRecord> {
        self.bytes_received
            .fetch_add(payload.len() as u64, Ordering::Relaxed);

        let record = match self.codec.decode(payload) {
            Ok(record) => record,
            Err(err) => {
                self.decode_failures.fetch_add(1, Ordering::AcqRel);
                return Err(err);
            }
        };

        let latency = received_at - record.timestamp;
        self.harness.record(latency);

        let received = self.received.fetch_add(1, Ordering::AcqRel) + 1;
        if self.max_messages == Some(received) {
            self.limit_reached.notify_one();
        }
        Ok(record)
    }

    /// Resolve once `max_messages` have decoded; pending forever without a limit
    pub async fn wait_for_limit(&self) {
        match self.max_messages {
            None => std::future::pending::<()>().await,
            Some(max) if self.received() >= max => {}
            Some(_) => self.limit_reached.notified().await,
        }
    }

    pub fn report(&self) -> ReceiveReport {
        ReceiveReport {
            format: self.codec.format(),
            received: self.received(),
            decode_failures: self.decode_failures(),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            summary: self.harness.summary().ok(),
        }
    }
}

impl MessageHandler for ReceiveMonitor {
    fn on_message(&self, topic: &str, payload: &[u8]) {
        let received_at = (self.clock)();
        match self.handle_at(payload, received_at) {
            Ok(record) => info!(
                topic,
                bytes = payload.len(),
                latency_ms = (received_at - record.timestamp) * 1000.0,
                "Received {} at {:.3}: temperature {:.2}, humidity {:.2}, pressure {:.2}",
                record.sensor_id(),
                record.timestamp,
                record.temperature,
                record.humidity,
                record.pressure
            ),
            Err(err) => warn!(
                topic,
                bytes = payload.len(),
                "Dropping undecodable payload: {}",
                err
            ),
        }
    }
}
