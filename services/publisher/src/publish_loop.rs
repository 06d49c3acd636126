//! Generate → encode → publish → await delivery, once per message

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use bench_config::BenchConfig;
use codec::{Codec, WireFormat};
use network::{LatencyHarness, LatencySummary, PubSubTransport, QosLevel};
use rand::rngs::StdRng;
use rand::Rng;
use tracing::{debug, info, warn};
use types::{PayloadGenerator, PayloadTier};

use crate::error::PublishError;

/// What a run publishes and how long it waits for each acknowledgement
#[derive(Debug, Clone, PartialEq)]
pub struct PublishSettings {
    pub topic: String,
    pub sensor_id: String,
    pub count: u32,
    /// Pause between consecutive messages, not applied after the last
    pub interval: Duration,
    pub tier: PayloadTier,
    pub qos: QosLevel,
    pub retained: bool,
    pub delivery_timeout: Duration,
}

impl PublishSettings {
    pub fn from_config(config: &BenchConfig) -> Result<Self> {
        let publisher = &config.publisher;
        Ok(Self {
            topic: publisher.topic.clone(),
            sensor_id: publisher.sensor_id.clone(),
            count: publisher.count,
            interval: publisher.interval()?,
            tier: publisher.payload,
            qos: publisher.qos_level()?,
            retained: false,
            delivery_timeout: config.broker.delivery_timeout(),
        })
    }
}

/// Outcome counters for a publish run
#[derive(Debug, Clone, PartialEq)]
pub struct PublishReport {
    pub format: WireFormat,
    pub tier: PayloadTier,
    pub attempted: u32,
    pub delivered: u32,
    pub failed: u32,
    /// Payload bytes of acknowledged messages
    pub bytes_delivered: u64,
    /// Wall time from the first publish to the end of the run, interval
    /// sleeps included
    pub elapsed: Duration,
    /// Absent when no message was acknowledged
    pub summary: Option<LatencySummary>,
}

impl PublishReport {
    fn new(format: WireFormat, tier: PayloadTier) -> Self {
        Self {
            format,
            tier,
            attempted: 0,
            delivered: 0,
            failed: 0,
            bytes_delivered: 0,
            elapsed: Duration::ZERO,
            summary: None,
        }
    }

    pub fn average_payload_bytes(&self) -> Option<f64> {
        (self.delivered > 0).then(|| self.bytes_delivered as f64 / f64::from(self.delivered))
    }

    /// Acknowledged messages per second of run time
    pub fn messages_per_second(&self) -> Option<f64> {
        let seconds = self.elapsed.as_secs_f64();
        (seconds > 0.0).then(|| f64::from(self.delivered) / seconds)
    }

    pub fn log(&self) {
        info!(
            format = %self.format,
            tier = %self.tier,
            attempted = self.attempted,
            delivered = self.delivered,
            failed = self.failed,
            average_payload_bytes = self.average_payload_bytes().unwrap_or(0.0),
            elapsed_secs = self.elapsed.as_secs_f64(),
            messages_per_second = self.messages_per_second().unwrap_or(0.0),
            "Publish run finished: {}/{} delivered in {:.3}s",
            self.delivered,
            self.attempted,
            self.elapsed.as_secs_f64()
        );
    }
}

/// One publisher run over any [`PubSubTransport`]
pub struct PublishLoop<R = StdRng> {
    transport: Arc<dyn PubSubTransport>,
    codec: Box<dyn Codec>,
    generator: PayloadGenerator<R>,
    settings: PublishSettings,
    harness: LatencyHarness,
    report: PublishReport,
    started: Option<tokio::time::Instant>,
}

impl<R: Rng> PublishLoop<R> {
    pub fn new(
        transport: Arc<dyn PubSubTransport>,
        codec: Box<dyn Codec>,
        generator: PayloadGenerator<R>,
        settings: PublishSettings,
    ) -> Self {
        let report = PublishReport::new(codec.format(), settings.tier);
        Self {
            transport,
            codec,
            generator,
            settings,
            harness: LatencyHarness::publish(),
            report,
            started: None,
        }
    }

    pub fn harness(&self) -> &LatencyHarness {
        &self.harness
    }

    pub fn settings(&self) -> &PublishSettings {
        &self.settings
    }

    /// Counters so far, usable after an interrupted run
    pub fn report(&self) -> PublishReport {
        PublishReport {
            elapsed: self.started.map_or(Duration::ZERO, |started| started.elapsed()),
            summary: self.harness.summary().ok(),
            ..self.report.clone()
        }
    }

    /// Publish `count` messages, sleeping `interval` between them
    pub async fn run(&mut self) -> PublishReport {
        info!(
            topic = %self.settings.topic,
            format = %self.codec.format(),
            fidelity = %self.codec.fidelity(),
            tier = %self.settings.tier,
            count = self.settings.count,
            qos = %self.settings.qos,
            "Starting publish run"
        );
        self.started = Some(tokio::time::Instant::now());

        for sequence in 1..=self.settings.count {
            self.report.attempted += 1;
            match self.publish_one().await {
                Ok((bytes, latency)) => {
                    self.report.delivered += 1;
                    self.report.bytes_delivered += bytes as u64;
                    info!(
                        sequence,
                        bytes,
                        latency_ms = latency * 1000.0,
                        "Published message {}: {} bytes in {:.3} ms",
                        sequence,
                        bytes,
                        latency * 1000.0
                    );
                }
                Err(err) => {
                    self.report.failed += 1;
                    warn!(
                        sequence,
                        category = err.category(),
                        "Message {} not delivered: {}",
                        sequence,
                        err
                    );
                }
            }

            if sequence < self.settings.count && !self.settings.interval.is_zero() {
                tokio::time::sleep(self.settings.interval).await;
            }
        }

        self.report()
    }

    /// Send one generated record and return its size and latency in seconds
    async fn publish_one(&mut self) -> Result<(usize, f64), PublishError> {
        let record = self
            .generator
            .generate(&self.settings.sensor_id, self.settings.tier);

        let start = Instant::now();
        let payload = self.codec.encode(&record)?;
        let bytes = payload.len();

        let token = self
            .transport
            .publish(
                &self.settings.topic,
                payload,
                self.settings.qos,
                self.settings.retained,
            )
            .await?;
        let ack = self
            .transport
            .await_delivery(token, self.settings.delivery_timeout)
            .await?;

        let latency = self.harness.record_since(start);
        debug!(token_id = ack.token_id, packet_id = ack.packet_id, "Delivery acknowledged");
        Ok((bytes, latency))
    }
}
