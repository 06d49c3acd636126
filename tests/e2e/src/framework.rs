//! Scenario runner: publish loop → transport → receive monitor

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use codec::{codec_for, Fidelity, WireFormat};
use network::{LoopbackTransport, PubSubTransport, QosLevel};
use publisher::{PublishLoop, PublishReport, PublishSettings};
use serde::Serialize;
use subscriber::{ReceiveMonitor, ReceiveReport};
use tracing::{info, warn};
use types::{PayloadGenerator, PayloadTier};

pub const SCENARIO_SENSOR_ID: &str = "sensor_e2e";

/// One publisher/subscriber pairing
#[derive(Debug, Clone)]
pub struct PipelineScenario {
    pub format: WireFormat,
    /// Encoding the subscriber expects; differs from `format` only in mismatch tests
    pub subscriber_format: WireFormat,
    pub fidelity: Fidelity,
    pub tier: PayloadTier,
    pub count: u32,
    pub qos: QosLevel,
    pub topic: String,
    pub seed: u64,
    pub delivery_timeout: Duration,
    /// How long to wait for the last arrivals after publishing ends
    pub settle_timeout: Duration,
}

impl PipelineScenario {
    pub fn new(format: WireFormat, tier: PayloadTier) -> Self {
        Self {
            format,
            subscriber_format: format,
            fidelity: Fidelity::Full,
            tier,
            count: 10,
            qos: QosLevel::AtLeastOnce,
            topic: format!("bench-e2e/{}/{}", format, tier),
            seed: 42,
            delivery_timeout: Duration::from_secs(1),
            settle_timeout: Duration::from_secs(5),
        }
    }

    /// Every format paired with every tier
    pub fn matrix(count: u32) -> Vec<Self> {
        WireFormat::ALL
            .iter()
            .flat_map(|&format| {
                PayloadTier::ALL
                    .iter()
                    .map(move |&tier| Self::new(format, tier).with_count(count))
            })
            .collect()
    }

    pub fn with_count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }

    pub fn with_fidelity(mut self, fidelity: Fidelity) -> Self {
        self.fidelity = fidelity;
        self
    }

    pub fn with_qos(mut self, qos: QosLevel) -> Self {
        self.qos = qos;
        self
    }

    pub fn with_subscriber_format(mut self, format: WireFormat) -> Self {
        self.subscriber_format = format;
        self
    }

    pub fn with_settle_timeout(mut self, timeout: Duration) -> Self {
        self.settle_timeout = timeout;
        self
    }

    pub fn name(&self) -> String {
        format!("{}_{}_{}", self.format, self.fidelity, self.tier)
    }

    /// Run against a fresh in-process broker
    pub async fn run_loopback(&self) -> Result<ScenarioResult> {
        let broker = LoopbackTransport::new();
        self.run(Arc::new(broker.clone()), Arc::new(broker)).await
    }

    /// Run with separate publishing and subscribing sessions
    pub async fn run(
        &self,
        publisher: Arc<dyn PubSubTransport>,
        subscriber: Arc<dyn PubSubTransport>,
    ) -> Result<ScenarioResult> {
        let started = Instant::now();

        let monitor = Arc::new(
            ReceiveMonitor::new(codec_for(self.subscriber_format, self.fidelity))
                .with_max_messages(Some(u64::from(self.count))),
        );
        subscriber
            .subscribe(&self.topic, self.qos, monitor.clone())
            .await
            .with_context(|| format!("Scenario {} could not subscribe", self.name()))?;

        let settings = PublishSettings {
            topic: self.topic.clone(),
            sensor_id: SCENARIO_SENSOR_ID.to_string(),
            count: self.count,
            interval: Duration::ZERO,
            tier: self.tier,
            qos: self.qos,
            retained: false,
            delivery_timeout: self.delivery_timeout,
        };
        let mut publish_loop = PublishLoop::new(
            publisher,
            codec_for(self.format, self.fidelity),
            PayloadGenerator::seeded(self.seed),
            settings,
        );
        let publish = publish_loop.run().await;

        if self.count > 0
            && tokio::time::timeout(self.settle_timeout, monitor.wait_for_limit())
                .await
                .is_err()
        {
            warn!(
                scenario = %self.name(),
                received = monitor.received(),
                expected = self.count,
                "Not every message arrived before the settle timeout"
            );
        }

        let result = ScenarioResult {
            name: self.name(),
            expected: self.count,
            publish,
            receive: monitor.report(),
            duration: started.elapsed(),
        };
        info!(
            scenario = %result.name,
            delivered = result.publish.delivered,
            received = result.receive.received,
            "Scenario finished in {:?}",
            result.duration
        );
        Ok(result)
    }
}

#[derive(Debug, Clone)]
pub struct ScenarioResult {
    pub name: String,
    pub expected: u32,
    pub publish: PublishReport,
    pub receive: ReceiveReport,
    pub duration: Duration,
}

/// Flat, serializable view of a result for tables and JSON output
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioRow {
    pub scenario: String,
    pub delivered: u32,
    pub received: u64,
    pub decode_failures: u64,
    pub average_payload_bytes: Option<f64>,
    /// Publish run time, interval sleeps included
    pub duration_ms: f64,
    pub messages_per_second: Option<f64>,
    pub publish_p50_ms: Option<f64>,
    pub publish_p99_ms: Option<f64>,
    pub receive_p50_ms: Option<f64>,
}

impl ScenarioResult {
    pub fn row(&self) -> ScenarioRow {
        let ms = |seconds: f64| seconds * 1000.0;
        ScenarioRow {
            scenario: self.name.clone(),
            delivered: self.publish.delivered,
            received: self.receive.received,
            decode_failures: self.receive.decode_failures,
            average_payload_bytes: self.publish.average_payload_bytes(),
            duration_ms: ms(self.publish.elapsed.as_secs_f64()),
            messages_per_second: self.publish.messages_per_second(),
            publish_p50_ms: self.publish.summary.as_ref().map(|s| ms(s.p50)),
            publish_p99_ms: self.publish.summary.as_ref().map(|s| ms(s.p99)),
            receive_p50_ms: self.receive.summary.as_ref().map(|s| ms(s.p50)),
        }
    }
}
