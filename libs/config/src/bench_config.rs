//! Benchmark Configuration
//!
//! Layered loading, lowest precedence first:
//!
//! 1. Built-in defaults ([`crate::defaults`])
//! 2. Optional TOML file
//! 3. `MQTT_BENCH_<SECTION>__<FIELD>` environment variables
//! 4. `MQTT_BROKER` / `MQTT_PORT`
//!
//! Command-line flags are applied on top by each binary.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use codec::{codec_for, Fidelity, WireFormat};
use config_crate::{Config, Environment, File};
use network::{ConnectOptions, QosLevel};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use types::{PayloadGenerator, PayloadTier, SENSOR_ID_MAX_BYTES};

use crate::defaults;

/// Complete configuration for a publisher or subscriber run
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct BenchConfig {
    pub broker: BrokerConfig,
    pub publisher: PublisherConfig,
    pub subscriber: SubscriberConfig,
    pub logging: LoggingConfig,
}

/// Broker session settings
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct BrokerConfig {
    pub host: String,
    pub port: u16,
    pub keep_alive_secs: u64,
    pub clean_session: bool,
    pub connect_timeout_secs: u64,
    pub delivery_timeout_ms: u64,
    pub max_packet_size: usize,
}

/// Publish loop settings
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct PublisherConfig {
    pub topic: String,
    pub sensor_id: String,
    pub count: u32,
    pub interval_secs: f64,
    pub payload: PayloadTier,
    pub qos: u8,
    pub encoding: WireFormat,
    /// Only consulted by the MessagePack and CBOR codecs
    pub fidelity: Fidelity,
    /// Fixed RNG seed for reproducible payloads
    pub seed: Option<u64>,
    pub client_id_prefix: String,
}

/// Receive loop settings
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct SubscriberConfig {
    pub topic: String,
    pub qos: u8,
    pub encoding: WireFormat,
    pub fidelity: Fidelity,
    /// Stop after this many messages; run until interrupted when unset
    pub max_messages: Option<u64>,
    pub client_id_prefix: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter directive, overridden by `RUST_LOG`
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: defaults::broker::HOST.to_string(),
            port: defaults::broker::PORT,
            keep_alive_secs: defaults::broker::KEEP_ALIVE_SECS,
            clean_session: defaults::broker::CLEAN_SESSION,
            connect_timeout_secs: defaults::broker::CONNECT_TIMEOUT_SECS,
            delivery_timeout_ms: defaults::broker::DELIVERY_TIMEOUT_MS,
            max_packet_size: defaults::broker::MAX_PACKET_SIZE,
        }
    }
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            topic: defaults::publisher::TOPIC.to_string(),
            sensor_id: defaults::publisher::SENSOR_ID.to_string(),
            count: defaults::publisher::COUNT,
            interval_secs: defaults::publisher::INTERVAL_SECS,
            payload: PayloadTier::default(),
            qos: defaults::publisher::QOS,
            encoding: WireFormat::default(),
            fidelity: Fidelity::default(),
            seed: None,
            client_id_prefix: defaults::publisher::CLIENT_ID_PREFIX.to_string(),
        }
    }
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            topic: defaults::subscriber::TOPIC.to_string(),
            qos: defaults::subscriber::QOS,
            encoding: WireFormat::default(),
            fidelity: Fidelity::default(),
            max_messages: None,
            client_id_prefix: defaults::subscriber::CLIENT_ID_PREFIX.to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::logging::LEVEL.to_string(),
            json: false,
        }
    }
}

impl BrokerConfig {
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn delivery_timeout(&self) -> Duration {
        Duration::from_millis(self.delivery_timeout_ms)
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Session options for a fresh client named `<prefix>-<uuid>`
    pub fn connect_options(&self, client_id_prefix: &str) -> ConnectOptions {
        ConnectOptions::new(self.host.clone(), self.port)
            .with_client_id(network::unique_client_id(client_id_prefix))
            .with_keep_alive(self.keep_alive())
            .with_clean_session(self.clean_session)
            .with_connect_timeout(self.connect_timeout())
            .with_max_packet_size(self.max_packet_size)
    }
}

impl PublisherConfig {
    /// Pause between messages
    pub fn interval(&self) -> Result<Duration> {
        Duration::try_from_secs_f64(self.interval_secs).with_context(|| {
            format!(
                "publisher.interval_secs must be a finite, non-negative number of seconds, got {}",
                self.interval_secs
            )
        })
    }

    pub fn qos_level(&self) -> Result<QosLevel> {
        qos_level("publisher.qos", self.qos)
    }
}

impl SubscriberConfig {
    pub fn qos_level(&self) -> Result<QosLevel> {
        qos_level("subscriber.qos", self.qos)
    }
}

impl BenchConfig {
    /// Load from an optional file plus the process environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, std::env::vars().collect())
    }

    /// Load from an optional file plus an explicit environment map
    pub fn load_with_env(path: Option<&Path>, env: HashMap<String, String>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            debug!("Loading benchmark config: {:?}", path);
            builder = builder.add_source(File::from(path).required(true));
        }

        let broker_port = env
            .get(defaults::broker::PORT_ENV)
            .map(|port| {
                port.parse::<u16>().with_context(|| {
                    format!("{} must be a port number, got '{}'", defaults::broker::PORT_ENV, port)
                })
            })
            .transpose()?;

        builder = builder
            .add_source(
                Environment::with_prefix(defaults::ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(Some(env.clone())),
            )
            .set_override_option("broker.host", env.get(defaults::broker::HOST_ENV).cloned())
            .context("Failed to apply broker host override")?
            .set_override_option("broker.port", broker_port.map(i64::from))
            .context("Failed to apply broker port override")?;

        let config: BenchConfig = builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Effective configuration as TOML, loadable again with [`BenchConfig::load`]
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }

    /// Smallest `broker.max_packet_size` that carries a large-tier record in
    /// any format on either configured topic
    pub fn required_packet_size(&self) -> Result<usize> {
        let record = PayloadGenerator::seeded(0).generate(&self.publisher.sensor_id, PayloadTier::Large);
        let mut largest = 0;
        for format in WireFormat::ALL {
            let encoded = codec_for(format, Fidelity::Full)
                .encode(&record)
                .with_context(|| format!("Failed to size a large {format} record"))?;
            largest = largest.max(encoded.len());
        }
        let topic = self.publisher.topic.len().max(self.subscriber.topic.len());
        Ok(largest + topic + defaults::broker::PACKET_HEADROOM)
    }

    /// Reject values the benchmark cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.broker.host.is_empty() {
            bail!("broker.host must not be empty");
        }
        if self.broker.port == 0 {
            bail!("broker.port must be non-zero");
        }
        if self.broker.delivery_timeout_ms == 0 {
            bail!("broker.delivery_timeout_ms must be non-zero");
        }
        self.publisher.qos_level()?;
        self.subscriber.qos_level()?;

        self.publisher.interval()?;
        if self.subscriber.max_messages == Some(0) {
            bail!("subscriber.max_messages must be at least 1; leave it unset to run until interrupted");
        }
        for (field, prefix) in [
            ("publisher.client_id_prefix", &self.publisher.client_id_prefix),
            ("subscriber.client_id_prefix", &self.subscriber.client_id_prefix),
        ] {
            if prefix.starts_with(char::is_whitespace) {
                bail!("{field} '{prefix}' must not start with whitespace");
            }
        }
        if self.publisher.topic.is_empty() {
            bail!("publisher.topic must not be empty");
        }
        if self.publisher.topic.contains(['+', '#']) {
            bail!(
                "publisher.topic '{}' must not contain wildcards",
                self.publisher.topic
            );
        }
        if self.subscriber.topic.is_empty() {
            bail!("subscriber.topic must not be empty");
        }
        let required = self.required_packet_size()?;
        if self.broker.max_packet_size < required {
            bail!(
                "broker.max_packet_size is {} bytes but a large-tier message needs at least {}",
                self.broker.max_packet_size,
                required
            );
        }
        if self.publisher.sensor_id.len() > SENSOR_ID_MAX_BYTES {
            warn!(
                "publisher.sensor_id is {} bytes and will be truncated to {}",
                self.publisher.sensor_id.len(),
                SENSOR_ID_MAX_BYTES
            );
        }
        Ok(())
    }
}

fn qos_level(field: &str, qos: u8) -> Result<QosLevel> {
    QosLevel::try_from(qos).with_context(|| format!("{field} must be 0, 1 or 2"))
}
