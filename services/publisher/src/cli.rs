//! Command-line flags, applied over the loaded configuration

use std::path::PathBuf;

use bench_config::BenchConfig;
use clap::Parser;
use codec::{Fidelity, WireFormat};
use types::PayloadTier;

#[derive(Parser, Debug, Default)]
#[command(name = "mqtt-publisher")]
#[command(about = "Publish generated telemetry records and time broker acknowledgement")]
pub struct PublisherArgs {
    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Broker host
    #[arg(short, long)]
    pub broker: Option<String>,

    /// Broker port
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Wire encoding: json, msgpack, cbor or protobuf
    #[arg(short, long)]
    pub encoding: Option<WireFormat>,

    /// Field coverage for msgpack and cbor: core or full
    #[arg(long)]
    pub fidelity: Option<Fidelity>,

    /// Topic to publish on
    #[arg(short, long)]
    pub topic: Option<String>,

    #[arg(short, long)]
    pub sensor_id: Option<String>,

    /// Number of messages to publish
    #[arg(short = 'n', long)]
    pub count: Option<u32>,

    /// Seconds between messages
    #[arg(short, long)]
    pub interval: Option<f64>,

    /// Payload tier: small, medium or large
    #[arg(long)]
    pub payload: Option<PayloadTier>,

    /// MQTT QoS level (0, 1 or 2)
    #[arg(short, long)]
    pub qos: Option<u8>,

    /// Seed for reproducible readings
    #[arg(long)]
    pub seed: Option<u64>,

    /// Milliseconds to wait for each broker acknowledgement
    #[arg(long)]
    pub ack_timeout: Option<u64>,

    /// Exact MQTT client id instead of `<prefix>-<uuid>`
    #[arg(long)]
    pub client_id: Option<String>,

    /// Publish to an in-process broker instead of the network
    #[arg(long)]
    pub loopback: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    pub print_config: bool,
}

impl PublisherArgs {
    /// Overwrite every configured value that was given on the command line
    pub fn apply_to(&self, config: &mut BenchConfig) {
        if let Some(broker) = &self.broker {
            config.broker.host = broker.clone();
        }
        if let Some(port) = self.port {
            config.broker.port = port;
        }
        if let Some(timeout) = self.ack_timeout {
            config.broker.delivery_timeout_ms = timeout;
        }

        let publisher = &mut config.publisher;
        if let Some(encoding) = self.encoding {
            publisher.encoding = encoding;
        }
        if let Some(fidelity) = self.fidelity {
            publisher.fidelity = fidelity;
        }
        if let Some(topic) = &self.topic {
            publisher.topic = topic.clone();
        }
        if let Some(sensor_id) = &self.sensor_id {
            publisher.sensor_id = sensor_id.clone();
        }
        if let Some(count) = self.count {
            publisher.count = count;
        }
        if let Some(interval) = self.interval {
            publisher.interval_secs = interval;
        }
        if let Some(payload) = self.payload {
            publisher.payload = payload;
        }
        if let Some(qos) = self.qos {
            publisher.qos = qos;
        }
        if self.seed.is_some() {
            publisher.seed = self.seed;
        }

        if self.json_logs {
            config.logging.json = true;
        }
    }
}
