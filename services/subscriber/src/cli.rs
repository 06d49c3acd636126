//! Command-line flags, applied over the loaded configuration

use std::path::PathBuf;

use bench_config::BenchConfig;
use clap::Parser;
use codec::{Fidelity, WireFormat};

#[derive(Parser, Debug, Default)]
#[command(name = "mqtt-subscriber")]
#[command(about = "Subscribe to telemetry, decode it and report end-to-end latency")]
pub struct SubscriberArgs {
    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Broker host
    #[arg(short, long)]
    pub broker: Option<String>,

    /// Broker port
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Expected wire encoding: json, msgpack, cbor or protobuf
    #[arg(short, long)]
    pub encoding: Option<WireFormat>,

    /// Field coverage for msgpack and cbor: core or full
    #[arg(long)]
    pub fidelity: Option<Fidelity>,

    /// Topic filter; `+` and `#` wildcards allowed
    #[arg(short, long)]
    pub topic: Option<String>,

    /// MQTT QoS level (0, 1 or 2)
    #[arg(short, long)]
    pub qos: Option<u8>,

    /// Exact MQTT client id instead of `<prefix>-<uuid>`
    #[arg(long)]
    pub client_id: Option<String>,

    /// Stop after this many decoded messages
    #[arg(short = 'n', long)]
    pub max_messages: Option<u64>,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    pub print_config: bool,
}

impl SubscriberArgs {
    pub fn apply_to(&self, config: &mut BenchConfig) {
        if let Some(broker) = &self.broker {
            config.broker.host = broker.clone();
        }
        if let Some(port) = self.port {
            config.broker.port = port;
        }

        let subscriber = &mut config.subscriber;
        if let Some(encoding) = self.encoding {
            subscriber.encoding = encoding;
        }
        if let Some(fidelity) = self.fidelity {
            subscriber.fidelity = fidelity;
        }
        if let Some(topic) = &self.topic {
            subscriber.topic = topic.clone();
        }
        if let Some(qos) = self.qos {
            subscriber.qos = qos;
        }
        if self.max_messages.is_some() {
            subscriber.max_messages = self.max_messages;
        }

        if self.json_logs {
            config.logging.json = true;
        }
    }
}
