//! Telemetry publisher binary
//!
//! Loads the layered configuration, connects to the broker and runs one
//! publish loop. A broker that cannot be reached at startup is the only
//! fatal condition.

use std::sync::Arc;

use anyhow::{Context, Result};
use bench_config::{init_logging, BenchConfig};
use clap::Parser;
use codec::codec_for;
use network::{LoopbackTransport, MqttTransport, PubSubTransport};
use publisher::{PublishLoop, PublishSettings, PublisherArgs};
use tracing::{info, warn};
use types::PayloadGenerator;

#[tokio::main]
async fn main() -> Result<()> {
    let args = PublisherArgs::parse();

    let mut config = BenchConfig::load(args.config.as_deref())?;
    args.apply_to(&mut config);
    config.validate()?;

    if args.print_config {
        print!("{}", config.to_toml_string()?);
        return Ok(());
    }

    init_logging(&config.logging)?;
    info!(
        "Starting telemetry publisher: {} {} messages as {} to '{}' on {} (qos {})",
        config.publisher.count,
        config.publisher.payload,
        config.publisher.encoding,
        config.publisher.topic,
        config.broker.address(),
        config.publisher.qos
    );

    let transport: Arc<dyn PubSubTransport> = if args.loopback {
        info!("Publishing to in-process loopback broker");
        Arc::new(LoopbackTransport::new())
    } else {
        let mut options = config
            .broker
            .connect_options(&config.publisher.client_id_prefix);
        if let Some(client_id) = &args.client_id {
            options = options.with_client_id(client_id.clone());
        }
        let transport = MqttTransport::connect(options)
            .await
            .with_context(|| format!("Failed to connect to broker at {}", config.broker.address()))?;
        info!("Connected to broker at {}", config.broker.address());
        Arc::new(transport)
    };

    let generator = match config.publisher.seed {
        Some(seed) => PayloadGenerator::seeded(seed),
        None => PayloadGenerator::from_entropy(),
    };
    let codec = codec_for(config.publisher.encoding, config.publisher.fidelity);
    let settings = PublishSettings::from_config(&config)?;
    let mut publish_loop = PublishLoop::new(Arc::clone(&transport), codec, generator, settings);

    let report = tokio::select! {
        report = publish_loop.run() => report,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, stopping publish run");
            publish_loop.report()
        }
    };

    report.log();
    publish_loop.harness().log_report();

    let metrics = transport.metrics();
    info!(
        messages_sent = metrics.messages_sent,
        bytes_sent = metrics.bytes_sent,
        errors = metrics.errors,
        "Transport totals"
    );

    if let Err(e) = transport.disconnect().await {
        warn!("Disconnect failed: {}", e);
    }

    info!("Publisher stopped");
    Ok(())
}
