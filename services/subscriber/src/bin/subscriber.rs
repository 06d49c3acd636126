//! Telemetry subscriber binary
//!
//! Subscribes with a [`ReceiveMonitor`] and runs until Ctrl-C or until the
//! configured number of messages has been decoded, then logs the receive
//! latency summary.

use std::sync::Arc;

use anyhow::{Context, Result};
use bench_config::{init_logging, BenchConfig};
use clap::Parser;
use codec::codec_for;
use network::{MessageHandler, MqttTransport, PubSubTransport};
use subscriber::{ReceiveMonitor, SubscriberArgs};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let args = SubscriberArgs::parse();

    let mut config = BenchConfig::load(args.config.as_deref())?;
    args.apply_to(&mut config);
    config.validate()?;

    if args.print_config {
        print!("{}", config.to_toml_string()?);
        return Ok(());
    }

    init_logging(&config.logging)?;
    info!("Starting telemetry subscriber");

    let mut options = config
        .broker
        .connect_options(&config.subscriber.client_id_prefix);
    if let Some(client_id) = &args.client_id {
        options = options.with_client_id(client_id.clone());
    }
    let transport = MqttTransport::connect(options)
        .await
        .with_context(|| format!("Failed to connect to broker at {}", config.broker.address()))?;

    let monitor = Arc::new(
        ReceiveMonitor::new(codec_for(
            config.subscriber.encoding,
            config.subscriber.fidelity,
        ))
        .with_max_messages(config.subscriber.max_messages),
    );
    let handler: Arc<dyn MessageHandler> = monitor.clone();
    let topic = &config.subscriber.topic;
    transport
        .subscribe(topic, config.subscriber.qos_level()?, handler)
        .await
        .with_context(|| format!("Failed to subscribe to '{}'", topic))?;
    info!(
        encoding = %config.subscriber.encoding,
        "Subscribed to {} on {}",
        topic,
        config.broker.address()
    );

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("Interrupted"),
        _ = monitor.wait_for_limit() => info!("Message limit reached"),
    }

    if let Err(e) = transport.disconnect().await {
        warn!("Disconnect failed: {}", e);
    }

    monitor.report().log();
    monitor.harness().log_report();
    info!("Subscriber stopped");
    Ok(())
}
