//! Runs the format × tier matrix and prints one row per scenario

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use bench_config::{init_logging, BenchConfig, LoggingConfig};
use bench_e2e_tests::{all_passed, validate, PipelineScenario, ScenarioResult};
use clap::Parser;
use codec::WireFormat;
use network::{MqttTransport, PubSubTransport};
use tracing::{error, info};
use types::PayloadTier;

#[derive(Parser, Debug)]
#[command(name = "e2e_runner")]
#[command(about = "Publish and receive every format and payload tier, then compare")]
struct Args {
    /// Live broker host; the in-process loopback is used when omitted
    #[arg(short, long)]
    broker: Option<String>,

    #[arg(short, long, default_value_t = 1883)]
    port: u16,

    /// Messages per scenario
    #[arg(short = 'n', long, default_value_t = 10)]
    count: u32,

    /// Only run this encoding
    #[arg(short, long)]
    encoding: Option<WireFormat>,

    /// Only run this payload tier
    #[arg(long)]
    payload: Option<PayloadTier>,

    /// Print rows as JSON lines instead of a table
    #[arg(long)]
    json: bool,

    #[arg(short, long)]
    verbose: bool,
}

async fn run_scenario(args: &Args, scenario: &PipelineScenario) -> Result<ScenarioResult> {
    let Some(host) = &args.broker else {
        return scenario.run_loopback().await;
    };

    let mut config = BenchConfig::default();
    config.broker.host = host.clone();
    config.broker.port = args.port;

    let publisher = MqttTransport::connect(config.broker.connect_options("bench-e2e-pub"))
        .await
        .with_context(|| format!("Failed to connect publisher to {}", config.broker.address()))?;
    let subscriber = MqttTransport::connect(config.broker.connect_options("bench-e2e-sub"))
        .await
        .with_context(|| format!("Failed to connect subscriber to {}", config.broker.address()))?;
    let publisher: Arc<dyn PubSubTransport> = Arc::new(publisher);
    let subscriber: Arc<dyn PubSubTransport> = Arc::new(subscriber);

    let result = scenario
        .run(Arc::clone(&publisher), Arc::clone(&subscriber))
        .await;
    for transport in [publisher, subscriber] {
        if let Err(e) = transport.disconnect().await {
            error!("Disconnect failed: {}", e);
        }
    }
    result
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&LoggingConfig {
        level: if args.verbose { "debug" } else { "warn" }.to_string(),
        json: false,
    })?;
    info!("Starting end-to-end matrix");

    let scenarios: Vec<PipelineScenario> = PipelineScenario::matrix(args.count)
        .into_iter()
        .filter(|s| args.encoding.map_or(true, |format| s.format == format))
        .filter(|s| args.payload.map_or(true, |tier| s.tier == tier))
        .collect();

    if !args.json {
        println!(
            "{:<24} {:>9} {:>8} {:>9} {:>10} {:>10} {:>10}",
            "scenario", "delivered", "received", "bytes", "msg/s", "pub p50ms", "rx p50ms"
        );
    }

    let mut failures = 0;
    for scenario in &scenarios {
        let result = run_scenario(&args, scenario).await?;
        let row = result.row();

        if args.json {
            println!("{}", serde_json::to_string(&row)?);
        } else {
            let opt = |value: Option<f64>| value.map_or("-".to_string(), |v| format!("{:.3}", v));
            println!(
                "{:<24} {:>9} {:>8} {:>9} {:>10} {:>10} {:>10}",
                row.scenario,
                row.delivered,
                row.received,
                row.average_payload_bytes
                    .map_or("-".to_string(), |v| format!("{:.0}", v)),
                row.messages_per_second
                    .map_or("-".to_string(), |v| format!("{:.1}", v)),
                opt(row.publish_p50_ms),
                opt(row.receive_p50_ms),
            );
        }

        let checks = validate(&result);
        for check in checks.iter().filter(|c| !c.passed) {
            error!(
                scenario = %result.name,
                validator = check.validator,
                "Check failed: {}",
                check.message
            );
        }
        if !all_passed(&checks) {
            failures += 1;
        }
    }

    if failures > 0 {
        bail!("{} of {} scenarios failed validation", failures, scenarios.len());
    }
    Ok(())
}
