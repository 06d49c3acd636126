//! Publisher → transport → subscriber over the in-process broker

use std::time::Duration;

use bench_e2e_tests::{all_passed, validate, PipelineScenario};
use codec::{Fidelity, WireFormat};
use network::QosLevel;
use types::PayloadTier;

#[tokio::test]
async fn test_every_format_and_tier_round_trips() {
    for scenario in PipelineScenario::matrix(5) {
        let result = scenario.run_loopback().await.unwrap();
        let checks = validate(&result);
        assert!(all_passed(&checks), "{}: {:?}", result.name, checks);
        assert_eq!(result.receive.received, 5, "{}", result.name);
    }
}

#[tokio::test]
async fn test_core_fidelity_and_qos_zero() {
    let scenario = PipelineScenario::new(WireFormat::MsgPack, PayloadTier::Large)
        .with_fidelity(Fidelity::Core)
        .with_qos(QosLevel::AtMostOnce)
        .with_count(3);
    let result = scenario.run_loopback().await.unwrap();
    assert!(all_passed(&validate(&result)));
    assert_eq!(result.name, "msgpack_core_large");
}

#[tokio::test]
async fn test_encoding_mismatch_is_counted_not_fatal() {
    let scenario = PipelineScenario::new(WireFormat::Json, PayloadTier::Small)
        .with_subscriber_format(WireFormat::Cbor)
        .with_count(4)
        .with_settle_timeout(Duration::from_millis(50));
    let result = scenario.run_loopback().await.unwrap();

    assert_eq!(result.publish.delivered, 4);
    assert_eq!(result.receive.received, 0);
    assert_eq!(result.receive.decode_failures, 4);
    assert!(result.receive.summary.is_none());
    assert!(!all_passed(&validate(&result)));
}

#[tokio::test]
async fn test_payload_size_grows_with_tier() {
    for format in [WireFormat::Json, WireFormat::MsgPack, WireFormat::Cbor] {
        let mut sizes = Vec::new();
        for tier in PayloadTier::ALL {
            let result = PipelineScenario::new(format, tier)
                .with_count(2)
                .run_loopback()
                .await
                .unwrap();
            sizes.push(result.publish.average_payload_bytes().unwrap());
        }
        assert!(sizes[0] < sizes[1] && sizes[1] < sizes[2], "{format}: {sizes:?}");
    }
}

#[tokio::test]
async fn test_protobuf_size_independent_of_tier() {
    let mut sizes = Vec::new();
    for tier in PayloadTier::ALL {
        let result = PipelineScenario::new(WireFormat::Protobuf, tier)
            .with_count(2)
            .run_loopback()
            .await
            .unwrap();
        sizes.push(result.publish.average_payload_bytes().unwrap());
    }
    assert!(sizes.iter().all(|&size| size == sizes[0]), "{sizes:?}");
}

#[tokio::test]
async fn test_row_reports_latencies() {
    let result = PipelineScenario::new(WireFormat::Cbor, PayloadTier::Medium)
        .with_count(3)
        .run_loopback()
        .await
        .unwrap();
    let row = result.row();
    assert_eq!(row.scenario, "cbor_full_medium");
    assert_eq!(row.delivered, 3);
    assert!(row.publish_p50_ms.is_some());
    assert!(row.receive_p50_ms.is_some());
    assert!(row.duration_ms > 0.0);
    assert!(row.messages_per_second.unwrap() > 0.0);
    let json = serde_json::to_value(&row).unwrap();
    assert_eq!(json["received"], 3);
    assert!(json["messages_per_second"].is_f64());
}
