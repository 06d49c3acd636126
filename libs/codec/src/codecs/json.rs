use serde_json::Value;
use types::TelemetryRecord;

use super::Codec;
use crate::error::{CodecError, CodecResult, DecodeError};
use crate::format::{Fidelity, WireFormat};
use crate::wire::{decode_map, WireRecord};

/// Flat JSON object, core fields first, nested `location` and `metadata`
///
/// Padding is written as a text string, so a record whose padding is not
/// valid UTF-8 is refused at encode time.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn format(&self) -> WireFormat {
        WireFormat::Json
    }

    fn fidelity(&self) -> Fidelity {
        Fidelity::Full
    }

    fn encode(&self, record: &TelemetryRecord) -> CodecResult<Vec<u8>> {
        let view = WireRecord::text(record, WireFormat::Json, Fidelity::Full)?;
        serde_json::to_vec(&view)
            .map_err(|e| CodecError::encode(WireFormat::Json, e))
    }

    fn decode(&self, bytes: &[u8]) -> CodecResult<TelemetryRecord> {
        let root: Value = serde_json::from_slice(bytes)
            .map_err(|e| DecodeError::malformed(WireFormat::Json, e))?;
        Ok(decode_map(WireFormat::Json, &root, Fidelity::Full)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::{PayloadGenerator, PayloadTier};

    #[test]
    fn test_core_fields_lead_the_object() {
        let mut record = TelemetryRecord::new(1.25, "sensor_001", 22.5, 55.0, 1013.0);
        record.status = "active".into();
        let text = String::from_utf8(JsonCodec.encode(&record).unwrap()).unwrap();

        assert!(text.starts_with(r#"{"timestamp":1.25,"sensor_id":"sensor_001","temperature":22.5"#));
        assert!(text.ends_with(r#""status":"active"}"#));
    }

    #[test]
    fn test_absent_fields_are_not_written() {
        let record = TelemetryRecord::new(1.0, "s", 1.0, 2.0, 3.0);
        let text = String::from_utf8(JsonCodec.encode(&record).unwrap()).unwrap();
        for key in ["location", "status", "battery_level", "additional_data"] {
            assert!(!text.contains(key), "{key} should be omitted");
        }
    }

    #[test]
    fn test_decode_tolerates_order_whitespace_and_number_forms() {
        let text = r#"
            {
                "status" : "idle",
                "pressure": 1.013e3,
                "humidity": 55,
                "temperature": 22.50,
                "sensor_id": "sensor_001",
                "timestamp": 1700000000.5,
                "firmware": "ignored"
            }"#;
        let record = JsonCodec.decode(text.as_bytes()).unwrap();
        assert_eq!(record.pressure, 1013.0);
        assert_eq!(record.humidity, 55.0);
        assert_eq!(record.temperature, 22.5);
        assert_eq!(record.status(), Some("idle"));
    }

    #[test]
    fn test_large_tier_round_trip_keeps_optionals() {
        let record = PayloadGenerator::seeded(5).generate("sensor_001", PayloadTier::Large);
        let decoded = JsonCodec.decode(&JsonCodec.encode(&record).unwrap()).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_multibyte_padding_keeps_byte_length() {
        let mut record = TelemetryRecord::new(1.0, "s", 1.0, 2.0, 3.0);
        record.additional_data = "é".repeat(750).into_bytes();
        let decoded = JsonCodec.decode(&JsonCodec.encode(&record).unwrap()).unwrap();
        assert_eq!(decoded.additional_data.len(), 1500);
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_non_utf8_padding_refused() {
        let mut record = TelemetryRecord::new(1.0, "s", 1.0, 2.0, 3.0);
        record.additional_data = vec![0xff; 1500];
        let err = JsonCodec.encode(&record).unwrap_err();
        assert!(matches!(err, CodecError::Encode { format: WireFormat::Json, .. }));
        assert!(err.to_string().contains("additional_data"));
    }

    #[test]
    fn test_non_object_document_rejected() {
        let err = JsonCodec.decode(b"[1, 2, 3]").unwrap_err();
        let decode = err.as_decode().unwrap();
        assert_eq!(decode.format, WireFormat::Json);
        assert_eq!(decode.field, crate::error::DOCUMENT_FIELD);
    }

    #[test]
    fn test_string_temperature_is_type_mismatch() {
        let text = br#"{"timestamp":1.0,"sensor_id":"s","temperature":"hot","humidity":1.0,"pressure":1.0}"#;
        let err = JsonCodec.decode(text).unwrap_err();
        assert_eq!(err.as_decode().unwrap().field, "temperature");
    }
}
