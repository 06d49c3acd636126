use ciborium::value::Value as BlobValue;
use serde::Deserialize;
use serde_json::{Map, Value};
use types::TelemetryRecord;

use super::Codec;
use crate::error::{CodecError, CodecResult, DecodeError};
use crate::format::{Fidelity, WireFormat};
use crate::wire::{decode_map, keys, WireRecord};

/// MessagePack map keyed by the JSON field names
///
/// Floats are always written as 8-byte `float 64` values and padding as
/// `bin`. With [`Fidelity::Core`] only the five core entries are written and
/// any other keys are ignored on decode.
#[derive(Debug, Clone, Copy, Default)]
pub struct MsgPackCodec {
    fidelity: Fidelity,
}

impl MsgPackCodec {
    pub fn new(fidelity: Fidelity) -> Self {
        Self { fidelity }
    }
}

impl Codec for MsgPackCodec {
    fn format(&self) -> WireFormat {
        WireFormat::MsgPack
    }

    fn fidelity(&self) -> Fidelity {
        self.fidelity
    }

    fn encode(&self, record: &TelemetryRecord) -> CodecResult<Vec<u8>> {
        rmp_serde::to_vec_named(&WireRecord::binary(record, self.fidelity))
            .map_err(|e| CodecError::encode(WireFormat::MsgPack, e))
    }

    fn decode(&self, bytes: &[u8]) -> CodecResult<TelemetryRecord> {
        let document: MsgPackDocument = rmp_serde::from_slice(bytes)
            .map_err(|e| DecodeError::malformed(WireFormat::MsgPack, e))?;
        let root = Value::Object(document.fields);
        let mut record = decode_map(WireFormat::MsgPack, &root, self.fidelity)?;

        if self.fidelity.carries_optional_fields() {
            if let Some(padding) = document.additional_data {
                record.additional_data = padding_bytes(padding)?;
            }
        }
        Ok(record)
    }
}

/// Top-level map with the padding held apart
///
/// A JSON value tree has no byte strings, so `bin` padding is read into a
/// CBOR value instead and everything else goes through the shared reader.
#[derive(Debug, Deserialize)]
struct MsgPackDocument {
    #[serde(default)]
    additional_data: Option<BlobValue>,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

/// `bin` is what the encoder writes; `str` is accepted from older publishers
fn padding_bytes(value: BlobValue) -> Result<Vec<u8>, DecodeError> {
    let found = match value {
        BlobValue::Bytes(bytes) => return Ok(bytes),
        BlobValue::Text(text) => return Ok(text.into_bytes()),
        BlobValue::Integer(_) => "integer",
        BlobValue::Float(_) => "float",
        BlobValue::Bool(_) => "bool",
        BlobValue::Array(_) => "array",
        BlobValue::Map(_) => "map",
        _ => "unknown",
    };
    Err(DecodeError::type_mismatch(
        WireFormat::MsgPack,
        keys::ADDITIONAL_DATA,
        "bin",
        found,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::{PayloadGenerator, PayloadTier};

    #[test]
    fn test_encodes_a_map_of_five_in_core_mode() {
        let record = PayloadGenerator::seeded(1).generate("sensor_001", PayloadTier::Medium);
        let bytes = MsgPackCodec::new(Fidelity::Core).encode(&record).unwrap();
        // fixmap with five entries
        assert_eq!(bytes[0], 0x85);
    }

    #[test]
    fn test_doubles_use_eight_byte_encoding() {
        let record = TelemetryRecord::new(1.0, "s", 2.0, 3.0, 4.0);
        let bytes = MsgPackCodec::default().encode(&record).unwrap();
        assert_eq!(bytes.iter().filter(|&&b| b == 0xcb).count(), 4);
    }

    #[test]
    fn test_full_fidelity_round_trip() {
        let record = PayloadGenerator::seeded(9).generate("sensor_001", PayloadTier::Large);
        let codec = MsgPackCodec::new(Fidelity::Full);
        assert_eq!(codec.decode(&codec.encode(&record).unwrap()).unwrap(), record);
    }

    #[test]
    fn test_core_fidelity_drops_optionals() {
        let record = PayloadGenerator::seeded(9).generate("sensor_001", PayloadTier::Medium);
        let codec = MsgPackCodec::new(Fidelity::Core);
        let decoded = codec.decode(&codec.encode(&record).unwrap()).unwrap();
        assert_eq!(decoded, record.to_core_only());
    }

    #[test]
    fn test_padding_written_as_bin() {
        let record = PayloadGenerator::seeded(2).generate("sensor_001", PayloadTier::Medium);
        let bytes = MsgPackCodec::default().encode(&record).unwrap();
        let key = keys::ADDITIONAL_DATA.as_bytes();
        let pos = bytes.windows(key.len()).position(|w| w == key).unwrap() + key.len();
        // bin 16 with a 1500-byte length
        assert_eq!(&bytes[pos..pos + 3], &[0xc5, 0x05, 0xdc]);
    }

    #[test]
    fn test_non_utf8_padding_round_trip() {
        let mut record = TelemetryRecord::new(1.0, "s", 1.0, 2.0, 3.0);
        record.additional_data = vec![0xff; 1500];
        let codec = MsgPackCodec::new(Fidelity::Full);
        let decoded = codec.decode(&codec.encode(&record).unwrap()).unwrap();
        assert_eq!(decoded.additional_data, vec![0xff; 1500]);
    }

    #[test]
    fn test_text_padding_accepted() {
        #[derive(serde::Serialize)]
        struct TextPadded<'a> {
            timestamp: f64,
            sensor_id: &'a str,
            temperature: f64,
            humidity: f64,
            pressure: f64,
            additional_data: &'a str,
        }
        let bytes = rmp_serde::to_vec_named(&TextPadded {
            timestamp: 1.0,
            sensor_id: "s",
            temperature: 1.0,
            humidity: 2.0,
            pressure: 3.0,
            additional_data: "xxxx",
        })
        .unwrap();
        let record = MsgPackCodec::default().decode(&bytes).unwrap();
        assert_eq!(record.additional_data, b"xxxx".to_vec());
    }

    #[test]
    fn test_numeric_padding_is_type_mismatch() {
        #[derive(serde::Serialize)]
        struct NumericPadded<'a> {
            timestamp: f64,
            sensor_id: &'a str,
            temperature: f64,
            humidity: f64,
            pressure: f64,
            additional_data: u32,
        }
        let bytes = rmp_serde::to_vec_named(&NumericPadded {
            timestamp: 1.0,
            sensor_id: "s",
            temperature: 1.0,
            humidity: 2.0,
            pressure: 3.0,
            additional_data: 7,
        })
        .unwrap();
        let err = MsgPackCodec::default().decode(&bytes).unwrap_err();
        assert_eq!(err.as_decode().unwrap().field, keys::ADDITIONAL_DATA);
    }

    #[test]
    fn test_unknown_keys_ignored() {
        #[derive(serde::Serialize)]
        struct Extended<'a> {
            firmware_channel: &'a str,
            timestamp: f64,
            sensor_id: &'a str,
            temperature: f64,
            humidity: f64,
            pressure: f64,
        }
        let bytes = rmp_serde::to_vec_named(&Extended {
            firmware_channel: "beta",
            timestamp: 10.5,
            sensor_id: "s",
            temperature: 1.0,
            humidity: 2.0,
            pressure: 3.0,
        })
        .unwrap();
        let record = MsgPackCodec::default().decode(&bytes).unwrap();
        assert_eq!(record.timestamp, 10.5);
        assert!(record.is_core_only());
    }
}
