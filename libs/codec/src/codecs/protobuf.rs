//! Protobuf codec
//!
//! The schema (`proto/sensor_data.proto`) carries only the five core fields.
//! Every optional field is dropped on encode, so this is the smallest and
//! the most lossy of the formats.
//!
//! Fields are declared with proto3 `optional` so a missing field is
//! distinguishable from a zero value, letting an empty or cut-short buffer
//! fail instead of decoding to a zeroed record.

use prost::Message;
use types::TelemetryRecord;

use super::Codec;
use crate::error::{CodecError, CodecResult, DecodeError};
use crate::format::{Fidelity, WireFormat};
use crate::wire::keys;

/// Generated-style message for `SensorData`
#[derive(Clone, PartialEq, Message)]
pub struct SensorDataProto {
    #[prost(double, optional, tag = "1")]
    pub timestamp: Option<f64>,
    #[prost(string, optional, tag = "2")]
    pub sensor_id: Option<String>,
    #[prost(double, optional, tag = "3")]
    pub temperature: Option<f64>,
    #[prost(double, optional, tag = "4")]
    pub humidity: Option<f64>,
    #[prost(double, optional, tag = "5")]
    pub pressure: Option<f64>,
}

impl From<&TelemetryRecord> for SensorDataProto {
    fn from(record: &TelemetryRecord) -> Self {
        Self {
            timestamp: Some(record.timestamp),
            sensor_id: Some(record.sensor_id().to_string()),
            temperature: Some(record.temperature),
            humidity: Some(record.humidity),
            pressure: Some(record.pressure),
        }
    }
}

impl TryFrom<SensorDataProto> for TelemetryRecord {
    type Error = DecodeError;

    fn try_from(proto: SensorDataProto) -> Result<Self, Self::Error> {
        let missing = |field: &str| DecodeError::missing_field(WireFormat::Protobuf, field);

        let timestamp = proto.timestamp.ok_or_else(|| missing(keys::TIMESTAMP))?;
        let sensor_id = proto.sensor_id.ok_or_else(|| missing(keys::SENSOR_ID))?;
        let temperature = proto.temperature.ok_or_else(|| missing(keys::TEMPERATURE))?;
        let humidity = proto.humidity.ok_or_else(|| missing(keys::HUMIDITY))?;
        let pressure = proto.pressure.ok_or_else(|| missing(keys::PRESSURE))?;

        Ok(TelemetryRecord::new(
            timestamp,
            &sensor_id,
            temperature,
            humidity,
            pressure,
        ))
    }
}

/// Protobuf `SensorData` message, core fields only
#[derive(Debug, Clone, Copy, Default)]
pub struct ProtobufCodec;

impl Codec for ProtobufCodec {
    fn format(&self) -> WireFormat {
        WireFormat::Protobuf
    }

    fn fidelity(&self) -> Fidelity {
        Fidelity::Core
    }

    fn encode(&self, record: &TelemetryRecord) -> CodecResult<Vec<u8>> {
        Ok(SensorDataProto::from(record).encode_to_vec())
    }

    fn decode(&self, bytes: &[u8]) -> CodecResult<TelemetryRecord> {
        let proto = SensorDataProto::decode(bytes)
            .map_err(|e| DecodeError::malformed(WireFormat::Protobuf, e))?;
        TelemetryRecord::try_from(proto).map_err(CodecError::from)
    }
}
