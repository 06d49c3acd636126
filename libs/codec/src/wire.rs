//! Self-describing map layout shared by the JSON and MessagePack codecs
//!
//! Encoding goes through [`WireRecord`], a borrowed serde view of a record
//! whose optional members are `None` unless the presence predicate holds.
//! Core fields are declared first so serializers emit them first.
//!
//! Padding is the one member whose representation differs: JSON carries it
//! as a text string and refuses bytes that are not UTF-8, MessagePack
//! carries it as `bin`.
//!
//! Decoding goes through [`decode_map`], which reads a generic
//! `serde_json::Value` object field by field. Reading through a value tree
//! instead of a derived `Deserialize` lets every failure report the exact
//! field, and lets key order and unknown keys be ignored.

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use types::{Location, Metadata, TelemetryRecord};

use crate::error::{CodecError, DecodeError};
use crate::format::{Fidelity, WireFormat};

/// Map keys, identical across JSON, MessagePack and CBOR
pub mod keys {
    pub const TIMESTAMP: &str = "timestamp";
    pub const SENSOR_ID: &str = "sensor_id";
    pub const TEMPERATURE: &str = "temperature";
    pub const HUMIDITY: &str = "humidity";
    pub const PRESSURE: &str = "pressure";
    pub const LOCATION: &str = "location";
    pub const STATUS: &str = "status";
    pub const BATTERY_LEVEL: &str = "battery_level";
    pub const SIGNAL_STRENGTH: &str = "signal_strength";
    pub const SENSOR_READINGS: &str = "sensor_readings";
    pub const METADATA: &str = "metadata";
    pub const ADDITIONAL_DATA: &str = "additional_data";

    pub const LAT: &str = "lat";
    pub const LON: &str = "lon";
    pub const ALTITUDE: &str = "altitude";

    pub const FIRMWARE_VERSION: &str = "firmware_version";
    pub const HARDWARE_ID: &str = "hardware_id";
    pub const CALIBRATION_DATE: &str = "calibration_date";
    pub const LAST_MAINTENANCE: &str = "last_maintenance";
}

/// Borrowed serde view of a record
#[derive(Debug, Serialize)]
pub(crate) struct WireRecord<'a> {
    timestamp: f64,
    sensor_id: &'a str,
    temperature: f64,
    humidity: f64,
    pressure: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<&'a Location>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    battery_level: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    signal_strength: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sensor_readings: Option<&'a [f64]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<&'a Metadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    additional_data: Option<Padding<'a>>,
}

/// How the padding blob is written
#[derive(Debug)]
enum Padding<'a> {
    Text(&'a str),
    Binary(&'a [u8]),
}

impl Serialize for Padding<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Padding::Text(text) => serializer.serialize_str(text),
            Padding::Binary(bytes) => serializer.serialize_bytes(bytes),
        }
    }
}

impl<'a> WireRecord<'a> {
    /// View with the padding as a text string
    ///
    /// Fails if the padding is not valid UTF-8; rewriting it would change
    /// its length.
    pub(crate) fn text(
        record: &'a TelemetryRecord,
        format: WireFormat,
        fidelity: Fidelity,
    ) -> Result<Self, CodecError> {
        let mut view = Self::binary(record, fidelity);
        view.additional_data = match view.additional_data {
            Some(Padding::Binary(bytes)) => {
                let text = std::str::from_utf8(bytes).map_err(|e| {
                    CodecError::encode(
                        format,
                        format!("{} is not valid UTF-8: {e}", keys::ADDITIONAL_DATA),
                    )
                })?;
                Some(Padding::Text(text))
            }
            other => other,
        };
        Ok(view)
    }

    /// View with the padding as a byte string
    pub(crate) fn binary(record: &'a TelemetryRecord, fidelity: Fidelity) -> Self {
        let full = fidelity.carries_optional_fields();
        Self {
            timestamp: record.timestamp,
            sensor_id: record.sensor_id(),
            temperature: record.temperature,
            humidity: record.humidity,
            pressure: record.pressure,
            location: record.location().filter(|_| full),
            status: record.status().filter(|_| full),
            battery_level: record.battery_level().filter(|_| full),
            signal_strength: record.signal_strength().filter(|_| full),
            sensor_readings: record.sensor_readings().filter(|_| full),
            metadata: record.metadata().filter(|_| full),
            additional_data: record
                .additional_data()
                .filter(|_| full)
                .map(Padding::Binary),
        }
    }
}

/// Short description of a value's JSON type, used in mismatch errors
pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Field-by-field reader over one object level
struct FieldReader<'a> {
    format: WireFormat,
    map: &'a Map<String, Value>,
    scope: Option<&'static str>,
}

impl<'a> FieldReader<'a> {
    fn new(format: WireFormat, map: &'a Map<String, Value>) -> Self {
        Self {
            format,
            map,
            scope: None,
        }
    }

    fn path(&self, field: &str) -> String {
        match self.scope {
            Some(scope) => format!("{scope}.{field}"),
            None => field.to_string(),
        }
    }

    /// Null is treated the same as a missing key
    fn get(&self, field: &str) -> Option<&'a Value> {
        self.map.get(field).filter(|v| !v.is_null())
    }

    fn require(&self, field: &str) -> Result<&'a Value, DecodeError> {
        self.get(field)
            .ok_or_else(|| DecodeError::missing_field(self.format, self.path(field)))
    }

    fn as_f64(&self, field: &str, value: &Value) -> Result<f64, DecodeError> {
        value.as_f64().ok_or_else(|| {
            DecodeError::type_mismatch(self.format, self.path(field), "number", value_kind(value))
        })
    }

    fn as_str(&self, field: &str, value: &'a Value) -> Result<&'a str, DecodeError> {
        value.as_str().ok_or_else(|| {
            DecodeError::type_mismatch(self.format, self.path(field), "string", value_kind(value))
        })
    }

    fn required_f64(&self, field: &str) -> Result<f64, DecodeError> {
        let value = self.require(field)?;
        self.as_f64(field, value)
    }

    fn required_str(&self, field: &str) -> Result<&'a str, DecodeError> {
        let value = self.require(field)?;
        self.as_str(field, value)
    }

    fn optional_f64(&self, field: &str) -> Result<Option<f64>, DecodeError> {
        self.get(field).map(|v| self.as_f64(field, v)).transpose()
    }

    fn optional_str(&self, field: &str) -> Result<Option<&'a str>, DecodeError> {
        self.get(field).map(|v| self.as_str(field, v)).transpose()
    }

    fn optional_i32(&self, field: &str) -> Result<Option<i32>, DecodeError> {
        let Some(value) = self.get(field) else {
            return Ok(None);
        };
        let wide = value.as_i64().ok_or_else(|| {
            DecodeError::type_mismatch(self.format, self.path(field), "integer", value_kind(value))
        })?;
        i32::try_from(wide)
            .map(Some)
            .map_err(|_| DecodeError::invalid_value(self.format, self.path(field), format!("{wide} out of i32 range")))
    }

    fn optional_object(&self, field: &'static str) -> Result<Option<FieldReader<'a>>, DecodeError> {
        let Some(value) = self.get(field) else {
            return Ok(None);
        };
        let map = value.as_object().ok_or_else(|| {
            DecodeError::type_mismatch(self.format, self.path(field), "object", value_kind(value))
        })?;
        Ok(Some(FieldReader {
            format: self.format,
            map,
            scope: Some(field),
        }))
    }

    fn optional_f64_array(&self, field: &str) -> Result<Option<Vec<f64>>, DecodeError> {
        let Some(value) = self.get(field) else {
            return Ok(None);
        };
        let items = value.as_array().ok_or_else(|| {
            DecodeError::type_mismatch(self.format, self.path(field), "array", value_kind(value))
        })?;
        items
            .iter()
            .enumerate()
            .map(|(i, item)| self.as_f64(&format!("{field}[{i}]"), item))
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }
}

/// Rebuild a record from a decoded top-level object
pub(crate) fn decode_map(
    format: WireFormat,
    root: &Value,
    fidelity: Fidelity,
) -> Result<TelemetryRecord, DecodeError> {
    let map = root.as_object().ok_or_else(|| {
        DecodeError::type_mismatch(format, crate::error::DOCUMENT_FIELD, "object", value_kind(root))
    })?;
    let reader = FieldReader::new(format, map);

    let mut record = TelemetryRecord::new(
        reader.required_f64(keys::TIMESTAMP)?,
        reader.required_str(keys::SENSOR_ID)?,
        reader.required_f64(keys::TEMPERATURE)?,
        reader.required_f64(keys::HUMIDITY)?,
        reader.required_f64(keys::PRESSURE)?,
    );

    if !fidelity.carries_optional_fields() {
        return Ok(record);
    }

    if let Some(location) = reader.optional_object(keys::LOCATION)? {
        record.location = Location::new(
            location.required_f64(keys::LAT)?,
            location.required_f64(keys::LON)?,
            location.required_f64(keys::ALTITUDE)?,
        );
    }
    if let Some(status) = reader.optional_str(keys::STATUS)? {
        record.status = status.to_string();
    }
    if let Some(battery_level) = reader.optional_f64(keys::BATTERY_LEVEL)? {
        record.battery_level = battery_level;
    }
    if let Some(signal_strength) = reader.optional_i32(keys::SIGNAL_STRENGTH)? {
        record.signal_strength = signal_strength;
    }
    if let Some(readings) = reader.optional_f64_array(keys::SENSOR_READINGS)? {
        record.sensor_readings = readings;
    }
    if let Some(metadata) = reader.optional_object(keys::METADATA)? {
        record.metadata = Metadata {
            firmware_version: metadata.required_str(keys::FIRMWARE_VERSION)?.to_string(),
            hardware_id: metadata.optional_str(keys::HARDWARE_ID)?.unwrap_or_default().to_string(),
            calibration_date: metadata
                .optional_str(keys::CALIBRATION_DATE)?
                .unwrap_or_default()
                .to_string(),
            last_maintenance: metadata
                .optional_str(keys::LAST_MAINTENANCE)?
                .unwrap_or_default()
                .to_string(),
        };
    }
    if let Some(padding) = reader.optional_str(keys::ADDITIONAL_DATA)? {
        record.additional_data = padding.as_bytes().to_vec();
    }

    Ok(record)
}
