//! CBOR codec
//!
//! Encoding is done with a small header writer so every float goes out as a
//! major-type-7 double (`0xfb` + 8 bytes). Generic CBOR serializers shrink
//! floats to half or single precision when that is lossless, which changes
//! the wire layout receivers are built against.
//!
//! Decoding parses into a `ciborium::Value` tree and checks major types
//! strictly: `sensor_id` and other text fields must be text strings and
//! numeric fields must be floats. Integer-typed numerics are rejected.
//! Half and single precision floats are accepted since they share major
//! type 7 and widen losslessly.

use ciborium::value::Value;
use types::{Location, Metadata, TelemetryRecord};

use super::Codec;
use crate::error::{CodecResult, DecodeError, DOCUMENT_FIELD};
use crate::format::{Fidelity, WireFormat};
use crate::wire::keys;

const MAJOR_UNSIGNED: u8 = 0;
const MAJOR_NEGATIVE: u8 = 1;
const MAJOR_BYTES: u8 = 2;
const MAJOR_TEXT: u8 = 3;
const MAJOR_ARRAY: u8 = 4;
const MAJOR_MAP: u8 = 5;
const FLOAT64_HEADER: u8 = 0xfb;

/// CBOR map with 8-byte doubles
#[derive(Debug, Clone, Copy, Default)]
pub struct CborCodec {
    fidelity: Fidelity,
}

impl CborCodec {
    pub fn new(fidelity: Fidelity) -> Self {
        Self { fidelity }
    }
}

impl Codec for CborCodec {
    fn format(&self) -> WireFormat {
        WireFormat::Cbor
    }

    fn fidelity(&self) -> Fidelity {
        self.fidelity
    }

    fn encode(&self, record: &TelemetryRecord) -> CodecResult<Vec<u8>> {
        Ok(encode_record(record, self.fidelity))
    }

    fn decode(&self, bytes: &[u8]) -> CodecResult<TelemetryRecord> {
        let root: Value = ciborium::de::from_reader(bytes)
            .map_err(|e| DecodeError::malformed(WireFormat::Cbor, e))?;
        Ok(decode_value(&root, self.fidelity)?)
    }
}

/// Appends definite-length CBOR items to a buffer
#[derive(Debug, Default)]
struct CborWriter {
    buf: Vec<u8>,
}

impl CborWriter {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    fn header(&mut self, major: u8, len: u64) {
        let major = major << 5;
        match len {
            0..=23 => self.buf.push(major | len as u8),
            24..=0xff => {
                self.buf.push(major | 24);
                self.buf.push(len as u8);
            }
            0x100..=0xffff => {
                self.buf.push(major | 25);
                self.buf.extend_from_slice(&(len as u16).to_be_bytes());
            }
            0x1_0000..=0xffff_ffff => {
                self.buf.push(major | 26);
                self.buf.extend_from_slice(&(len as u32).to_be_bytes());
            }
            _ => {
                self.buf.push(major | 27);
                self.buf.extend_from_slice(&len.to_be_bytes());
            }
        }
    }

    fn map(&mut self, entries: usize) {
        self.header(MAJOR_MAP, entries as u64);
    }

    fn array(&mut self, items: usize) {
        self.header(MAJOR_ARRAY, items as u64);
    }

    fn text(&mut self, value: &str) {
        self.header(MAJOR_TEXT, value.len() as u64);
        self.buf.extend_from_slice(value.as_bytes());
    }

    fn bytes(&mut self, value: &[u8]) {
        self.header(MAJOR_BYTES, value.len() as u64);
        self.buf.extend_from_slice(value);
    }

    fn f64(&mut self, value: f64) {
        self.buf.push(FLOAT64_HEADER);
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    fn i64(&mut self, value: i64) {
        if value >= 0 {
            self.header(MAJOR_UNSIGNED, value as u64);
        } else {
            // -1 - n, computed without overflow for i64::MIN
            self.header(MAJOR_NEGATIVE, !(value as u64));
        }
    }

    fn text_entry(&mut self, key: &str, value: &str) {
        self.text(key);
        self.text(value);
    }

    fn f64_entry(&mut self, key: &str, value: f64) {
        self.text(key);
        self.f64(value);
    }

    fn finish(self) -> Vec<u8> {
        self.buf
    }
}

fn encode_record(record: &TelemetryRecord, fidelity: Fidelity) -> Vec<u8> {
    let full = fidelity.carries_optional_fields();
    let location = record.location().filter(|_| full);
    let status = record.status().filter(|_| full);
    let battery_level = record.battery_level().filter(|_| full);
    let signal_strength = record.signal_strength().filter(|_| full);
    let readings = record.sensor_readings().filter(|_| full);
    let metadata = record.metadata().filter(|_| full);
    let padding = record.additional_data().filter(|_| full);

    let entries = 5
        + usize::from(location.is_some())
        + usize::from(status.is_some())
        + usize::from(battery_level.is_some())
        + usize::from(signal_strength.is_some())
        + usize::from(readings.is_some())
        + usize::from(metadata.is_some())
        + usize::from(padding.is_some());

    let capacity = 128
        + readings.map_or(0, |r| r.len() * 9)
        + padding.map_or(0, |p| p.len() + 5);
    let mut w = CborWriter::with_capacity(capacity);

    w.map(entries);
    w.f64_entry(keys::TIMESTAMP, record.timestamp);
    w.text_entry(keys::SENSOR_ID, record.sensor_id());
    w.f64_entry(keys::TEMPERATURE, record.temperature);
    w.f64_entry(keys::HUMIDITY, record.humidity);
    w.f64_entry(keys::PRESSURE, record.pressure);

    if let Some(location) = location {
        w.text(keys::LOCATION);
        w.map(3);
        w.f64_entry(keys::LAT, location.lat);
        w.f64_entry(keys::LON, location.lon);
        w.f64_entry(keys::ALTITUDE, location.altitude);
    }
    if let Some(status) = status {
        w.text_entry(keys::STATUS, status);
    }
    if let Some(battery_level) = battery_level {
        w.f64_entry(keys::BATTERY_LEVEL, battery_level);
    }
    if let Some(signal_strength) = signal_strength {
        w.text(keys::SIGNAL_STRENGTH);
        w.i64(i64::from(signal_strength));
    }
    if let Some(readings) = readings {
        w.text(keys::SENSOR_READINGS);
        w.array(readings.len());
        for &reading in readings {
            w.f64(reading);
        }
    }
    if let Some(metadata) = metadata {
        w.text(keys::METADATA);
        w.map(4);
        w.text_entry(keys::FIRMWARE_VERSION, &metadata.firmware_version);
        w.text_entry(keys::HARDWARE_ID, &metadata.hardware_id);
        w.text_entry(keys::CALIBRATION_DATE, &metadata.calibration_date);
        w.text_entry(keys::LAST_MAINTENANCE, &metadata.last_maintenance);
    }
    if let Some(padding) = padding {
        w.text(keys::ADDITIONAL_DATA);
        w.bytes(padding);
    }

    w.finish()
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Integer(_) => "integer",
        Value::Bytes(_) => "byte string",
        Value::Float(_) => "float",
        Value::Text(_) => "text string",
        Value::Bool(_) => "bool",
        Value::Null => "null",
        Value::Tag(_, _) => "tag",
        Value::Array(_) => "array",
        Value::Map(_) => "map",
        _ => "unknown",
    }
}

/// Typed lookups over one CBOR map level
struct MapReader<'a> {
    entries: &'a [(Value, Value)],
    scope: Option<&'static str>,
}

impl<'a> MapReader<'a> {
    fn path(&self, field: &str) -> String {
        match self.scope {
            Some(scope) => format!("{scope}.{field}"),
            None => field.to_string(),
        }
    }

    fn get(&self, field: &str) -> Option<&'a Value> {
        self.entries
            .iter()
            .find(|(key, _)| matches!(key, Value::Text(k) if k == field))
            .map(|(_, value)| value)
            .filter(|value| !matches!(value, Value::Null))
    }

    fn require(&self, field: &str) -> Result<&'a Value, DecodeError> {
        self.get(field)
            .ok_or_else(|| DecodeError::missing_field(WireFormat::Cbor, self.path(field)))
    }

    fn mismatch(&self, field: &str, expected: &str, found: &Value) -> DecodeError {
        DecodeError::type_mismatch(WireFormat::Cbor, self.path(field), expected, value_kind(found))
    }

    fn float(&self, field: &str, value: &Value) -> Result<f64, DecodeError> {
        match value {
            Value::Float(v) => Ok(*v),
            other => Err(self.mismatch(field, "float", other)),
        }
    }

    fn text(&self, field: &str, value: &'a Value) -> Result<&'a str, DecodeError> {
        match value {
            Value::Text(v) => Ok(v.as_str()),
            other => Err(self.mismatch(field, "text string", other)),
        }
    }

    fn required_float(&self, field: &str) -> Result<f64, DecodeError> {
        let value = self.require(field)?;
        self.float(field, value)
    }

    fn required_text(&self, field: &str) -> Result<&'a str, DecodeError> {
        let value = self.require(field)?;
        self.text(field, value)
    }

    fn optional_float(&self, field: &str) -> Result<Option<f64>, DecodeError> {
        self.get(field).map(|v| self.float(field, v)).transpose()
    }

    fn optional_text(&self, field: &str) -> Result<Option<&'a str>, DecodeError> {
        self.get(field).map(|v| self.text(field, v)).transpose()
    }

    fn optional_i32(&self, field: &str) -> Result<Option<i32>, DecodeError> {
        match self.get(field) {
            None => Ok(None),
            Some(Value::Integer(v)) => {
                let wide = i128::from(*v);
                i32::try_from(wide).map(Some).map_err(|_| {
                    DecodeError::invalid_value(
                        WireFormat::Cbor,
                        self.path(field),
                        format!("{wide} out of i32 range"),
                    )
                })
            }
            Some(other) => Err(self.mismatch(field, "integer", other)),
        }
    }

    fn optional_map(&self, field: &'static str) -> Result<Option<MapReader<'a>>, DecodeError> {
        match self.get(field) {
            None => Ok(None),
            Some(Value::Map(entries)) => Ok(Some(MapReader {
                entries,
                scope: Some(field),
            })),
            Some(other) => Err(self.mismatch(field, "map", other)),
        }
    }

    fn optional_float_array(&self, field: &str) -> Result<Option<Vec<f64>>, DecodeError> {
        match self.get(field) {
            None => Ok(None),
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(i, item)| self.float(&format!("{field}[{i}]"), item))
                .collect::<Result<Vec<_>, _>>()
                .map(Some),
            Some(other) => Err(self.mismatch(field, "array", other)),
        }
    }

    /// Padding is written as a byte string; text strings are accepted too
    fn optional_blob(&self, field: &str) -> Result<Option<Vec<u8>>, DecodeError> {
        match self.get(field) {
            None => Ok(None),
            Some(Value::Bytes(v)) => Ok(Some(v.clone())),
            Some(Value::Text(v)) => Ok(Some(v.as_bytes().to_vec())),
            Some(other) => Err(self.mismatch(field, "byte string", other)),
        }
    }
}

fn decode_value(root: &Value, fidelity: Fidelity) -> Result<TelemetryRecord, DecodeError> {
    let entries = match root {
        Value::Map(entries) => entries,
        other => {
            return Err(DecodeError::type_mismatch(
                WireFormat::Cbor,
                DOCUMENT_FIELD,
                "map",
                value_kind(other),
            ))
        }
    };
    let reader = MapReader {
        entries,
        scope: None,
    };

    let mut record = TelemetryRecord::new(
        reader.required_float(keys::TIMESTAMP)?,
        reader.required_text(keys::SENSOR_ID)?,
        reader.required_float(keys::TEMPERATURE)?,
        reader.required_float(keys::HUMIDITY)?,
        reader.required_float(keys::PRESSURE)?,
    );

    if !fidelity.carries_optional_fields() {
        return Ok(record);
    }

    if let Some(location) = reader.optional_map(keys::LOCATION)? {
        record.location = Location::new(
            location.required_float(keys::LAT)?,
            location.required_float(keys::LON)?,
            location.required_float(keys::ALTITUDE)?,
        );
    }
    if let Some(status) = reader.optional_text(keys::STATUS)? {
        record.status = status.to_string();
    }
    if let Some(battery_level) = reader.optional_float(keys::BATTERY_LEVEL)? {
        record.battery_level = battery_level;
    }
    if let Some(signal_strength) = reader.optional_i32(keys::SIGNAL_STRENGTH)? {
        record.signal_strength = signal_strength;
    }
    if let Some(readings) = reader.optional_float_array(keys::SENSOR_READINGS)? {
        record.sensor_readings = readings;
    }
    if let Some(metadata) = reader.optional_map(keys::METADATA)? {
        let text = |field: &str| -> Result<String, DecodeError> {
            Ok(metadata.optional_text(field)?.unwrap_or_default().to_string())
        };
        record.metadata = Metadata {
            firmware_version: metadata.required_text(keys::FIRMWARE_VERSION)?.to_string(),
            hardware_id: text(keys::HARDWARE_ID)?,
            calibration_date: text(keys::CALIBRATION_DATE)?,
            last_maintenance: text(keys::LAST_MAINTENANCE)?,
        };
    }
    if let Some(padding) = reader.optional_blob(keys::ADDITIONAL_DATA)? {
        record.additional_data = padding;
    }

    Ok(record)
}
