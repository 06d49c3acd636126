//! Telemetry record model
//!
//! A [`TelemetryRecord`] always carries the five core fields. Every optional
//! field is stored as a plain value and considered *present* only when its
//! presence predicate holds:
//!
//! | Field             | Present when                      |
//! |-------------------|-----------------------------------|
//! | `location`        | `lat != 0.0 \|\| lon != 0.0`      |
//! | `status`          | non-empty                         |
//! | `battery_level`   | `> 0.0`                           |
//! | `signal_strength` | `!= 0`                            |
//! | `sensor_readings` | non-empty                         |
//! | `metadata`        | `firmware_version` non-empty      |
//! | `additional_data` | non-empty                         |
//!
//! A location at exactly (0, 0) and a battery reading of exactly 0.0 are
//! therefore indistinguishable from "absent". Codecs must consult the
//! accessor methods ([`TelemetryRecord::location`], ...) rather than the raw
//! fields so that all wire formats agree on what gets encoded.

use std::time::{SystemTime, UNIX_EPOCH};

#[cfg(feature = "serialization")]
use serde::{Deserialize, Serialize};

/// Maximum byte length of a sensor identifier
pub const SENSOR_ID_MAX_BYTES: usize = 63;

/// Byte used to fill the padding blob
pub const FILLER_BYTE: u8 = b'x';

/// Geographic position of the sensor
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
    pub altitude: f64,
}

impl Location {
    pub fn new(lat: f64, lon: f64, altitude: f64) -> Self {
        Self { lat, lon, altitude }
    }

    /// (0, 0) is treated as "no location"; altitude does not participate
    #[inline]
    pub fn is_present(&self) -> bool {
        self.lat != 0.0 || self.lon != 0.0
    }
}

/// Device maintenance metadata
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub struct Metadata {
    pub firmware_version: String,
    pub hardware_id: String,
    pub calibration_date: String,
    pub last_maintenance: String,
}

impl Metadata {
    /// Only `firmware_version` gates presence
    #[inline]
    pub fn is_present(&self) -> bool {
        !self.firmware_version.is_empty()
    }
}

/// The unit of exchange between publisher and subscriber
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TelemetryRecord {
    /// Seconds since the Unix epoch, fractional
    pub timestamp: f64,
    sensor_id: String,
    pub temperature: f64,
    pub humidity: f64,
    pub pressure: f64,

    pub location: Location,
    pub status: String,
    pub battery_level: f64,
    pub signal_strength: i32,
    pub sensor_readings: Vec<f64>,
    pub metadata: Metadata,
    pub additional_data: Vec<u8>,
}

/// The five always-encoded fields, compared as a unit in tests and reports
#[derive(Debug, Clone, PartialEq)]
pub struct CoreFields<'a> {
    pub timestamp: f64,
    pub sensor_id: &'a str,
    pub temperature: f64,
    pub humidity: f64,
    pub pressure: f64,
}

impl TelemetryRecord {
    /// Build a record holding only the core fields
    pub fn new(
        timestamp: f64,
        sensor_id: &str,
        temperature: f64,
        humidity: f64,
        pressure: f64,
    ) -> Self {
        Self {
            timestamp,
            sensor_id: truncate_sensor_id(sensor_id),
            temperature,
            humidity,
            pressure,
            ..Self::default()
        }
    }

    pub fn sensor_id(&self) -> &str {
        &self.sensor_id
    }

    pub fn core(&self) -> CoreFields<'_> {
        CoreFields {
            timestamp: self.timestamp,
            sensor_id: &self.sensor_id,
            temperature: self.temperature,
            humidity: self.humidity,
            pressure: self.pressure,
        }
    }

    pub fn location(&self) -> Option<&Location> {
        self.location.is_present().then_some(&self.location)
    }

    pub fn status(&self) -> Option<&str> {
        (!self.status.is_empty()).then_some(self.status.as_str())
    }

    pub fn battery_level(&self) -> Option<f64> {
        (self.battery_level > 0.0).then_some(self.battery_level)
    }

    pub fn signal_strength(&self) -> Option<i32> {
        (self.signal_strength != 0).then_some(self.signal_strength)
    }

    pub fn sensor_readings(&self) -> Option<&[f64]> {
        (!self.sensor_readings.is_empty()).then_some(self.sensor_readings.as_slice())
    }

    pub fn metadata(&self) -> Option<&Metadata> {
        self.metadata.is_present().then_some(&self.metadata)
    }

    pub fn additional_data(&self) -> Option<&[u8]> {
        (!self.additional_data.is_empty()).then_some(self.additional_data.as_slice())
    }

    /// True when no optional field passes its presence predicate
    pub fn is_core_only(&self) -> bool {
        self.location().is_none()
            && self.status().is_none()
            && self.battery_level().is_none()
            && self.signal_strength().is_none()
            && self.sensor_readings().is_none()
            && self.metadata().is_none()
            && self.additional_data().is_none()
    }

    /// Copy of this record with every optional field reset to its absent value
    pub fn to_core_only(&self) -> Self {
        Self::new(
            self.timestamp,
            &self.sensor_id,
            self.temperature,
            self.humidity,
            self.pressure,
        )
    }
}

/// Truncate at the last UTF-8 boundary at or below [`SENSOR_ID_MAX_BYTES`]
pub fn truncate_sensor_id(sensor_id: &str) -> String {
    if sensor_id.len() <= SENSOR_ID_MAX_BYTES {
        return sensor_id.to_string();
    }

    let mut end = SENSOR_ID_MAX_BYTES;
    while !sensor_id.is_char_boundary(end) {
        end -= 1;
    }
    sensor_id[..end].to_string()
}

/// Current wall-clock time as fractional seconds since the Unix epoch
///
/// A clock set before 1970 yields a negative value rather than a panic.
pub fn unix_time_secs() -> f64 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(elapsed) => elapsed.as_secs_f64(),
        Err(err) => -err.duration().as_secs_f64(),
    }
}
