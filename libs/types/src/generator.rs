//! Payload generation keyed by tier
//!
//! The random source is injected so tests can seed it; production code uses
//! [`PayloadGenerator::from_entropy`]. The structure of a generated record is
//! fully determined by the tier, only the numeric readings are random.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::trace;

use crate::errors::TypesResult;
use crate::record::{unix_time_secs, Location, Metadata, TelemetryRecord, FILLER_BYTE};
use crate::tier::PayloadTier;

/// Fixed position used by the medium and large tiers
pub const TIER_LOCATION: Location = Location {
    lat: 40.7128,
    lon: -74.0060,
    altitude: 10.5,
};
pub const TIER_STATUS: &str = "active";
pub const TIER_BATTERY_LEVEL: f64 = 85.5;
pub const TIER_SIGNAL_STRENGTH: i32 = -65;

/// Metadata block attached to large-tier records
pub fn tier_metadata() -> Metadata {
    Metadata {
        firmware_version: "1.2.3".to_string(),
        hardware_id: "HW-001".to_string(),
        calibration_date: "2024-01-01".to_string(),
        last_maintenance: "2024-06-01".to_string(),
    }
}

/// Builds telemetry records for a payload tier
pub struct PayloadGenerator<R = StdRng> {
    rng: R,
    clock: fn() -> f64,
}

impl PayloadGenerator<StdRng> {
    /// Non-deterministic generator seeded from the OS
    pub fn from_entropy() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Deterministic generator for reproducible runs
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> PayloadGenerator<R> {
    pub fn with_rng(rng: R) -> Self {
        Self {
            rng,
            clock: unix_time_secs,
        }
    }

    /// Override the timestamp source
    pub fn with_clock(mut self, clock: fn() -> f64) -> Self {
        self.clock = clock;
        self
    }

    /// Build a record for `tier`
    pub fn generate(&mut self, sensor_id: &str, tier: PayloadTier) -> TelemetryRecord {
        let timestamp = (self.clock)();
        let temperature = 20.0 + self.rng.gen_range(-5.0..15.0);
        let humidity = 30.0 + self.rng.gen_range(0.0..40.0);
        let pressure = 950.0 + self.rng.gen_range(0.0..100.0);

        let mut record = TelemetryRecord::new(timestamp, sensor_id, temperature, humidity, pressure);

        if tier != PayloadTier::Small {
            record.location = TIER_LOCATION;
            record.status = TIER_STATUS.to_string();
            record.battery_level = TIER_BATTERY_LEVEL;
            record.signal_strength = TIER_SIGNAL_STRENGTH;
        }

        if tier == PayloadTier::Large {
            let rng = &mut self.rng;
            record.sensor_readings = (0..tier.readings_len())
                .map(|_| rng.gen_range(0.0..100.0))
                .collect();
            record.metadata = tier_metadata();
        }

        record.additional_data = vec![FILLER_BYTE; tier.padding_len()];

        trace!(
            sensor_id = record.sensor_id(),
            tier = tier.as_str(),
            "generated telemetry record"
        );
        record
    }

    /// Build a record for a tier given by name
    pub fn generate_named(&mut self, sensor_id: &str, tier: &str) -> TypesResult<TelemetryRecord> {
        let tier = tier.parse::<PayloadTier>()?;
        Ok(self.generate(sensor_id, tier))
    }
}
