//! # Telemetry Types
//!
//! Pure data structures shared by every crate in the workspace.
//!
//! - [`TelemetryRecord`]: the unit of exchange, five core fields plus
//!   optional tiered extras gated by presence predicates
//! - [`PayloadTier`]: `small` / `medium` / `large` size profiles
//! - [`PayloadGenerator`]: builds records for a tier from an injected RNG
//!
//! ## What This Crate Does NOT Contain
//! - Wire encodings (belongs in `codec`)
//! - Transport or latency measurement (belongs in `network`)
//!
//! ```rust
//! use types::{PayloadGenerator, PayloadTier};
//!
//! let mut generator = PayloadGenerator::seeded(7);
//! let record = generator.generate("sensor_001", PayloadTier::Medium);
//! assert_eq!(record.additional_data.len(), 1500);
//! ```

pub mod errors;
pub mod generator;
pub mod record;
pub mod tier;

pub use errors::{TypesError, TypesResult};
pub use generator::{tier_metadata, PayloadGenerator, TIER_LOCATION};
pub use record::{
    truncate_sensor_id, unix_time_secs, CoreFields, Location, Metadata, TelemetryRecord,
    FILLER_BYTE, SENSOR_ID_MAX_BYTES,
};
pub use tier::PayloadTier;
