//! # Telemetry Wire Codecs
//!
//! ## Purpose
//!
//! Encode and decode rules for [`types::TelemetryRecord`] in four wire
//! formats. Each format is an independent [`Codec`] strategy selected at
//! runtime through [`codec_for`].
//!
//! | Format     | Layout                          | Fidelity            |
//! |------------|---------------------------------|---------------------|
//! | `json`     | flat object, nested sub-objects | full                |
//! | `msgpack`  | map keyed by JSON field names   | full (or core)      |
//! | `cbor`     | map, 8-byte doubles             | full (or core)      |
//! | `protobuf` | `SensorData` message, tags 1-5  | core only           |
//!
//! All formats encode the five core fields first and honour the same
//! presence predicates for optional fields. A decode failure is always a
//! [`DecodeError`] naming the format and the field.
//!
//! ## Architecture Role
//!
//! ```text
//! libs/types → [codec] → network/
//!     ↑           ↓          ↓
//! Record      Wire bytes   Pub/sub
//! ```
//!
//! ## What This Crate Does NOT Contain
//! - Framing or compression: the codec output is the whole transport payload
//! - Transport logic (belongs in `network`)
//!
//! ```rust
//! use codec::{codec_for, Fidelity, WireFormat};
//! use types::TelemetryRecord;
//!
//! let record = TelemetryRecord::new(1_700_000_000.25, "sensor_001", 22.5, 55.0, 1013.0);
//! let codec = codec_for(WireFormat::Cbor, Fidelity::Full);
//! let bytes = codec.encode(&record).unwrap();
//! assert_eq!(codec.decode(&bytes).unwrap(), record);
//! ```

pub mod codecs;
pub mod error;
pub mod format;
pub mod wire;

pub use codecs::{
    codec_for, CborCodec, Codec, JsonCodec, MsgPackCodec, ProtobufCodec, SensorDataProto,
};
pub use error::{CodecError, CodecResult, DecodeError, DOCUMENT_FIELD};
pub use format::{Fidelity, WireFormat};
