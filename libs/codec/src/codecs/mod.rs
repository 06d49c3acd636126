//! Per-format codec strategies
//!
//! Each wire format is an independent [`Codec`] implementation with its own
//! fidelity contract. Dispatch over the encoding name goes through
//! [`codec_for`], which returns a boxed strategy so callers can select the
//! format at runtime from configuration.

mod cbor;
mod json;
mod msgpack;
mod protobuf;

pub use cbor::CborCodec;
pub use json::JsonCodec;
pub use msgpack::MsgPackCodec;
pub use protobuf::{ProtobufCodec, SensorDataProto};

use types::TelemetryRecord;

use crate::error::CodecResult;
use crate::format::{Fidelity, WireFormat};

/// Paired encode/decode rules for one wire format
///
/// Implementations hold no mutable state and may be shared across the
/// transport's callback thread.
pub trait Codec: Send + Sync {
    fn format(&self) -> WireFormat;

    /// Which fields survive a round trip through this codec
    fn fidelity(&self) -> Fidelity;

    /// Serialize a record to its wire bytes
    ///
    /// Fails if the serializer backend fails, or if the format cannot carry
    /// the padding bytes unchanged (JSON with non-UTF-8 padding).
    fn encode(&self, record: &TelemetryRecord) -> CodecResult<Vec<u8>>;

    /// Rebuild a record from wire bytes
    ///
    /// Malformed, truncated or type-mismatched input yields
    /// [`CodecError::Decode`](crate::CodecError::Decode) naming the field.
    fn decode(&self, bytes: &[u8]) -> CodecResult<TelemetryRecord>;
}

/// Build the codec for `format`
///
/// `fidelity` only applies to MessagePack and CBOR. JSON always carries every
/// present field; Protobuf always carries only the core fields.
pub fn codec_for(format: WireFormat, fidelity: Fidelity) -> Box<dyn Codec> {
    match format {
        WireFormat::Json => Box::new(JsonCodec),
        WireFormat::MsgPack => Box::new(MsgPackCodec::new(fidelity)),
        WireFormat::Cbor => Box::new(CborCodec::new(fidelity)),
        WireFormat::Protobuf => Box::new(ProtobufCodec),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_honours_fixed_fidelity() {
        assert_eq!(codec_for(WireFormat::Json, Fidelity::Core).fidelity(), Fidelity::Full);
        assert_eq!(
            codec_for(WireFormat::Protobuf, Fidelity::Full).fidelity(),
            Fidelity::Core
        );
        assert_eq!(codec_for(WireFormat::Cbor, Fidelity::Core).fidelity(), Fidelity::Core);
        assert_eq!(
            codec_for(WireFormat::MsgPack, Fidelity::Full).fidelity(),
            Fidelity::Full
        );
    }

    #[test]
    fn test_factory_reports_format() {
        for format in WireFormat::ALL {
            assert_eq!(codec_for(format, Fidelity::default()).format(), format);
        }
    }
}
