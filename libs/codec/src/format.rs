//! Wire format registry and per-codec fidelity

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CodecError;

/// Supported wire encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WireFormat {
    /// Text JSON object
    #[default]
    Json,
    /// MessagePack map
    #[serde(rename = "msgpack")]
    MsgPack,
    /// CBOR map with 8-byte doubles
    Cbor,
    /// Protobuf message with the five core fields
    Protobuf,
}

impl WireFormat {
    pub const ALL: [WireFormat; 4] = [
        WireFormat::Json,
        WireFormat::MsgPack,
        WireFormat::Cbor,
        WireFormat::Protobuf,
    ];

    /// Name used on the command line and in config files
    pub fn as_str(&self) -> &'static str {
        match self {
            WireFormat::Json => "json",
            WireFormat::MsgPack => "msgpack",
            WireFormat::Cbor => "cbor",
            WireFormat::Protobuf => "protobuf",
        }
    }
}

impl FromStr for WireFormat {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(WireFormat::Json),
            "msgpack" => Ok(WireFormat::MsgPack),
            "cbor" => Ok(WireFormat::Cbor),
            "protobuf" => Ok(WireFormat::Protobuf),
            other => Err(CodecError::unsupported_format(other)),
        }
    }
}

impl fmt::Display for WireFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which fields a codec carries across the wire
///
/// `Core` carries only timestamp, sensor id, temperature, humidity and
/// pressure. `Full` also carries every optional field that passes its
/// presence predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Fidelity {
    Core,
    #[default]
    Full,
}

impl Fidelity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Fidelity::Core => "core",
            Fidelity::Full => "full",
        }
    }

    #[inline]
    pub fn carries_optional_fields(&self) -> bool {
        matches!(self, Fidelity::Full)
    }
}

impl FromStr for Fidelity {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "core" => Ok(Fidelity::Core),
            "full" => Ok(Fidelity::Full),
            other => Err(CodecError::UnsupportedFidelity {
                name: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Fidelity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_names_round_trip() {
        for format in WireFormat::ALL {
            assert_eq!(format.as_str().parse::<WireFormat>().unwrap(), format);
        }
    }

    #[test]
    fn test_unknown_format_rejected() {
        let err = "xml".parse::<WireFormat>().unwrap_err();
        assert!(matches!(err, CodecError::UnsupportedFormat { ref name } if name == "xml"));
    }

    #[test]
    fn test_fidelity_parse() {
        assert_eq!("core".parse::<Fidelity>().unwrap(), Fidelity::Core);
        assert_eq!("full".parse::<Fidelity>().unwrap(), Fidelity::Full);
        assert!("partial".parse::<Fidelity>().is_err());
    }
}
