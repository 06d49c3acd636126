//! Codec errors
//!
//! Every decode failure names the wire format and the field that could not
//! be read, so a subscriber log line is enough to tell a truncated buffer
//! from a publisher/subscriber encoding mismatch.

use thiserror::Error;

use crate::format::WireFormat;

/// Field name reported when the failure is not tied to a single field
pub const DOCUMENT_FIELD: &str = "<document>";

/// Malformed, truncated or type-mismatched wire bytes
#[derive(Debug, Error, Clone, PartialEq)]
#[error("{format} decode failed at field '{field}': {reason}")]
pub struct DecodeError {
    pub format: WireFormat,
    pub field: String,
    pub reason: String,
}

impl DecodeError {
    /// Buffer could not be parsed as the format at all
    pub fn malformed(format: WireFormat, reason: impl ToString) -> Self {
        Self {
            format,
            field: DOCUMENT_FIELD.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Required field is not present
    pub fn missing_field(format: WireFormat, field: impl Into<String>) -> Self {
        Self {
            format,
            field: field.into(),
            reason: "required field is missing".to_string(),
        }
    }

    /// Field is present with the wrong wire type
    pub fn type_mismatch(
        format: WireFormat,
        field: impl Into<String>,
        expected: &str,
        found: &str,
    ) -> Self {
        Self {
            format,
            field: field.into(),
            reason: format!("expected {expected}, found {found}"),
        }
    }

    /// Field has the right type but an unusable value
    pub fn invalid_value(format: WireFormat, field: impl Into<String>, reason: impl ToString) -> Self {
        Self {
            format,
            field: field.into(),
            reason: reason.to_string(),
        }
    }
}

/// Errors produced by the codec layer
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CodecError {
    /// Incoming bytes could not be turned into a record
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Serializer backend rejected a record
    #[error("{format} encode failed: {reason}")]
    Encode { format: WireFormat, reason: String },

    /// Encoding name is not one of json, msgpack, cbor, protobuf
    #[error("Unsupported encoding '{name}': expected one of json, msgpack, cbor, protobuf")]
    UnsupportedFormat { name: String },

    /// Fidelity name is not one of core, full
    #[error("Unsupported fidelity '{name}': expected core or full")]
    UnsupportedFidelity { name: String },
}

impl CodecError {
    pub fn encode(format: WireFormat, reason: impl ToString) -> Self {
        Self::Encode {
            format,
            reason: reason.to_string(),
        }
    }

    pub fn unsupported_format(name: impl Into<String>) -> Self {
        Self::UnsupportedFormat { name: name.into() }
    }

    /// The decode error, if this is one
    pub fn as_decode(&self) -> Option<&DecodeError> {
        match self {
            CodecError::Decode(err) => Some(err),
            _ => None,
        }
    }
}

pub type CodecResult<T> = Result<T, CodecError>;
