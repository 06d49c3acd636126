//! Payload size tiers

use std::fmt;
use std::str::FromStr;

use crate::errors::TypesError;

#[cfg(feature = "serialization")]
use serde::{Deserialize, Serialize};

/// Named payload-size profile controlling which optional fields are populated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serialization", serde(rename_all = "lowercase"))]
pub enum PayloadTier {
    /// Core fields only
    #[default]
    Small,
    /// Core fields, location, status, battery, signal and 1500 bytes of padding
    Medium,
    /// Medium plus 100 readings, metadata and 60000 bytes of padding
    Large,
}

impl PayloadTier {
    pub const ALL: [PayloadTier; 3] = [PayloadTier::Small, PayloadTier::Medium, PayloadTier::Large];

    pub fn as_str(&self) -> &'static str {
        match self {
            PayloadTier::Small => "small",
            PayloadTier::Medium => "medium",
            PayloadTier::Large => "large",
        }
    }

    /// Size of the padding blob for this tier
    pub fn padding_len(&self) -> usize {
        match self {
            PayloadTier::Small => 0,
            PayloadTier::Medium => 1_500,
            PayloadTier::Large => 60_000,
        }
    }

    /// Number of random sensor readings for this tier
    pub fn readings_len(&self) -> usize {
        match self {
            PayloadTier::Large => 100,
            _ => 0,
        }
    }
}

impl FromStr for PayloadTier {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "small" => Ok(PayloadTier::Small),
            "medium" => Ok(PayloadTier::Medium),
            "large" => Ok(PayloadTier::Large),
            other => Err(TypesError::unsupported_tier(other)),
        }
    }
}

impl fmt::Display for PayloadTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
