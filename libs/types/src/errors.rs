//! Error types for record construction and payload generation

use thiserror::Error;

/// Errors raised while building telemetry records
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TypesError {
    /// Payload tier name is not one of `small`, `medium`, `large`
    #[error("Unsupported payload tier '{tier}': expected one of small, medium, large")]
    UnsupportedTier { tier: String },
}

impl TypesError {
    pub fn unsupported_tier(tier: impl Into<String>) -> Self {
        Self::UnsupportedTier { tier: tier.into() }
    }
}

pub type TypesResult<T> = Result<T, TypesError>;
