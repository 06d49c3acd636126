//! Per-message publish failures

use codec::CodecError;
use network::TransportError;
use thiserror::Error;

/// Why a single message produced no latency sample
#[derive(Error, Debug)]
pub enum PublishError {
    #[error(transparent)]
    Encode(#[from] CodecError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl PublishError {
    /// Short label used in logs and failure counters
    pub fn category(&self) -> &'static str {
        match self {
            Self::Encode(_) => "encode",
            Self::Transport(err) => err.category(),
        }
    }
}
