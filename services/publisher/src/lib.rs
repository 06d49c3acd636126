//! # Telemetry Publisher
//!
//! ## Purpose
//!
//! Drives one benchmark run on the sending side: for each message it
//! generates a record for the configured tier, encodes it, publishes it and
//! waits for the broker's acknowledgement. The time from the start of
//! encoding to the acknowledgement is one publish-latency sample.
//!
//! ## Failure Handling
//!
//! A message that fails to encode, publish or acknowledge within the
//! delivery timeout is logged and counted; it contributes no sample and is
//! never retried. The run always continues with the next message.
//!
//! ## What This Crate Does NOT Contain
//! - Receive-side measurement (belongs in `subscriber`)
//! - Broker session management (belongs in `network`)

pub mod cli;
pub mod error;
pub mod publish_loop;

pub use cli::PublisherArgs;
pub use error::PublishError;
pub use publish_loop::{PublishLoop, PublishReport, PublishSettings};
