//! # Telemetry Subscriber
//!
//! ## Purpose
//!
//! Receive side of a benchmark run. Every arriving payload is decoded with
//! the configured codec and its end-to-end latency is taken as the arrival
//! time minus the timestamp embedded in the record. Both clocks are wall
//! clocks, so latencies across unsynchronized hosts can be negative; they
//! are recorded as-is.
//!
//! A payload that fails to decode is logged and counted and never stops the
//! subscription.
//!
//! ## What This Crate Does NOT Contain
//! - Publishing or payload generation (belongs in `publisher`)

pub mod cli;
pub mod monitor;

pub use cli::SubscriberArgs;
pub use monitor::{ReceiveMonitor, ReceiveReport};
