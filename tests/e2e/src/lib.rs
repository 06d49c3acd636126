//! End-to-end scenarios for the telemetry benchmark
//!
//! A scenario wires a publish loop and a receive monitor to the same broker,
//! either the in-process loopback or a live MQTT broker, and checks that
//! every acknowledged message arrives and decodes.

pub mod framework;
pub mod validation;

pub use framework::{PipelineScenario, ScenarioResult, ScenarioRow};
pub use validation::{all_passed, validate, ValidationResult, ValidationSeverity};
