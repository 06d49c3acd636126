//! # Benchmark Configuration
//!
//! Defaults, file and environment layering for the publisher and subscriber.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use bench_config::BenchConfig;
//!
//! let config = BenchConfig::load(None)?;
//! println!("broker at {}", config.broker.address());
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod bench_config;
pub mod defaults;
pub mod logging;

pub use bench_config::{BenchConfig, BrokerConfig, LoggingConfig, PublisherConfig, SubscriberConfig};
pub use logging::init_logging;
