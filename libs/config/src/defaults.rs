//! Benchmark defaults
//!
//! Values used when neither a config file, the environment nor the command
//! line sets a field.

/// Broker connection defaults
pub mod broker {
    pub const HOST: &str = "localhost";
    pub const PORT: u16 = 1883;

    /// Keep-alive interval (seconds)
    pub const KEEP_ALIVE_SECS: u64 = 60;

    pub const CLEAN_SESSION: bool = true;

    /// Time allowed for the broker's CONNACK (seconds)
    pub const CONNECT_TIMEOUT_SECS: u64 = 10;

    /// Time allowed for a publish acknowledgement (milliseconds)
    pub const DELIVERY_TIMEOUT_MS: u64 = 10_000;

    /// Large-tier payloads are ~60 KB before encoding overhead
    pub const MAX_PACKET_SIZE: usize = 256 * 1024;

    /// Room left in `max_packet_size` beyond the largest encoded record and
    /// the topic, for the packet header and reading widths that vary per run
    pub const PACKET_HEADROOM: usize = 1024;

    /// Plain-variable overrides kept for compatibility with existing scripts
    pub const HOST_ENV: &str = "MQTT_BROKER";
    pub const PORT_ENV: &str = "MQTT_PORT";
}

/// Publisher defaults
pub mod publisher {
    pub const TOPIC: &str = "mqtt-demo/all";
    pub const SENSOR_ID: &str = "sensor_001";
    pub const COUNT: u32 = 10;

    /// Pause between messages (seconds)
    pub const INTERVAL_SECS: f64 = 1.0;

    pub const QOS: u8 = 1;
    pub const CLIENT_ID_PREFIX: &str = "mqtt-bench-pub";
}

/// Subscriber defaults
pub mod subscriber {
    pub const TOPIC: &str = "mqtt-demo/all";
    pub const QOS: u8 = 1;
    pub const CLIENT_ID_PREFIX: &str = "mqtt-bench-sub";
}

/// Logging defaults
pub mod logging {
    pub const LEVEL: &str = "info";
}

/// Prefix for structured environment overrides, e.g.
/// `MQTT_BENCH_PUBLISHER__COUNT=100`
pub const ENV_PREFIX: &str = "MQTT_BENCH";
