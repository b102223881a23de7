//! canbridge Configuration
//!
//! TOML-based configuration loading with sensible defaults.
//! An empty file is a valid config: read `vcan0`, sample stats every 10s,
//! write both tables to a local ClickHouse.
//!
//! # Parsing
//!
//! ```
//! use canbridge_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str("[can]\ninterface = \"can0\"").unwrap();
//! assert_eq!(config.can.interface, "can0");
//! ```
//!
//! # Example Full Config
//!
//! ```toml
//! [log]
//! level = "info"
//!
//! [can]
//! interface = "can0"
//! filters = ["0x181", "0x201"]
//!
//! [stats]
//! interval = "10s"
//!
//! [clickhouse]
//! url = "http://localhost:8123"
//! database = "default"
//!
//! [sinks.frames]
//! batch_size = 1000
//! flush_interval = "1s"
//!
//! [sinks.stats]
//! flush_interval = "5s"
//!
//! [metrics]
//! interval = "60s"
//! ```

mod can;
mod clickhouse;
mod error;
mod logging;
mod metrics;
mod sinks;
mod stats;
mod validation;

use std::fs;
use std::path::Path;
use std::str::FromStr;

pub use can::{
    CanConfig, DEFAULT_ERROR_QUEUE_SIZE, DEFAULT_FRAME_QUEUE_SIZE, DEFAULT_INTERFACE,
    DEFAULT_READ_TIMEOUT, FilterId,
};
pub use clickhouse::ClickHouseConfig;
pub use error::{ConfigError, Result};
pub use logging::{LogConfig, LogFormat, LogLevel, LogOutput};
pub use metrics::{MetricsConfig, MetricsFormat};
pub use sinks::{
    DEFAULT_FRAME_BATCH_SIZE, DEFAULT_FRAME_FLUSH_INTERVAL, DEFAULT_SHUTDOWN_TIMEOUT,
    DEFAULT_STATS_BATCH_SIZE, DEFAULT_STATS_FLUSH_INTERVAL, DEFAULT_WRITE_TIMEOUT, SinkConfig,
    SinkSettings, SinkType, SinksConfig,
};
pub use stats::{DEFAULT_STATS_INTERVAL, DEFAULT_STATS_QUEUE_SIZE, StatsConfig};

use serde::Deserialize;

/// Main configuration structure
///
/// All sections are optional with sensible defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub log: LogConfig,

    /// CAN interface and reader queues
    pub can: CanConfig,

    /// Interface statistics sampler
    pub stats: StatsConfig,

    /// ClickHouse connection and table names
    pub clickhouse: ClickHouseConfig,

    /// Frame and stats sinks
    pub sinks: SinksConfig,

    /// Metrics reporting configuration
    pub metrics: MetricsConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read, contains invalid TOML, or fails
    /// validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
