//! Sink configuration types
//!
//! The pipeline has exactly two sinks: one for frames and one for interface
//! statistics. Both run the same batching loop with different defaults, so
//! every tunable is optional here and resolved per sink by
//! [`SinksConfig::frames`] and [`SinksConfig::stats`].

use serde::Deserialize;
use std::time::Duration;

/// Frame sink: rows per insert
pub const DEFAULT_FRAME_BATCH_SIZE: usize = 1000;

/// Frame sink: time trigger
pub const DEFAULT_FRAME_FLUSH_INTERVAL: Duration = Duration::from_secs(1);

/// Frame sink: input queue capacity
pub const DEFAULT_FRAME_QUEUE_SIZE: usize = 2000;

/// Stats sink: rows per insert
pub const DEFAULT_STATS_BATCH_SIZE: usize = 100;

/// Stats sink: time trigger
pub const DEFAULT_STATS_FLUSH_INTERVAL: Duration = Duration::from_secs(5);

/// Stats sink: input queue capacity
pub const DEFAULT_STATS_QUEUE_SIZE: usize = 200;

/// Upper bound on one batch write
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound on a sink's final drain and flush at shutdown
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Destination of a sink
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SinkType {
    /// Insert into ClickHouse (default)
    #[default]
    Clickhouse,
    /// Discard everything (benchmarking, dry runs)
    Null,
}

impl SinkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Clickhouse => "clickhouse",
            Self::Null => "null",
        }
    }
}

/// One sink section as written in TOML
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    #[serde(rename = "type")]
    pub sink_type: SinkType,

    pub batch_size: Option<usize>,

    #[serde(with = "humantime_serde")]
    pub flush_interval: Option<Duration>,

    pub queue_size: Option<usize>,

    #[serde(with = "humantime_serde")]
    pub write_timeout: Option<Duration>,
}

/// A sink section with defaults applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkSettings {
    pub sink_type: SinkType,
    pub batch_size: usize,
    pub flush_interval: Duration,
    pub queue_size: usize,
    pub write_timeout: Duration,
}

impl SinkConfig {
    fn resolve(
        &self,
        batch_size: usize,
        flush_interval: Duration,
        queue_size: usize,
    ) -> SinkSettings {
        SinkSettings {
            sink_type: self.sink_type,
            batch_size: self.batch_size.unwrap_or(batch_size),
            flush_interval: self.flush_interval.unwrap_or(flush_interval),
            queue_size: self.queue_size.unwrap_or(queue_size),
            write_timeout: self.write_timeout.unwrap_or(DEFAULT_WRITE_TIMEOUT),
        }
    }
}

/// Both sink sections
///
/// ```toml
/// [sinks]
/// shutdown_timeout = "30s"
///
/// [sinks.frames]
/// type = "clickhouse"
/// batch_size = 1000
/// flush_interval = "1s"
/// write_timeout = "10s"
///
/// [sinks.stats]
/// type = "null"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SinksConfig {
    /// Time each sink gets to drain and flush once stopped
    #[serde(with = "humantime_serde")]
    pub shutdown_timeout: Duration,

    frames: SinkConfig,
    stats: SinkConfig,
}

impl Default for SinksConfig {
    fn default() -> Self {
        Self {
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            frames: SinkConfig::default(),
            stats: SinkConfig::default(),
        }
    }
}

impl SinksConfig {
    /// Frame sink settings (1s / 1000 rows / queue 2000 unless overridden)
    pub fn frames(&self) -> SinkSettings {
        self.frames.resolve(
            DEFAULT_FRAME_BATCH_SIZE,
            DEFAULT_FRAME_FLUSH_INTERVAL,
            DEFAULT_FRAME_QUEUE_SIZE,
        )
    }

    /// Stats sink settings (5s / 100 rows / queue 200 unless overridden)
    pub fn stats(&self) -> SinkSettings {
        self.stats.resolve(
            DEFAULT_STATS_BATCH_SIZE,
            DEFAULT_STATS_FLUSH_INTERVAL,
            DEFAULT_STATS_QUEUE_SIZE,
        )
    }

    /// Whether any sink writes to ClickHouse
    pub fn uses_clickhouse(&self) -> bool {
        self.frames.sink_type == SinkType::Clickhouse
            || self.stats.sink_type == SinkType::Clickhouse
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_differ_per_sink() {
        let config: SinksConfig = toml::from_str("").unwrap();

        let frames = config.frames();
        assert_eq!(frames.sink_type, SinkType::Clickhouse);
        assert_eq!(frames.batch_size, 1000);
        assert_eq!(frames.flush_interval, Duration::from_secs(1));
        assert_eq!(frames.queue_size, 2000);

        let stats = config.stats();
        assert_eq!(stats.batch_size, 100);
        assert_eq!(stats.flush_interval, Duration::from_secs(5));
        assert_eq!(stats.queue_size, 200);

        assert_eq!(frames.write_timeout, Duration::from_secs(30));
        assert_eq!(stats.write_timeout, Duration::from_secs(30));
        assert_eq!(config.shutdown_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_timeouts_override() {
        let toml = r#"
shutdown_timeout = "5s"

[frames]
write_timeout = "2s"
"#;
        let config: SinksConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.shutdown_timeout, Duration::from_secs(5));
        assert_eq!(config.frames().write_timeout, Duration::from_secs(2));
        assert_eq!(config.stats().write_timeout, DEFAULT_WRITE_TIMEOUT);
    }

    #[test]
    fn test_partial_override_keeps_sink_defaults() {
        let toml = r#"
[stats]
batch_size = 10
"#;
        let config: SinksConfig = toml::from_str(toml).unwrap();

        let stats = config.stats();
        assert_eq!(stats.batch_size, 10);
        assert_eq!(stats.flush_interval, Duration::from_secs(5));
    }

    #[test]
    fn test_null_sink() {
        let toml = r#"
[frames]
type = "null"
flush_interval = "250ms"

[stats]
type = "null"
"#;
        let config: SinksConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.frames().sink_type, SinkType::Null);
        assert_eq!(config.frames().flush_interval, Duration::from_millis(250));
        assert!(!config.uses_clickhouse());
    }

    #[test]
    fn test_unknown_type_rejected() {
        assert!(toml::from_str::<SinksConfig>("[frames]\ntype = \"kafka\"").is_err());
    }
}
