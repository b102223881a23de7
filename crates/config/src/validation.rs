//! Configuration validation
//!
//! Checks values serde cannot express:
//! - Interface name present
//! - Queue sizes, batch sizes and intervals non-zero
//! - CAN read timeout at least 1ms
//! - Filter ids fit a CAN identifier
//! - ClickHouse url present when a sink writes to ClickHouse

use std::time::Duration;

use crate::Config;
use crate::error::{ConfigError, Result};
use crate::sinks::SinkSettings;

/// Largest 29-bit identifier
const MAX_EXTENDED_ID: u32 = 0x1FFF_FFFF;

/// Shortest CAN read timeout; the kernel reads a zero timeval as "never"
const MIN_READ_TIMEOUT: Duration = Duration::from_millis(1);

/// Extended frame format flag, filter ids carrying it may use the flag bits
const EFF_FLAG: u32 = 0x8000_0000;

/// Validate the entire configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_can(config)?;
    validate_stats(config)?;
    validate_sink("sinks.frames", &config.sinks.frames())?;
    validate_sink("sinks.stats", &config.sinks.stats())?;
    non_zero_duration("sinks", "shutdown_timeout", config.sinks.shutdown_timeout)?;
    validate_clickhouse(config)?;
    validate_metrics(config)?;
    Ok(())
}

fn non_zero_size(section: &'static str, field: &'static str, value: usize) -> Result<()> {
    if value == 0 {
        return Err(ConfigError::invalid_value(section, field, "must be greater than 0"));
    }
    Ok(())
}

fn non_zero_duration(section: &'static str, field: &'static str, value: Duration) -> Result<()> {
    if value.is_zero() {
        return Err(ConfigError::invalid_value(section, field, "must be greater than 0"));
    }
    Ok(())
}

fn validate_can(config: &Config) -> Result<()> {
    let can = &config.can;

    if can.interface.trim().is_empty() {
        return Err(ConfigError::missing_field("can", "interface"));
    }

    non_zero_size("can", "frame_queue_size", can.frame_queue_size)?;
    non_zero_size("can", "error_queue_size", can.error_queue_size)?;
    if can.read_timeout < MIN_READ_TIMEOUT {
        return Err(ConfigError::invalid_value(
            "can",
            "read_timeout",
            "must be at least 1ms",
        ));
    }

    for filter in &can.filters {
        if filter.0 & EFF_FLAG == 0 && filter.0 > MAX_EXTENDED_ID {
            return Err(ConfigError::invalid_value(
                "can",
                "filters",
                format!("{} exceeds the 29-bit identifier range", filter),
            ));
        }
    }

    Ok(())
}

fn validate_stats(config: &Config) -> Result<()> {
    if !config.stats.enabled {
        return Ok(());
    }
    non_zero_duration("stats", "interval", config.stats.interval)?;
    non_zero_size("stats", "queue_size", config.stats.queue_size)
}

fn validate_sink(section: &'static str, sink: &SinkSettings) -> Result<()> {
    non_zero_size(section, "batch_size", sink.batch_size)?;
    non_zero_size(section, "queue_size", sink.queue_size)?;
    non_zero_duration(section, "flush_interval", sink.flush_interval)?;
    non_zero_duration(section, "write_timeout", sink.write_timeout)
}

fn validate_clickhouse(config: &Config) -> Result<()> {
    if !config.sinks.uses_clickhouse() {
        return Ok(());
    }
    let ch = &config.clickhouse;
    if ch.url.trim().is_empty() {
        return Err(ConfigError::missing_field("clickhouse", "url"));
    }
    if ch.frames_table.trim().is_empty() {
        return Err(ConfigError::missing_field("clickhouse", "frames_table"));
    }
    if ch.stats_table.trim().is_empty() {
        return Err(ConfigError::missing_field("clickhouse", "stats_table"));
    }
    Ok(())
}

fn validate_metrics(config: &Config) -> Result<()> {
    if !config.metrics.enabled {
        return Ok(());
    }
    non_zero_duration("metrics", "interval", config.metrics.interval)
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use crate::{Config, ConfigError};

    fn err(toml: &str) -> ConfigError {
        Config::from_str(toml).unwrap_err()
    }

    #[test]
    fn test_empty_interface_rejected() {
        let e = err("[can]\ninterface = \"\"");
        assert!(matches!(
            e,
            ConfigError::MissingField {
                section: "can",
                field: "interface"
            }
        ));
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let e = err("[sinks.frames]\nbatch_size = 0");
        assert!(e.to_string().contains("sinks.frames"));
        assert!(e.to_string().contains("batch_size"));
    }

    #[test]
    fn test_zero_flush_interval_rejected() {
        let e = err("[sinks.stats]\nflush_interval = \"0s\"");
        assert!(e.to_string().contains("flush_interval"));
    }

    #[test]
    fn test_zero_queue_rejected() {
        let e = err("[can]\nframe_queue_size = 0");
        assert!(e.to_string().contains("frame_queue_size"));
    }

    #[test]
    fn test_sub_millisecond_read_timeout_rejected() {
        let e = err("[can]\nread_timeout = \"500ns\"");
        assert!(e.to_string().contains("read_timeout"));

        let e = err("[can]\nread_timeout = \"0s\"");
        assert!(e.to_string().contains("at least 1ms"));

        assert!(Config::from_str("[can]\nread_timeout = \"1ms\"").is_ok());
    }

    #[test]
    fn test_zero_write_timeout_rejected() {
        let e = err("[sinks.frames]\nwrite_timeout = \"0s\"");
        assert!(e.to_string().contains("write_timeout"));

        let e = err("[sinks]\nshutdown_timeout = \"0s\"");
        assert!(e.to_string().contains("shutdown_timeout"));
    }

    #[test]
    fn test_disabled_stats_skips_interval_check() {
        assert!(Config::from_str("[stats]\nenabled = false\ninterval = \"0s\"").is_ok());
    }

    #[test]
    fn test_filter_id_range() {
        assert!(Config::from_str("[can]\nfilters = [0x1FFFFFFF]").is_ok());
        assert!(Config::from_str("[can]\nfilters = [\"80001234\"]").is_ok());

        let e = err("[can]\nfilters = [\"0x20000000\"]");
        assert!(e.to_string().contains("29-bit"));
    }

    #[test]
    fn test_clickhouse_url_required_only_for_clickhouse_sinks() {
        let e = err("[clickhouse]\nurl = \"\"");
        assert!(matches!(
            e,
            ConfigError::MissingField {
                section: "clickhouse",
                field: "url"
            }
        ));

        let toml = r#"
[clickhouse]
url = ""

[sinks.frames]
type = "null"

[sinks.stats]
type = "null"
"#;
        assert!(Config::from_str(toml).is_ok());
    }
}
