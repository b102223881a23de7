//! Bus statistics sampler configuration

use serde::Deserialize;
use std::time::Duration;

/// Default sampling interval
pub const DEFAULT_STATS_INTERVAL: Duration = Duration::from_secs(10);

/// Default sampler output queue capacity
pub const DEFAULT_STATS_QUEUE_SIZE: usize = 10;

/// Statistics sampler configuration
///
/// ```toml
/// [stats]
/// enabled = true
/// interval = "10s"
/// queue_size = 10
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    /// Default: true
    pub enabled: bool,

    /// Default: 10s
    #[serde(with = "humantime_serde")]
    pub interval: Duration,

    /// Default: 10
    pub queue_size: usize,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: DEFAULT_STATS_INTERVAL,
            queue_size: DEFAULT_STATS_QUEUE_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_empty() {
        let config: StatsConfig = toml::from_str("").unwrap();
        assert!(config.enabled);
        assert_eq!(config.interval, Duration::from_secs(10));
        assert_eq!(config.queue_size, 10);
    }

    #[test]
    fn test_deserialize_custom() {
        let config: StatsConfig = toml::from_str("enabled = false\ninterval = \"30s\"").unwrap();
        assert!(!config.enabled);
        assert_eq!(config.interval, Duration::from_secs(30));
    }
}
