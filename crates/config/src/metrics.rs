//! Metrics reporting configuration
//!
//! Controls the periodic pipeline counters written to the log.

use serde::Deserialize;
use std::time::Duration;

/// Metrics output format
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MetricsFormat {
    /// Human-readable output (default)
    #[default]
    Human,
    /// JSON structured output
    Json,
}

/// Metrics configuration
///
/// ```toml
/// [metrics]
/// enabled = true
/// interval = "60s"
/// format = "human"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Default: true
    pub enabled: bool,

    /// Reporting interval
    /// Default: 60s
    #[serde(with = "humantime_serde")]
    pub interval: Duration,

    /// Default: human
    pub format: MetricsFormat,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: Duration::from_secs(60),
            format: MetricsFormat::Human,
        }
    }
}
