//! Logging configuration
//!
//! Controls the process's own log output, not CAN traffic.

use serde::Deserialize;

/// Log level
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Convert to tracing level filter string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable console output (default)
    #[default]
    Console,
    /// JSON structured logging
    Json,
}

/// Log output destination
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    /// Append to a file
    #[serde(untagged)]
    File(String),
}

/// Logging configuration
///
/// ```toml
/// [log]
/// level = "info"
/// format = "console"
/// output = "stderr"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default: info
    pub level: LogLevel,

    /// Default: console
    pub format: LogFormat,

    /// Default: stdout
    pub output: LogOutput,
}
