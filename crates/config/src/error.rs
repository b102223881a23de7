//! Configuration error types

use std::io;
use thiserror::Error;

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur when loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file
    #[error("failed to read config file '{path}': {source}")]
    IoError {
        /// Path to the file
        path: String,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Validation error - required field missing
    #[error("{section} is missing required field '{field}'")]
    MissingField {
        /// Config section (e.g., "can", "sinks.frames")
        section: &'static str,
        /// Missing field name
        field: &'static str,
    },

    /// Validation error - invalid value
    #[error("{section} has invalid {field}: {message}")]
    InvalidValue {
        /// Config section
        section: &'static str,
        /// Field name
        field: &'static str,
        /// Error message
        message: String,
    },
}

impl ConfigError {
    /// Create a MissingField error
    pub fn missing_field(section: &'static str, field: &'static str) -> Self {
        Self::MissingField { section, field }
    }

    /// Create an InvalidValue error
    pub fn invalid_value(
        section: &'static str,
        field: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            section,
            field,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_error() {
        let err = ConfigError::missing_field("can", "interface");
        assert_eq!(err.to_string(), "can is missing required field 'interface'");
    }

    #[test]
    fn test_invalid_value_error() {
        let err =
            ConfigError::invalid_value("sinks.frames", "batch_size", "must be greater than 0");
        assert!(err.to_string().contains("sinks.frames"));
        assert!(err.to_string().contains("batch_size"));
        assert!(err.to_string().contains("greater than 0"));
    }

    #[test]
    fn test_io_error_includes_path() {
        let err = ConfigError::IoError {
            path: "/etc/canbridge.toml".into(),
            source: io::Error::new(io::ErrorKind::NotFound, "no such file"),
        };
        assert!(err.to_string().contains("/etc/canbridge.toml"));
    }
}
