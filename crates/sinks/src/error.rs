//! Sink errors

/// Errors from writing a batch downstream
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// ClickHouse client error
    #[error("clickhouse error: {0}")]
    ClickHouse(#[from] clickhouse::error::Error),

    /// Writer did not finish within the sink's write timeout
    #[error("write timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Writer-specific failure
    #[error("write failed: {0}")]
    Write(String),
}

impl SinkError {
    pub fn write(message: impl Into<String>) -> Self {
        Self::Write(message.into())
    }
}

/// Result type for sink operations
pub type Result<T> = std::result::Result<T, SinkError>;
