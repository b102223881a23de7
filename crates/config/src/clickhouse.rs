//! ClickHouse connection configuration
//!
//! Shared by both sinks; each sink writes to its own table.

use serde::Deserialize;
use std::time::Duration;

/// ClickHouse connection and table settings
///
/// ```toml
/// [clickhouse]
/// url = "http://localhost:8123"
/// database = "default"
/// frames_table = "can_messages"
/// stats_table = "can_interface_stats"
/// create_tables = true
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClickHouseConfig {
    /// HTTP endpoint
    /// Default: "http://localhost:8123"
    pub url: String,

    /// Default: "default"
    pub database: String,

    /// Username (omitted when empty)
    pub username: String,

    /// Password (omitted when empty)
    pub password: String,

    /// Default: "can_messages"
    pub frames_table: String,

    /// Default: "can_interface_stats"
    pub stats_table: String,

    /// Issue `CREATE TABLE IF NOT EXISTS` at startup
    /// Default: true
    pub create_tables: bool,

    /// Upper bound on startup table creation
    /// Default: 30s
    #[serde(with = "humantime_serde")]
    pub connection_timeout: Duration,
}

impl Default for ClickHouseConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8123".into(),
            database: "default".into(),
            username: String::new(),
            password: String::new(),
            frames_table: "can_messages".into(),
            stats_table: "can_interface_stats".into(),
            create_tables: true,
            connection_timeout: Duration::from_secs(30),
        }
    }
}
