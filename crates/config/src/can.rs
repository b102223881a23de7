//! CAN interface configuration
//!
//! Which interface the frame reader binds to, the optional exact-match id
//! filter, and the reader's queue sizes.

use std::fmt;
use std::time::Duration;

use serde::Deserialize;

/// Default CAN interface
pub const DEFAULT_INTERFACE: &str = "vcan0";

/// Default frame queue capacity
pub const DEFAULT_FRAME_QUEUE_SIZE: usize = 1000;

/// Default error queue capacity
pub const DEFAULT_ERROR_QUEUE_SIZE: usize = 10;

/// Default socket receive timeout
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(100);

/// A CAN identifier in a filter list
///
/// Accepts a TOML integer (`0x181` or `385`) or a string holding hex digits
/// with or without a `0x` prefix (`"0x181"`, `"181"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "RawFilterId")]
pub struct FilterId(pub u32);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawFilterId {
    Int(i64),
    Str(String),
}

impl TryFrom<RawFilterId> for FilterId {
    type Error = String;

    fn try_from(raw: RawFilterId) -> Result<Self, Self::Error> {
        match raw {
            RawFilterId::Int(v) => u32::try_from(v)
                .map(FilterId)
                .map_err(|_| format!("CAN id {} out of range", v)),
            RawFilterId::Str(s) => s.parse(),
        }
    }
}

impl std::str::FromStr for FilterId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        u32::from_str_radix(digits, 16)
            .map(FilterId)
            .map_err(|_| format!("invalid CAN id '{}', expected hex", s))
    }
}

impl fmt::Display for FilterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:X}", self.0)
    }
}

/// CAN reader configuration
///
/// ```toml
/// [can]
/// interface = "can0"
/// filters = ["0x181", 0x201, "281"]
/// frame_queue_size = 1000
/// error_queue_size = 10
/// read_timeout = "100ms"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CanConfig {
    /// Interface name
    /// Default: "vcan0"
    pub interface: String,

    /// Exact-match identifiers to accept (empty = all frames)
    pub filters: Vec<FilterId>,

    /// Frame queue capacity
    /// Default: 1000
    pub frame_queue_size: usize,

    /// Error queue capacity
    /// Default: 10
    pub error_queue_size: usize,

    /// Socket receive timeout, bounds how long `close` waits for the read loop
    /// Default: 100ms
    #[serde(with = "humantime_serde")]
    pub read_timeout: Duration,
}

impl Default for CanConfig {
    fn default() -> Self {
        Self {
            interface: DEFAULT_INTERFACE.into(),
            filters: Vec::new(),
            frame_queue_size: DEFAULT_FRAME_QUEUE_SIZE,
            error_queue_size: DEFAULT_ERROR_QUEUE_SIZE,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

impl CanConfig {
    /// Filter identifiers as raw ids
    pub fn filter_ids(&self) -> Vec<u32> {
        self.filters.iter().map(|f| f.0).collect()
    }
}
