//! Rate-limited logging for hot drop paths
//!
//! A saturated queue can drop thousands of records per second. The logger
//! emits at most one line per interval and reports how many occurrences were
//! suppressed in between.
//!
//! # Example
//!
//! ```ignore
//! let logger = RateLimitedLogger::new(Duration::from_secs(10));
//!
//! // Logs once, then stays quiet for 10 seconds
//! for _ in 0..1000 {
//!     logger.warn("frames", "sink queue full, dropping record");
//! }
//! ```

use std::fmt::Display;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Default interval between log lines
pub const DEFAULT_LOG_INTERVAL: Duration = Duration::from_secs(10);

/// Logs at most once per interval, counting what it suppresses
///
/// Thread-safe: counters are atomics and the last log time sits behind a
/// mutex that is only held to compare and swap an `Instant`.
pub struct RateLimitedLogger {
    min_interval: Duration,
    last_log_time: Mutex<Option<Instant>>,
    /// Occurrences since the last emitted line
    pending: AtomicU64,
    /// Occurrences ever recorded
    total: AtomicU64,
}

impl RateLimitedLogger {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_log_time: Mutex::new(None),
            pending: AtomicU64::new(0),
            total: AtomicU64::new(0),
        }
    }

    /// Record a warning for `component`; returns true if it was logged
    pub fn warn(&self, component: &str, message: &str) -> bool {
        let Some((suppressed, total)) = self.record() else {
            return false;
        };

        tracing::warn!(
            component = %component,
            suppressed,
            total,
            "{}",
            message
        );
        true
    }

    /// Record an error for `component`; returns true if it was logged
    pub fn error(&self, component: &str, message: &str, error: &dyn Display) -> bool {
        let Some((suppressed, total)) = self.record() else {
            return false;
        };

        tracing::error!(
            component = %component,
            error = %error,
            suppressed,
            total,
            "{}",
            message
        );
        true
    }

    /// Occurrences since the last emitted line
    pub fn pending_count(&self) -> u64 {
        self.pending.load(Ordering::Relaxed)
    }

    /// Occurrences ever recorded
    pub fn total_count(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    /// Count one occurrence; when a line is due, return (suppressed, total)
    fn record(&self) -> Option<(u64, u64)> {
        self.pending.fetch_add(1, Ordering::Relaxed);
        let total = self.total.fetch_add(1, Ordering::Relaxed) + 1;

        {
            let mut last = self.last_log_time.lock();
            let now = Instant::now();
            match *last {
                Some(prev) if now.duration_since(prev) < self.min_interval => return None,
                _ => *last = Some(now),
            }
        }

        let pending = self.pending.swap(0, Ordering::Relaxed);
        Some((pending.saturating_sub(1), total))
    }
}

impl Default for RateLimitedLogger {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_INTERVAL)
    }
}
