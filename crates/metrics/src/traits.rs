//! Metrics provider traits
//!
//! Sources (frame reader, stats sampler) and sinks implement these so the
//! reporter can collect their counters without knowing the concrete types.
//!
//! # Design
//!
//! - Traits use `&self` for zero-copy metric access
//! - All providers are `Send + Sync` for thread-safe collection
//! - Metric structs use atomics internally, so no locks needed

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for a source component
///
/// A "record" is one decoded frame for the reader and one statistics
/// snapshot for the sampler.
#[derive(Debug, Default)]
pub struct SourceMetrics {
    /// Records pushed into the output queue
    pub records_received: AtomicU64,
    /// Bytes read from the underlying device
    pub bytes_received: AtomicU64,
    /// Records dropped because the output queue was full
    pub records_dropped: AtomicU64,
    /// Inputs rejected as malformed
    pub decode_errors: AtomicU64,
    /// I/O or query failures
    pub read_errors: AtomicU64,
}

impl SourceMetrics {
    /// Create new metrics with all counters at zero
    pub const fn new() -> Self {
        Self {
            records_received: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            records_dropped: AtomicU64::new(0),
            decode_errors: AtomicU64::new(0),
            read_errors: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_received(&self, bytes: u64) {
        self.records_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(bytes, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_dropped(&self) {
        self.records_dropped.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_read_error(&self) {
        self.read_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a snapshot of current values
    #[inline]
    pub fn snapshot(&self) -> SourceMetricsSnapshot {
        SourceMetricsSnapshot {
            records_received: self.records_received.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            records_dropped: self.records_dropped.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            read_errors: self.read_errors.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of source metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct SourceMetricsSnapshot {
    pub records_received: u64,
    pub bytes_received: u64,
    pub records_dropped: u64,
    pub decode_errors: u64,
    pub read_errors: u64,
}

impl SourceMetricsSnapshot {
    /// Decode plus read errors
    #[inline]
    pub fn errors(&self) -> u64 {
        self.decode_errors + self.read_errors
    }
}

/// Trait for sources to provide metrics to the reporter
pub trait SourceMetricsProvider: Send + Sync {
    /// Unique identifier for this source instance (e.g. the interface name)
    fn source_id(&self) -> &str;

    /// Source type ("can_reader", "stats_sampler")
    fn source_type(&self) -> &str;

    /// Get a snapshot of current metrics
    fn snapshot(&self) -> SourceMetricsSnapshot;
}

/// Metrics for a batching sink
#[derive(Debug, Default)]
pub struct SinkMetrics {
    /// Records accepted into the input queue
    pub records_received: AtomicU64,
    /// Records dropped because the input queue was full
    pub records_dropped: AtomicU64,
    /// Batches successfully written
    pub batches_written: AtomicU64,
    /// Records successfully written
    pub records_written: AtomicU64,
    /// Failed batch writes (each batch is discarded)
    pub write_errors: AtomicU64,
    /// Records lost with failed batches
    pub records_failed: AtomicU64,
    /// Flush attempts, successful or not
    pub flush_count: AtomicU64,
}

impl SinkMetrics {
    /// Create new metrics with all counters at zero
    pub const fn new() -> Self {
        Self {
            records_received: AtomicU64::new(0),
            records_dropped: AtomicU64::new(0),
            batches_written: AtomicU64::new(0),
            records_written: AtomicU64::new(0),
            write_errors: AtomicU64::new(0),
            records_failed: AtomicU64::new(0),
            flush_count: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_received(&self) {
        self.records_received.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_dropped(&self) {
        self.records_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successfully written batch
    #[inline]
    pub fn record_written(&self, records: u64) {
        self.batches_written.fetch_add(1, Ordering::Relaxed);
        self.records_written.fetch_add(records, Ordering::Relaxed);
    }

    /// Record a failed batch write
    #[inline]
    pub fn record_error(&self, records: u64) {
        self.write_errors.fetch_add(1, Ordering::Relaxed);
        self.records_failed.fetch_add(records, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_flush(&self) {
        self.flush_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a snapshot of current values
    #[inline]
    pub fn snapshot(&self) -> SinkMetricsSnapshot {
        SinkMetricsSnapshot {
            records_received: self.records_received.load(Ordering::Relaxed),
            records_dropped: self.records_dropped.load(Ordering::Relaxed),
            batches_written: self.batches_written.load(Ordering::Relaxed),
            records_written: self.records_written.load(Ordering::Relaxed),
            write_errors: self.write_errors.load(Ordering::Relaxed),
            records_failed: self.records_failed.load(Ordering::Relaxed),
            flush_count: self.flush_count.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of sink metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct SinkMetricsSnapshot {
    pub records_received: u64,
    pub records_dropped: u64,
    pub batches_written: u64,
    pub records_written: u64,
    pub write_errors: u64,
    pub records_failed: u64,
    pub flush_count: u64,
}

/// Trait for sinks to provide metrics to the reporter
pub trait SinkMetricsProvider: Send + Sync {
    /// Unique identifier for this sink instance ("frames", "stats")
    fn sink_id(&self) -> &str;

    /// Sink type ("clickhouse", "null")
    fn sink_type(&self) -> &str;

    /// Get a snapshot of current metrics
    fn snapshot(&self) -> SinkMetricsSnapshot;
}
