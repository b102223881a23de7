//! Collected metrics snapshot and rate calculations

use crate::{SinkMetricsSnapshot, SourceMetricsSnapshot};
use std::time::{Duration, Instant};

/// Collected source snapshot with metadata
#[derive(Debug, Clone)]
pub struct CollectedSource {
    pub id: String,
    pub source_type: String,
    pub snapshot: SourceMetricsSnapshot,
}

/// Collected sink snapshot with metadata
#[derive(Debug, Clone)]
pub struct CollectedSink {
    pub id: String,
    pub sink_type: String,
    pub snapshot: SinkMetricsSnapshot,
}

/// Complete metrics collection at a point in time
#[derive(Debug, Clone, Default)]
pub struct CollectedMetrics {
    /// When this collection was taken
    pub timestamp: Option<Instant>,
    pub sources: Vec<CollectedSource>,
    pub sinks: Vec<CollectedSink>,
}

impl CollectedMetrics {
    /// Calculate rates by comparing with a previous snapshot
    ///
    /// Returns None if timestamps are missing or no time has passed.
    pub fn rates(&self, previous: &CollectedMetrics) -> Option<MetricsRates> {
        let current_ts = self.timestamp?;
        let previous_ts = previous.timestamp?;

        let elapsed = current_ts.duration_since(previous_ts);
        if elapsed.is_zero() {
            return None;
        }
        let elapsed_secs = elapsed.as_secs_f64();

        let sources = self
            .sources
            .iter()
            .filter_map(|current| {
                let prev = previous.sources.iter().find(|s| s.id == current.id)?;
                Some(SourceRates {
                    id: current.id.clone(),
                    source_type: current.source_type.clone(),
                    records_per_sec: rate(
                        current.snapshot.records_received,
                        prev.snapshot.records_received,
                        elapsed_secs,
                    ),
                    dropped: current
                        .snapshot
                        .records_dropped
                        .saturating_sub(prev.snapshot.records_dropped),
                    errors: current.snapshot.errors().saturating_sub(prev.snapshot.errors()),
                })
            })
            .collect();

        let sinks = self
            .sinks
            .iter()
            .filter_map(|current| {
                let prev = previous.sinks.iter().find(|s| s.id == current.id)?;
                Some(SinkRates {
                    id: current.id.clone(),
                    sink_type: current.sink_type.clone(),
                    records_per_sec: rate(
                        current.snapshot.records_written,
                        prev.snapshot.records_written,
                        elapsed_secs,
                    ),
                    dropped: current
                        .snapshot
                        .records_dropped
                        .saturating_sub(prev.snapshot.records_dropped),
                    errors: current
                        .snapshot
                        .write_errors
                        .saturating_sub(prev.snapshot.write_errors),
                })
            })
            .collect();

        Some(MetricsRates {
            elapsed,
            sources,
            sinks,
        })
    }
}

#[inline]
fn rate(current: u64, previous: u64, elapsed_secs: f64) -> f64 {
    current.saturating_sub(previous) as f64 / elapsed_secs
}

/// Calculated rates between two snapshots
#[derive(Debug, Clone)]
pub struct MetricsRates {
    pub elapsed: Duration,
    pub sources: Vec<SourceRates>,
    pub sinks: Vec<SinkRates>,
}

/// Per-source rates
#[derive(Debug, Clone)]
pub struct SourceRates {
    pub id: String,
    pub source_type: String,
    pub records_per_sec: f64,
    /// Drops in this period
    pub dropped: u64,
    /// Errors in this period
    pub errors: u64,
}

/// Per-sink rates
#[derive(Debug, Clone)]
pub struct SinkRates {
    pub id: String,
    pub sink_type: String,
    pub records_per_sec: f64,
    /// Drops in this period
    pub dropped: u64,
    /// Failed flushes in this period
    pub errors: u64,
}
