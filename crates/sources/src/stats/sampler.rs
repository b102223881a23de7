//! Statistics Sampler
//!
//! Timer-driven task that queries one interface's statistics and publishes a
//! stamped `BusStatistics` snapshot per tick.
//!
//! # Design
//!
//! - Samples immediately on start, then every `interval`
//! - A failed query logs a warning and skips the tick; the loop keeps going
//! - Snapshots are pushed with `try_send`; a full queue drops the snapshot
//! - The sampler's token is a child of the process token, so `stop` ends
//!   this sampler only while a global shutdown ends all of them
//! - When the loop exits the sender is dropped, closing the queue

use std::io;
use std::process::ExitStatus;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use canbridge_config::StatsConfig;
use canbridge_metrics::{SourceMetrics, SourceMetricsProvider, SourceMetricsSnapshot};
use canbridge_protocol::BusStatistics;
use chrono::Utc;
use tokio::process::Command;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;

use super::parse_ip_link;

/// Default `ip` binary
const DEFAULT_IP_PROGRAM: &str = "ip";

// =============================================================================
// Errors
// =============================================================================

/// Errors from querying interface statistics
#[derive(Debug, thiserror::Error)]
pub enum StatsError {
    /// The query command could not be started
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// The query command ran but reported failure
    #[error("{program} exited with {status}: {stderr}")]
    CommandFailed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },

    /// Output was not recognizable
    #[error("unrecognized link statistics: {0}")]
    Parse(String),
}

// =============================================================================
// Provider
// =============================================================================

/// Source of interface statistics
#[async_trait]
pub trait StatsProvider: Send + Sync + 'static {
    /// Query the current statistics of `interface`
    async fn query(&self, interface: &str) -> Result<BusStatistics, StatsError>;
}

/// Queries statistics by running `ip -details -statistics link show <iface>`
#[derive(Debug, Clone)]
pub struct IpLinkProvider {
    program: String,
}

impl Default for IpLinkProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl IpLinkProvider {
    pub fn new() -> Self {
        Self::with_program(DEFAULT_IP_PROGRAM)
    }

    /// Use a specific `ip` binary
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl StatsProvider for IpLinkProvider {
    async fn query(&self, interface: &str) -> Result<BusStatistics, StatsError> {
        let output = Command::new(&self.program)
            .args(["-details", "-statistics", "link", "show", interface])
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| StatsError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(StatsError::CommandFailed {
                program: self.program.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        parse_ip_link(&String::from_utf8_lossy(&output.stdout))
    }
}

// =============================================================================
// Metrics
// =============================================================================

/// Handle for reporting sampler metrics
#[derive(Clone)]
pub struct StatsSamplerMetricsHandle {
    id: String,
    metrics: Arc<SourceMetrics>,
}

impl SourceMetricsProvider for StatsSamplerMetricsHandle {
    fn source_id(&self) -> &str {
        &self.id
    }

    fn source_type(&self) -> &str {
        "stats_sampler"
    }

    fn snapshot(&self) -> SourceMetricsSnapshot {
        self.metrics.snapshot()
    }
}

// =============================================================================
// Sampler
// =============================================================================

/// Periodic statistics sampler for one interface
pub struct StatsSampler<P: StatsProvider> {
    interface: String,
    interval: Duration,
    provider: P,
    sender: mpsc::Sender<BusStatistics>,
    cancel: CancellationToken,
    metrics: Arc<SourceMetrics>,
}

impl<P: StatsProvider> StatsSampler<P> {
    /// Create a sampler and its output queue
    ///
    /// The sampler stops when `cancel` (or the sampler itself) is cancelled.
    pub fn new(
        interface: impl Into<String>,
        config: &StatsConfig,
        provider: P,
        cancel: &CancellationToken,
    ) -> (Self, mpsc::Receiver<BusStatistics>) {
        let (sender, receiver) = mpsc::channel(config.queue_size);
        let sampler = Self {
            interface: interface.into(),
            interval: config.interval,
            provider,
            sender,
            cancel: cancel.child_token(),
            metrics: Arc::new(SourceMetrics::new()),
        };
        (sampler, receiver)
    }

    /// Get a metrics handle for reporting
    pub fn metrics_handle(&self) -> StatsSamplerMetricsHandle {
        StatsSamplerMetricsHandle {
            id: format!("{}_stats", self.interface),
            metrics: Arc::clone(&self.metrics),
        }
    }

    /// Token that stops this sampler only
    ///
    /// Keep it to stop the sampler after `run` has taken ownership.
    pub fn stop_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stop sampling. Safe to call more than once.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Run until stopped or until the output queue's receiver is dropped
    pub async fn run(self) {
        tracing::info!(
            interface = %self.interface,
            interval_secs = self.interval.as_secs_f64(),
            "stats sampler started"
        );

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => break,

                _ = ticker.tick() => {
                    if !self.sample().await {
                        tracing::debug!(
                            interface = %self.interface,
                            "stats receiver dropped, stopping sampler"
                        );
                        break;
                    }
                }
            }
        }

        let s = self.metrics.snapshot();
        tracing::info!(
            interface = %self.interface,
            samples = s.records_received,
            dropped = s.records_dropped,
            failures = s.read_errors,
            "stats sampler stopped"
        );
    }

    /// Take one sample; returns false once the receiver is gone
    async fn sample(&self) -> bool {
        let mut stats = match self.provider.query(&self.interface).await {
            Ok(stats) => stats,
            Err(e) => {
                self.metrics.record_read_error();
                tracing::warn!(
                    interface = %self.interface,
                    error = %e,
                    "failed to sample interface statistics"
                );
                return true;
            }
        };

        stats.timestamp = Utc::now();
        stats.interface = self.interface.clone();

        match self.sender.try_send(stats) {
            Ok(()) => {
                self.metrics.record_received(0);
                true
            }
            Err(TrySendError::Full(_)) => {
                self.metrics.record_dropped();
                tracing::warn!(
                    interface = %self.interface,
                    "stats queue full, dropping snapshot"
                );
                true
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }
}
