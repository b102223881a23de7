//! Batching sink loop
//!
//! Records arrive through a bounded queue fed by [`SinkHandle::write`], which
//! never blocks: when the queue is full the record is dropped and counted.
//! The sink task accumulates records into a [`Batch`] and hands it to a
//! [`BatchWriter`] when either trigger fires:
//!
//! - **size**: the batch reaches `batch_size` (the interval is then reset)
//! - **time**: `flush_interval` elapses with records pending
//!
//! A failed write is logged and counted and the batch is discarded. A write
//! that outlives `write_timeout` counts as failed. On stop
//! (cancellation or every handle dropped) the queue is closed, already queued
//! records are drained, and the remainder is flushed once.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use canbridge_config::SinkSettings;
use canbridge_metrics::{SinkMetrics, SinkMetricsProvider, SinkMetricsSnapshot};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::Batch;
use crate::error::SinkError;
use crate::util::RateLimitedLogger;

/// Downstream destination of a batching sink
#[async_trait]
pub trait BatchWriter<R: Send + Sync>: Send + 'static {
    /// Short type name for metrics and logs ("clickhouse", "null")
    fn writer_type(&self) -> &'static str;

    /// Write one batch; the records are discarded whatever the outcome
    async fn write_batch(&mut self, records: &[R]) -> Result<(), SinkError>;

    /// Release resources after the final flush
    async fn close(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Settings for one sink instance
#[derive(Debug, Clone)]
pub struct BatchingSinkConfig {
    /// Sink name ("frames", "stats")
    pub name: String,
    /// Size trigger
    pub batch_size: usize,
    /// Time trigger
    pub flush_interval: Duration,
    /// Input queue capacity
    pub queue_size: usize,
    /// Upper bound on one `write_batch` or `close` call
    pub write_timeout: Duration,
}

impl BatchingSinkConfig {
    pub fn from_settings(name: impl Into<String>, settings: &SinkSettings) -> Self {
        Self {
            name: name.into(),
            batch_size: settings.batch_size,
            flush_interval: settings.flush_interval,
            queue_size: settings.queue_size,
            write_timeout: settings.write_timeout,
        }
    }
}

/// Producer side of a batching sink
pub struct SinkHandle<R> {
    name: Arc<str>,
    sender: mpsc::Sender<R>,
    metrics: Arc<SinkMetrics>,
    drop_logger: Arc<RateLimitedLogger>,
}

impl<R> Clone for SinkHandle<R> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            sender: self.sender.clone(),
            metrics: Arc::clone(&self.metrics),
            drop_logger: Arc::clone(&self.drop_logger),
        }
    }
}

impl<R> SinkHandle<R> {
    /// Enqueue a record without waiting; returns whether it was accepted
    pub fn write(&self, record: R) -> bool {
        match self.sender.try_send(record) {
            Ok(()) => {
                self.metrics.record_received();
                true
            }
            Err(TrySendError::Full(_)) => {
                self.metrics.record_dropped();
                self.drop_logger
                    .warn(&self.name, "sink queue full, dropping record");
                false
            }
            Err(TrySendError::Closed(_)) => {
                self.metrics.record_dropped();
                false
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// True once the sink has stopped accepting records
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Metrics handle for a batching sink
#[derive(Clone)]
pub struct BatchingSinkMetricsHandle {
    id: String,
    sink_type: &'static str,
    metrics: Arc<SinkMetrics>,
}

impl SinkMetricsProvider for BatchingSinkMetricsHandle {
    fn sink_id(&self) -> &str {
        &self.id
    }

    fn sink_type(&self) -> &str {
        self.sink_type
    }

    fn snapshot(&self) -> SinkMetricsSnapshot {
        self.metrics.snapshot()
    }
}

/// Accumulates records and writes them in batches
pub struct BatchingSink<R, W> {
    config: BatchingSinkConfig,
    writer: W,
    receiver: mpsc::Receiver<R>,
    batch: Batch<R>,
    metrics: Arc<SinkMetrics>,
}

impl<R, W> BatchingSink<R, W>
where
    R: Send + Sync + 'static,
    W: BatchWriter<R>,
{
    /// Create a sink and the handle that feeds it
    pub fn new(config: BatchingSinkConfig, writer: W) -> (Self, SinkHandle<R>) {
        let (sender, receiver) = mpsc::channel(config.queue_size.max(1));
        let metrics = Arc::new(SinkMetrics::new());

        let handle = SinkHandle {
            name: Arc::from(config.name.as_str()),
            sender,
            metrics: Arc::clone(&metrics),
            drop_logger: Arc::new(RateLimitedLogger::default()),
        };

        let sink = Self {
            batch: Batch::new(config.batch_size),
            config,
            writer,
            receiver,
            metrics,
        };

        (sink, handle)
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn metrics_handle(&self) -> BatchingSinkMetricsHandle {
        BatchingSinkMetricsHandle {
            id: self.config.name.clone(),
            sink_type: self.writer.writer_type(),
            metrics: Arc::clone(&self.metrics),
        }
    }

    /// Run the sink on its own task, stopped by a child of `cancel`
    pub fn spawn(self, cancel: &CancellationToken) -> RunningSink {
        let stop = cancel.child_token();
        let name = self.config.name.clone();
        let metrics = Arc::clone(&self.metrics);
        let task = tokio::spawn(self.run(stop.clone()));

        RunningSink {
            name,
            stop,
            task,
            metrics,
        }
    }

    /// Process records until cancelled or every handle is dropped
    ///
    /// Returns the final metrics snapshot after the last flush.
    pub async fn run(mut self, cancel: CancellationToken) -> SinkMetricsSnapshot {
        let period = self.config.flush_interval;
        tracing::info!(
            sink = %self.config.name,
            writer = self.writer.writer_type(),
            batch_size = self.batch.capacity(),
            flush_interval = ?period,
            "batching sink starting"
        );

        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break,

                record = self.receiver.recv() => match record {
                    Some(record) => {
                        if self.batch.push(record) {
                            self.flush().await;
                            ticker.reset();
                        }
                    }
                    None => break,
                },

                _ = ticker.tick() => {
                    if !self.batch.is_empty() {
                        self.flush().await;
                    }
                }
            }
        }

        self.shutdown().await
    }

    async fn shutdown(mut self) -> SinkMetricsSnapshot {
        self.receiver.close();
        while let Some(record) = self.receiver.recv().await {
            if self.batch.push(record) {
                self.flush().await;
            }
        }

        if !self.batch.is_empty() {
            self.flush().await;
        }

        let timeout = self.config.write_timeout;
        let closed = tokio::time::timeout(timeout, self.writer.close())
            .await
            .unwrap_or(Err(SinkError::Timeout(timeout)));
        if let Err(e) = closed {
            tracing::error!(sink = %self.config.name, error = %e, "failed to close writer");
        }

        let snapshot = self.metrics.snapshot();
        tracing::info!(
            sink = %self.config.name,
            received = snapshot.records_received,
            dropped = snapshot.records_dropped,
            written = snapshot.records_written,
            batches = snapshot.batches_written,
            failed = snapshot.records_failed,
            "batching sink stopped"
        );
        snapshot
    }

    async fn flush(&mut self) {
        let count = self.batch.len() as u64;
        self.metrics.record_flush();

        let timeout = self.config.write_timeout;
        let result = tokio::time::timeout(timeout, self.writer.write_batch(self.batch.records()))
            .await
            .unwrap_or(Err(SinkError::Timeout(timeout)));

        match result {
            Ok(()) => {
                self.metrics.record_written(count);
                tracing::debug!(sink = %self.config.name, records = count, "batch written");
            }
            Err(e) => {
                self.metrics.record_error(count);
                tracing::error!(
                    sink = %self.config.name,
                    records = count,
                    error = %e,
                    "failed to write batch, dropping it"
                );
            }
        }

        self.batch.clear();
    }
}

/// A sink running on its own task
pub struct RunningSink {
    name: String,
    stop: CancellationToken,
    task: JoinHandle<SinkMetricsSnapshot>,
    metrics: Arc<SinkMetrics>,
}

impl RunningSink {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stop the sink and wait at most `timeout` for its final flush
    ///
    /// On timeout the task is aborted and the counters so far are returned.
    pub async fn close_within(mut self, timeout: Duration) -> SinkMetricsSnapshot {
        self.stop.cancel();
        match tokio::time::timeout(timeout, &mut self.task).await {
            Ok(Ok(snapshot)) => snapshot,
            Ok(Err(e)) => {
                tracing::error!(sink = %self.name, error = %e, "sink task failed");
                self.metrics.snapshot()
            }
            Err(_) => {
                tracing::warn!(sink = %self.name, ?timeout, "sink did not flush within timeout");
                self.task.abort();
                self.metrics.snapshot()
            }
        }
    }

    /// Stop the sink and wait for its final flush
    pub async fn close(self) -> SinkMetricsSnapshot {
        self.stop.cancel();
        match self.task.await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::error!(sink = %self.name, error = %e, "sink task failed");
                self.metrics.snapshot()
            }
        }
    }
}
