//! Periodic metrics reporter
//!
//! Collects snapshots from every registered source and sink at the
//! configured interval and writes the formatted report through tracing.

use crate::format::MetricsFormatter;
use crate::{
    CollectedMetrics, CollectedSink, CollectedSource, HumanFormatter, JsonFormatter,
    SinkMetricsProvider, SourceMetricsProvider,
};
use canbridge_config::{MetricsConfig, MetricsFormat};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Builder for constructing a MetricsReporter
#[derive(Default)]
pub struct MetricsReporterBuilder {
    config: Option<MetricsConfig>,
    sources: Vec<Arc<dyn SourceMetricsProvider>>,
    sinks: Vec<Arc<dyn SinkMetricsProvider>>,
}

impl MetricsReporterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: MetricsConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Register a source metrics provider
    pub fn source(mut self, provider: Arc<dyn SourceMetricsProvider>) -> Self {
        self.sources.push(provider);
        self
    }

    /// Register a sink metrics provider
    pub fn sink(mut self, provider: Arc<dyn SinkMetricsProvider>) -> Self {
        self.sinks.push(provider);
        self
    }

    pub fn build(self) -> MetricsReporter {
        let config = self.config.unwrap_or_default();
        let formatter: Box<dyn MetricsFormatter> = match config.format {
            MetricsFormat::Human => Box::new(HumanFormatter::new()),
            MetricsFormat::Json => Box::new(JsonFormatter::new()),
        };

        MetricsReporter {
            config,
            formatter,
            sources: self.sources,
            sinks: self.sinks,
            previous: None,
        }
    }
}

/// Metrics reporter task
pub struct MetricsReporter {
    config: MetricsConfig,
    formatter: Box<dyn MetricsFormatter>,
    sources: Vec<Arc<dyn SourceMetricsProvider>>,
    sinks: Vec<Arc<dyn SinkMetricsProvider>>,
    previous: Option<CollectedMetrics>,
}

impl MetricsReporter {
    pub fn builder() -> MetricsReporterBuilder {
        MetricsReporterBuilder::new()
    }

    /// Run the reporter until cancellation
    pub async fn run(mut self, cancel: CancellationToken) {
        if !self.config.enabled {
            info!("metrics reporting disabled");
            return;
        }

        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            interval_secs = self.config.interval.as_secs(),
            format = ?self.config.format,
            "metrics reporter started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("metrics reporter shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    self.report();
                }
            }
        }
    }

    /// Collect and report metrics once
    fn report(&mut self) {
        let metrics = self.collect();
        let rates = self.previous.as_ref().and_then(|prev| metrics.rates(prev));

        let output = self.formatter.format_report(&metrics, rates.as_ref());
        for line in output.lines() {
            info!("{}", line);
        }

        self.previous = Some(metrics);
    }

    fn collect(&self) -> CollectedMetrics {
        CollectedMetrics {
            timestamp: Some(Instant::now()),
            sources: self
                .sources
                .iter()
                .map(|s| CollectedSource {
                    id: s.source_id().to_string(),
                    source_type: s.source_type().to_string(),
                    snapshot: s.snapshot(),
                })
                .collect(),
            sinks: self
                .sinks
                .iter()
                .map(|s| CollectedSink {
                    id: s.sink_id().to_string(),
                    sink_type: s.sink_type().to_string(),
                    snapshot: s.snapshot(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SinkMetrics, SinkMetricsSnapshot, SourceMetrics, SourceMetricsSnapshot};
    use std::time::Duration;

    struct TestSource {
        metrics: SourceMetrics,
    }

    impl SourceMetricsProvider for TestSource {
        fn source_id(&self) -> &str {
            "can0"
        }
        fn source_type(&self) -> &str {
            "can_reader"
        }
        fn snapshot(&self) -> SourceMetricsSnapshot {
            self.metrics.snapshot()
        }
    }

    struct TestSink {
        metrics: SinkMetrics,
    }

    impl SinkMetricsProvider for TestSink {
        fn sink_id(&self) -> &str {
            "frames"
        }
        fn sink_type(&self) -> &str {
            "null"
        }
        fn snapshot(&self) -> SinkMetricsSnapshot {
            self.metrics.snapshot()
        }
    }

    #[test]
    fn test_builder_default() {
        let reporter = MetricsReporter::builder().build();

        assert!(reporter.config.enabled);
        assert!(reporter.sources.is_empty());
        assert!(reporter.sinks.is_empty());
    }

    #[test]
    fn test_collect_with_providers() {
        let source = Arc::new(TestSource {
            metrics: SourceMetrics::new(),
        });
        source.metrics.record_received(16);

        let sink = Arc::new(TestSink {
            metrics: SinkMetrics::new(),
        });
        sink.metrics.record_written(10);

        let reporter = MetricsReporter::builder()
            .source(source)
            .sink(sink)
            .build();

        let metrics = reporter.collect();

        assert!(metrics.timestamp.is_some());
        assert_eq!(metrics.sources[0].id, "can0");
        assert_eq!(metrics.sources[0].snapshot.records_received, 1);
        assert_eq!(metrics.sinks[0].snapshot.records_written, 10);
    }

    #[test]
    fn test_report_keeps_previous() {
        let mut reporter = MetricsReporter::builder().build();
        assert!(reporter.previous.is_none());
        reporter.report();
        assert!(reporter.previous.is_some());
    }

    #[tokio::test]
    async fn test_run_disabled() {
        let config = MetricsConfig {
            enabled: false,
            ..Default::default()
        };

        let reporter = MetricsReporter::builder().config(config).build();
        reporter.run(CancellationToken::new()).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_cancellation() {
        let config = MetricsConfig {
            enabled: true,
            interval: Duration::from_millis(100),
            ..Default::default()
        };

        let reporter = MetricsReporter::builder().config(config).build();
        let cancel = CancellationToken::new();

        let cancel_clone = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(350)).await;
            cancel_clone.cancel();
        });

        reporter.run(cancel).await;
    }
}
