//! Serve command - run the ingestion pipeline
//!
//! ```text
//! [FrameReader thread] --frames--> forward --> [frames BatchingSink] --> ClickHouse
//!                      --errors--> log
//! [StatsSampler task]  --stats---> forward --> [stats BatchingSink]  --> ClickHouse
//! ```
//!
//! Shutdown order: stop the sampler, close the reader (which closes its
//! queues), wait for the forwarders to drain, then close each sink so it
//! flushes once. Each step is bounded in time.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use canbridge_config::{Config, SinkSettings, SinkType};
use canbridge_metrics::{MetricsReporter, SinkMetricsSnapshot};
use canbridge_protocol::{BusStatistics, CanMessage};
use canbridge_sinks::clickhouse::{ClickHouseWriter, TableRecord, build_client};
use canbridge_sinks::null::NullWriter;
use canbridge_sinks::util::RateLimitedLogger;
use canbridge_sinks::{
    BatchWriter, BatchingSink, BatchingSinkConfig, BatchingSinkMetricsHandle, RunningSink,
    SinkHandle,
};
use canbridge_sources::{FrameReader, IpLinkProvider, ReadError, StatsSampler};
use clickhouse::Client;
use tokio::signal;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Upper bound on waiting for a forwarder to drain at shutdown
const FORWARD_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Load configuration from an explicit path, a default path, or defaults
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => {
            // Explicit path must exist
            if !path.exists() {
                return Err(anyhow!("config file not found: {}", path.display()));
            }
            Config::from_file(path).context("failed to load configuration")
        }
        None => {
            let default_paths = [
                PathBuf::from("configs/config.toml"),
                PathBuf::from("config.toml"),
            ];
            for path in &default_paths {
                if path.exists() {
                    return Config::from_file(path).context("failed to load configuration");
                }
            }
            Ok(Config::default())
        }
    }
}

/// Run the pipeline until SIGINT or SIGTERM
pub async fn run(config: Config) -> Result<()> {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        interface = %config.can.interface,
        "canbridge starting"
    );

    if let Err(e) = run_pipeline(config).await {
        error!(error = %e, "pipeline error");
        return Err(e);
    }

    info!("canbridge shutdown complete");
    Ok(())
}

/// A sink task plus what producers and the reporter need from it
struct StartedSink<R> {
    handle: SinkHandle<R>,
    metrics: BatchingSinkMetricsHandle,
    running: RunningSink,
}

impl<R: Send + Sync + 'static> StartedSink<R> {
    fn spawn<W: BatchWriter<R>>(
        sink: BatchingSink<R, W>,
        handle: SinkHandle<R>,
        stop: &CancellationToken,
    ) -> Self {
        let metrics = sink.metrics_handle();
        Self {
            handle,
            metrics,
            running: sink.spawn(stop),
        }
    }
}

async fn run_pipeline(config: Config) -> Result<()> {
    let cancel = CancellationToken::new();
    // Sinks outlive the reader so queued frames still reach them
    let sink_stop = CancellationToken::new();

    let client = config
        .sinks
        .uses_clickhouse()
        .then(|| build_client(&config.clickhouse));

    let frames = start_sink::<CanMessage>(
        "frames",
        &config.sinks.frames(),
        client.as_ref(),
        &config.clickhouse.frames_table,
        &config,
        &sink_stop,
    )
    .await?;
    let stats = start_sink::<BusStatistics>(
        "stats",
        &config.sinks.stats(),
        client.as_ref(),
        &config.clickhouse.stats_table,
        &config,
        &sink_stop,
    )
    .await?;

    let mut reader = FrameReader::open(&config.can).context("failed to open CAN interface")?;
    let filter = config.can.filter_ids();
    match reader.set_filter(&filter) {
        Ok(()) if !filter.is_empty() => info!(
            interface = %config.can.interface,
            ids = filter.len(),
            "frame filter applied"
        ),
        Ok(()) => {}
        Err(e) => warn!(error = %e, "frame filter rejected, receiving all frames"),
    }

    let mut reporter = MetricsReporter::builder()
        .config(config.metrics.clone())
        .source(Arc::new(reader.metrics_handle()))
        .sink(Arc::new(frames.metrics.clone()))
        .sink(Arc::new(stats.metrics.clone()));

    let mut forwarders: Vec<JoinHandle<()>> = Vec::new();

    if config.stats.enabled {
        let (sampler, samples) =
            StatsSampler::new(&config.can.interface, &config.stats, IpLinkProvider::new(), &cancel);
        reporter = reporter.source(Arc::new(sampler.metrics_handle()));
        forwarders.push(tokio::spawn(sampler.run()));
        forwarders.push(tokio::spawn(forward(samples, stats.handle.clone())));
    } else {
        info!("interface statistics disabled");
    }

    let output = reader.start().context("failed to start frame reader")?;
    forwarders.push(tokio::spawn(forward(output.frames, frames.handle.clone())));
    forwarders.push(tokio::spawn(log_read_errors(
        output.errors,
        config.can.interface.clone(),
    )));

    let metrics_task = if config.metrics.enabled {
        let reporter = reporter.build();
        let cancel = cancel.clone();
        Some(tokio::spawn(async move { reporter.run(cancel).await }))
    } else {
        info!("metrics reporting disabled");
        None
    };

    info!(
        interface = %config.can.interface,
        frames_sink = config.sinks.frames().sink_type.as_str(),
        stats_sink = config.sinks.stats().sink_type.as_str(),
        "canbridge running"
    );

    wait_for_shutdown().await;
    info!("shutdown signal received, stopping pipeline...");

    // Stops the sampler and the metrics reporter
    cancel.cancel();

    // Joins the read thread; dropping its senders ends the forwarders
    tokio::task::spawn_blocking(move || {
        reader.close();
    })
    .await
    .context("frame reader close panicked")?;

    for task in forwarders {
        match tokio::time::timeout(FORWARD_DRAIN_TIMEOUT, task).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "forwarder task panicked"),
            Err(_) => warn!("forwarder did not finish within timeout"),
        }
    }

    drop(frames.handle);
    drop(stats.handle);
    let shutdown_timeout = config.sinks.shutdown_timeout;
    log_final("frames", &frames.running.close_within(shutdown_timeout).await);
    log_final("stats", &stats.running.close_within(shutdown_timeout).await);

    if let Some(task) = metrics_task
        && let Err(e) = task.await
    {
        warn!(error = %e, "metrics reporter panicked");
    }

    Ok(())
}

/// Build the writer for `settings` and spawn its sink
///
/// Fails if the table cannot be created within `connection_timeout`.
async fn start_sink<R>(
    name: &str,
    settings: &SinkSettings,
    client: Option<&Client>,
    table: &str,
    config: &Config,
    stop: &CancellationToken,
) -> Result<StartedSink<R>>
where
    R: TableRecord,
    for<'a> R::Row: clickhouse::Row<Value<'a> = R::Row>,
{
    let sink_config = BatchingSinkConfig::from_settings(name, settings);

    match settings.sink_type {
        SinkType::Null => {
            let (sink, handle) = BatchingSink::new(sink_config, NullWriter::new());
            Ok(StartedSink::spawn(sink, handle, stop))
        }
        SinkType::Clickhouse => {
            let client = client.context("clickhouse client not configured")?;
            let writer = ClickHouseWriter::<R>::new(client.clone(), table);

            if config.clickhouse.create_tables {
                tokio::time::timeout(config.clickhouse.connection_timeout, writer.ensure_table())
                    .await
                    .map_err(|_| anyhow!("timed out creating table {}", table))?
                    .with_context(|| format!("failed to create table {}", table))?;
            }

            let (sink, handle) = BatchingSink::new(sink_config, writer);
            Ok(StartedSink::spawn(sink, handle, stop))
        }
    }
}

/// Move records from a producer queue into a sink until the queue closes
async fn forward<R>(mut queue: mpsc::Receiver<R>, sink: SinkHandle<R>) {
    while let Some(record) = queue.recv().await {
        // Drops are counted and logged by the handle
        sink.write(record);
    }
}

async fn log_read_errors(mut errors: mpsc::Receiver<ReadError>, interface: String) {
    let logger = RateLimitedLogger::default();
    while let Some(e) = errors.recv().await {
        logger.error(&interface, "frame read error", &e);
    }
}

fn log_final(sink: &str, snapshot: &SinkMetricsSnapshot) {
    info!(
        sink = %sink,
        received = snapshot.records_received,
        dropped = snapshot.records_dropped,
        written = snapshot.records_written,
        failed = snapshot.records_failed,
        "sink final counts"
    );
}

/// Wait for SIGINT or SIGTERM
async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_config_missing_explicit_path() {
        let err = load_config(Some(Path::new("/nonexistent/canbridge.toml"))).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[can]\ninterface = \"can1\"\n\n[sinks.frames]\ntype = \"null\"").unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.can.interface, "can1");
        assert_eq!(config.sinks.frames().sink_type, SinkType::Null);
    }

    #[tokio::test(start_paused = true)]
    async fn test_forward_until_queue_closes() {
        let (tx, rx) = mpsc::channel(8);
        let (sink, handle) = BatchingSink::new(
            BatchingSinkConfig {
                name: "frames".into(),
                batch_size: 10,
                flush_interval: Duration::from_secs(1),
                queue_size: 10,
                write_timeout: Duration::from_secs(30),
            },
            NullWriter::new(),
        );
        let running = sink.spawn(&CancellationToken::new());

        for i in 0..3u32 {
            tx.send(i).await.unwrap();
        }
        drop(tx);
        forward(rx, handle).await;

        let snapshot = running.close().await;
        assert_eq!(snapshot.records_received, 3);
        assert_eq!(snapshot.records_written, 3);
    }

    #[tokio::test]
    async fn test_null_sinks_need_no_client() {
        let config: Config = "[sinks.frames]\ntype = \"null\"".parse().unwrap();

        let stop = CancellationToken::new();
        let started = start_sink::<CanMessage>(
            "frames",
            &config.sinks.frames(),
            None,
            "can_messages",
            &config,
            &stop,
        )
        .await
        .unwrap();
        assert!(started.handle.write(CanMessage::now(
            canbridge_protocol::CanFrame::new(0x181, &[1]),
            "vcan0"
        )));
        started.running.close().await;
    }

    #[tokio::test]
    async fn test_clickhouse_sink_requires_client() {
        let config = Config::default();
        let stop = CancellationToken::new();
        let result = start_sink::<CanMessage>(
            "frames",
            &config.sinks.frames(),
            None,
            "can_messages",
            &config,
            &stop,
        )
        .await;
        assert!(result.is_err());
    }
}
