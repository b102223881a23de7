//! Frame Reader
//!
//! Continuously reads 16-byte kernel frames from a raw CAN socket, decodes
//! them and publishes `CanMessage`s on a bounded queue.
//!
//! # Design
//!
//! - One dedicated OS thread per reader; the only suspension point is the
//!   blocking `read(2)`, bounded by the socket's receive timeout
//! - Frames and errors travel on two independent bounded queues
//! - Every push is `try_send`: a full frame queue drops the frame, counts it
//!   and reports it best-effort on the error queue
//! - `close` cancels the stop token, joins the thread and releases the socket
//!
//! # Example
//!
//! ```ignore
//! let mut reader = FrameReader::open(&config)?;
//! if let Err(e) = reader.set_filter(&config.filter_ids()) {
//!     tracing::warn!(error = %e, "continuing without CAN filter");
//! }
//! let ReaderOutput { mut frames, mut errors } = reader.start()?;
//! ```

use std::io;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use canbridge_config::CanConfig;
use canbridge_metrics::{SourceMetrics, SourceMetricsProvider, SourceMetricsSnapshot};
use canbridge_protocol::{CAN_FRAME_SIZE, CanMessage, ProtocolError, decode_frame};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;

/// Pause after a non-fatal read error before reading again
const ERROR_BACKOFF: Duration = Duration::from_millis(100);

// =============================================================================
// Frame Source
// =============================================================================

/// Blocking source of raw kernel CAN frames
///
/// Implemented by `CanSocket`; tests substitute scripted sources.
pub trait RawFrameSource: Send + Sync + 'static {
    /// Block until one frame is read or the receive timeout expires
    ///
    /// Returns the number of bytes read. A timeout surfaces as
    /// `WouldBlock`/`TimedOut`.
    fn read_raw(&self, buf: &mut [u8; CAN_FRAME_SIZE]) -> io::Result<usize>;

    /// Install exact-match identifier filters
    fn set_filter(&self, ids: &[u32]) -> io::Result<()>;
}

// =============================================================================
// Errors
// =============================================================================

/// Errors from setting up or starting a frame reader
#[derive(Debug, thiserror::Error)]
pub enum CanReaderError {
    /// Socket creation, interface lookup or bind failed
    #[error("CAN interface {interface} unavailable: {source}")]
    InterfaceUnavailable {
        interface: String,
        #[source]
        source: io::Error,
    },

    /// The kernel rejected the filter list
    #[error("failed to install CAN filter on {interface}: {source}")]
    FilterRejected {
        interface: String,
        #[source]
        source: io::Error,
    },

    /// `start` was called twice
    #[error("frame reader for {interface} already started")]
    AlreadyStarted { interface: String },

    /// `start` was called after `close`
    #[error("frame reader for {interface} is closed")]
    Closed { interface: String },

    /// The read thread could not be spawned
    #[error("failed to spawn reader thread: {0}")]
    Spawn(#[source] io::Error),
}

/// Errors published on the reader's error queue
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    /// Short read or invalid DLC
    #[error("malformed frame: {0}")]
    Malformed(#[from] ProtocolError),

    /// Socket read failed
    #[error("socket read failed: {0}")]
    Io(#[from] io::Error),

    /// Frame queue was full and the frame was dropped
    #[error("frame queue full, dropped frame 0x{can_id:X}")]
    QueueFull { can_id: u32 },
}

/// Receivers returned by `FrameReader::start`
#[derive(Debug)]
pub struct ReaderOutput {
    /// Decoded frames (capacity `frame_queue_size`)
    pub frames: mpsc::Receiver<CanMessage>,
    /// Read errors (capacity `error_queue_size`)
    pub errors: mpsc::Receiver<ReadError>,
}

// =============================================================================
// Metrics
// =============================================================================

/// Handle for reporting frame reader metrics
#[derive(Clone)]
pub struct FrameReaderMetricsHandle {
    id: String,
    metrics: Arc<SourceMetrics>,
}

impl SourceMetricsProvider for FrameReaderMetricsHandle {
    fn source_id(&self) -> &str {
        &self.id
    }

    fn source_type(&self) -> &str {
        "can_reader"
    }

    fn snapshot(&self) -> SourceMetricsSnapshot {
        self.metrics.snapshot()
    }
}

// =============================================================================
// Reader
// =============================================================================

/// Frame reader bound to one CAN interface
pub struct FrameReader<S: RawFrameSource> {
    interface: String,
    frame_queue_size: usize,
    error_queue_size: usize,
    source: Option<Arc<S>>,
    metrics: Arc<SourceMetrics>,
    stop: CancellationToken,
    thread: Option<JoinHandle<()>>,
    started: bool,
}

#[cfg(target_os = "linux")]
impl FrameReader<super::CanSocket> {
    /// Open and bind a raw CAN socket on `config.interface`
    pub fn open(config: &CanConfig) -> Result<Self, CanReaderError> {
        let unavailable = |source| CanReaderError::InterfaceUnavailable {
            interface: config.interface.clone(),
            source,
        };

        let socket = super::CanSocket::open(&config.interface).map_err(unavailable)?;
        socket
            .set_read_timeout(config.read_timeout)
            .map_err(unavailable)?;

        tracing::info!(
            interface = %config.interface,
            read_timeout_ms = config.read_timeout.as_millis() as u64,
            "CAN socket bound"
        );

        Ok(Self::with_source(config, socket))
    }
}

impl<S: RawFrameSource> FrameReader<S> {
    /// Create a reader over an already opened frame source
    pub fn with_source(config: &CanConfig, source: S) -> Self {
        Self {
            interface: config.interface.clone(),
            frame_queue_size: config.frame_queue_size,
            error_queue_size: config.error_queue_size,
            source: Some(Arc::new(source)),
            metrics: Arc::new(SourceMetrics::new()),
            stop: CancellationToken::new(),
            thread: None,
            started: false,
        }
    }

    /// Interface this reader is bound to
    pub fn interface(&self) -> &str {
        &self.interface
    }

    /// Get a metrics handle for reporting
    pub fn metrics_handle(&self) -> FrameReaderMetricsHandle {
        FrameReaderMetricsHandle {
            id: self.interface.clone(),
            metrics: Arc::clone(&self.metrics),
        }
    }

    /// Whether the read thread is alive
    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Accept only frames whose raw identifier word equals one of `ids`
    ///
    /// An empty list leaves the socket unfiltered.
    pub fn set_filter(&self, ids: &[u32]) -> Result<(), CanReaderError> {
        if ids.is_empty() {
            return Ok(());
        }

        let Some(source) = self.source.as_ref() else {
            return Err(self.closed());
        };

        source
            .set_filter(ids)
            .map_err(|source| CanReaderError::FilterRejected {
                interface: self.interface.clone(),
                source,
            })?;

        tracing::info!(
            interface = %self.interface,
            filter_count = ids.len(),
            "CAN filter installed"
        );
        Ok(())
    }

    /// Spawn the read thread and hand out the output queues
    pub fn start(&mut self) -> Result<ReaderOutput, CanReaderError> {
        if self.started {
            return Err(CanReaderError::AlreadyStarted {
                interface: self.interface.clone(),
            });
        }
        let Some(source) = self.source.as_ref().map(Arc::clone) else {
            return Err(self.closed());
        };

        let (frame_tx, frame_rx) = mpsc::channel(self.frame_queue_size);
        let (error_tx, error_rx) = mpsc::channel(self.error_queue_size);

        let worker = ReadLoop {
            source,
            interface: self.interface.clone(),
            frames: frame_tx,
            errors: error_tx,
            metrics: Arc::clone(&self.metrics),
            stop: self.stop.clone(),
        };

        let thread = std::thread::Builder::new()
            .name(format!("can-reader-{}", self.interface))
            .spawn(move || worker.run())
            .map_err(CanReaderError::Spawn)?;

        self.thread = Some(thread);
        self.started = true;

        Ok(ReaderOutput {
            frames: frame_rx,
            errors: error_rx,
        })
    }

    /// Stop the read thread and release the socket
    ///
    /// Waits at most one receive timeout for the thread to notice. Safe to
    /// call more than once.
    pub fn close(&mut self) {
        self.stop.cancel();

        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            tracing::error!(interface = %self.interface, "CAN reader thread panicked");
        }

        if self.source.take().is_some() {
            let s = self.metrics.snapshot();
            tracing::info!(
                interface = %self.interface,
                frames = s.records_received,
                dropped = s.records_dropped,
                decode_errors = s.decode_errors,
                read_errors = s.read_errors,
                "frame reader closed"
            );
        }
    }

    fn closed(&self) -> CanReaderError {
        CanReaderError::Closed {
            interface: self.interface.clone(),
        }
    }
}

impl<S: RawFrameSource> Drop for FrameReader<S> {
    fn drop(&mut self) {
        self.close();
    }
}

// =============================================================================
// Read Loop
// =============================================================================

/// State moved onto the read thread
struct ReadLoop<S> {
    source: Arc<S>,
    interface: String,
    frames: mpsc::Sender<CanMessage>,
    errors: mpsc::Sender<ReadError>,
    metrics: Arc<SourceMetrics>,
    stop: CancellationToken,
}

impl<S: RawFrameSource> ReadLoop<S> {
    fn run(self) {
        tracing::debug!(interface = %self.interface, "CAN read loop started");

        let mut buf = [0u8; CAN_FRAME_SIZE];

        while !self.stop.is_cancelled() {
            match self.source.read_raw(&mut buf) {
                Ok(n) => {
                    if !self.publish(&buf[..n]) {
                        tracing::debug!(
                            interface = %self.interface,
                            "frame receiver dropped, stopping read loop"
                        );
                        break;
                    }
                }
                Err(e) if is_timeout(&e) => {}
                Err(e) if is_fatal(&e) => {
                    self.metrics.record_read_error();
                    tracing::error!(
                        interface = %self.interface,
                        error = %e,
                        "fatal CAN socket error, stopping read loop"
                    );
                    let _ = self.errors.try_send(ReadError::Io(e));
                    break;
                }
                Err(e) => {
                    self.metrics.record_read_error();
                    let _ = self.errors.try_send(ReadError::Io(e));
                    std::thread::sleep(ERROR_BACKOFF);
                }
            }
        }

        tracing::debug!(interface = %self.interface, "CAN read loop stopped");
    }

    /// Decode one read and push it; returns false once the frame receiver is gone
    fn publish(&self, bytes: &[u8]) -> bool {
        let frame = match decode_frame(bytes) {
            Ok(frame) => frame,
            Err(e) => {
                self.metrics.record_decode_error();
                let _ = self.errors.try_send(ReadError::Malformed(e));
                return true;
            }
        };

        match self
            .frames
            .try_send(CanMessage::now(frame, self.interface.as_str()))
        {
            Ok(()) => {
                self.metrics.record_received(bytes.len() as u64);
                true
            }
            Err(TrySendError::Full(message)) => {
                self.metrics.record_dropped();
                let _ = self.errors.try_send(ReadError::QueueFull {
                    can_id: message.frame.can_id,
                });
                true
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }
}

/// Receive timeouts and interrupted reads are part of normal polling
fn is_timeout(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
    )
}

/// Errors after which the socket can never deliver another frame
fn is_fatal(e: &io::Error) -> bool {
    matches!(
        e.raw_os_error(),
        Some(libc::EBADF | libc::ENOTSOCK | libc::ENXIO | libc::ENODEV)
    )
}
