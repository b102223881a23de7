//! Tests for the frame reader

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use canbridge_config::CanConfig;
use canbridge_metrics::SourceMetricsProvider;
use canbridge_protocol::{CAN_FRAME_SIZE, CanFrame, ProtocolError};
use tokio::sync::mpsc;
use tokio::time::timeout;

use crate::can::{CanReaderError, FrameReader, RawFrameSource, ReadError, ReaderOutput};

const WAIT: Duration = Duration::from_secs(2);

// =============================================================================
// Scripted Source
// =============================================================================

/// Replays a fixed sequence of reads, then behaves like an idle bus
#[derive(Default)]
struct ScriptedSource {
    script: Mutex<VecDeque<io::Result<Vec<u8>>>>,
    filters: Arc<Mutex<Vec<u32>>>,
    reject_filter: bool,
}

impl ScriptedSource {
    fn new(script: Vec<io::Result<Vec<u8>>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            ..Default::default()
        }
    }
}

impl RawFrameSource for ScriptedSource {
    fn read_raw(&self, buf: &mut [u8; CAN_FRAME_SIZE]) -> io::Result<usize> {
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Ok(bytes)) => {
                buf[..bytes.len()].copy_from_slice(&bytes);
                Ok(bytes.len())
            }
            Some(Err(e)) => Err(e),
            None => {
                std::thread::sleep(Duration::from_millis(2));
                Err(io::Error::from(io::ErrorKind::WouldBlock))
            }
        }
    }

    fn set_filter(&self, ids: &[u32]) -> io::Result<()> {
        if self.reject_filter {
            return Err(io::Error::from_raw_os_error(libc::EINVAL));
        }
        self.filters.lock().unwrap().extend_from_slice(ids);
        Ok(())
    }
}

fn frame(id: u32, payload: &[u8]) -> io::Result<Vec<u8>> {
    Ok(CanFrame::new(id, payload).encode().to_vec())
}

fn config() -> CanConfig {
    CanConfig {
        interface: "vcan0".into(),
        ..Default::default()
    }
}

fn start(
    config: &CanConfig,
    script: Vec<io::Result<Vec<u8>>>,
) -> (FrameReader<ScriptedSource>, ReaderOutput) {
    let mut reader = FrameReader::with_source(config, ScriptedSource::new(script));
    let output = reader.start().unwrap();
    (reader, output)
}

async fn recv<T>(rx: &mut mpsc::Receiver<T>) -> Option<T> {
    timeout(WAIT, rx.recv()).await.expect("timed out waiting for queue")
}

// =============================================================================
// Decoding and delivery
// =============================================================================

#[tokio::test]
async fn test_frames_delivered_in_order() {
    let (mut reader, mut output) = start(
        &config(),
        vec![frame(0x181, &[0x0A, 0xFF]), frame(0x701, &[0x05])],
    );

    let first = recv(&mut output.frames).await.unwrap();
    let second = recv(&mut output.frames).await.unwrap();

    assert_eq!(first.frame.identifier(), 0x181);
    assert_eq!(first.frame.payload(), &[0x0A, 0xFF]);
    assert_eq!(first.interface, "vcan0");
    assert_eq!(second.frame.identifier(), 0x701);
    assert!(second.timestamp >= first.timestamp);

    let snapshot = reader.metrics_handle().snapshot();
    assert_eq!(snapshot.records_received, 2);
    assert_eq!(snapshot.bytes_received, 32);

    reader.close();
}

#[tokio::test]
async fn test_short_read_reported_and_loop_continues() {
    let (mut reader, mut output) = start(
        &config(),
        vec![Ok(vec![0x81, 0x01, 0x00]), frame(0x182, &[1])],
    );

    match recv(&mut output.errors).await.unwrap() {
        ReadError::Malformed(ProtocolError::MalformedFrame { expected, actual }) => {
            assert_eq!(expected, 16);
            assert_eq!(actual, 3);
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let message = recv(&mut output.frames).await.unwrap();
    assert_eq!(message.frame.identifier(), 0x182);
    assert_eq!(reader.metrics_handle().snapshot().decode_errors, 1);

    reader.close();
}

#[tokio::test]
async fn test_invalid_dlc_reported() {
    let mut bytes = CanFrame::new(0x181, &[1]).encode();
    bytes[4] = 12;

    let (mut reader, mut output) = start(&config(), vec![Ok(bytes.to_vec())]);

    let err = recv(&mut output.errors).await.unwrap();
    assert!(matches!(
        err,
        ReadError::Malformed(ProtocolError::InvalidDlc { dlc: 12, .. })
    ));

    reader.close();
}

// =============================================================================
// Backpressure
// =============================================================================

#[tokio::test]
async fn test_full_queue_drops_without_blocking() {
    let config = CanConfig {
        frame_queue_size: 1,
        ..config()
    };
    let (mut reader, mut output) = start(
        &config,
        vec![
            frame(0x181, &[1]),
            frame(0x182, &[2]),
            frame(0x183, &[3]),
        ],
    );

    for expected in [0x182, 0x183] {
        match recv(&mut output.errors).await.unwrap() {
            ReadError::QueueFull { can_id } => assert_eq!(can_id, expected),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    let kept = recv(&mut output.frames).await.unwrap();
    assert_eq!(kept.frame.identifier(), 0x181);

    let snapshot = reader.metrics_handle().snapshot();
    assert_eq!(snapshot.records_received, 1);
    assert_eq!(snapshot.records_dropped, 2);

    reader.close();
}

// =============================================================================
// Socket errors
// =============================================================================

#[tokio::test]
async fn test_timeouts_are_not_errors() {
    let (mut reader, mut output) = start(
        &config(),
        vec![
            Err(io::Error::from(io::ErrorKind::WouldBlock)),
            Err(io::Error::from(io::ErrorKind::TimedOut)),
            frame(0x181, &[]),
        ],
    );

    let message = recv(&mut output.frames).await.unwrap();
    assert_eq!(message.frame.dlc, 0);
    assert!(output.errors.try_recv().is_err());
    assert_eq!(reader.metrics_handle().snapshot().read_errors, 0);

    reader.close();
}

#[tokio::test]
async fn test_transient_error_reported_and_loop_continues() {
    let (mut reader, mut output) = start(
        &config(),
        vec![Err(io::Error::from_raw_os_error(libc::EIO)), frame(0x181, &[1])],
    );

    let err = recv(&mut output.errors).await.unwrap();
    assert!(matches!(err, ReadError::Io(_)));

    let message = recv(&mut output.frames).await.unwrap();
    assert_eq!(message.frame.identifier(), 0x181);
    assert!(reader.is_running());

    reader.close();
}

#[tokio::test]
async fn test_fatal_error_ends_loop() {
    let (mut reader, mut output) = start(
        &config(),
        vec![
            Err(io::Error::from_raw_os_error(libc::ENODEV)),
            frame(0x181, &[1]),
        ],
    );

    let err = recv(&mut output.errors).await.unwrap();
    match err {
        ReadError::Io(e) => assert_eq!(e.raw_os_error(), Some(libc::ENODEV)),
        other => panic!("unexpected error: {other:?}"),
    }

    // Sender dropped when the thread exits; the queued frame is never read
    assert!(recv(&mut output.frames).await.is_none());
    assert_eq!(reader.metrics_handle().snapshot().read_errors, 1);

    reader.close();
}

#[tokio::test]
async fn test_dropped_receiver_ends_loop() {
    let (mut reader, output) = start(&config(), vec![frame(0x181, &[1])]);
    drop(output.frames);

    let deadline = tokio::time::Instant::now() + WAIT;
    while reader.is_running() {
        assert!(tokio::time::Instant::now() < deadline, "read loop did not stop");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    reader.close();
}

// =============================================================================
// Lifecycle
// =============================================================================

#[tokio::test]
async fn test_start_twice_rejected() {
    let (mut reader, _output) = start(&config(), vec![]);

    let err = reader.start().unwrap_err();
    assert!(matches!(
        err,
        CanReaderError::AlreadyStarted { ref interface } if interface == "vcan0"
    ));

    reader.close();
}

#[tokio::test]
async fn test_close_is_idempotent_and_closes_queues() {
    let (mut reader, mut output) = start(&config(), vec![]);
    assert!(reader.is_running());

    reader.close();
    reader.close();

    assert!(!reader.is_running());
    assert!(recv(&mut output.frames).await.is_none());
    assert!(recv(&mut output.errors).await.is_none());
}

#[test]
fn test_start_after_close_rejected() {
    let mut reader = FrameReader::with_source(&config(), ScriptedSource::default());
    reader.close();

    assert!(matches!(reader.start(), Err(CanReaderError::Closed { .. })));
}

#[test]
fn test_metrics_handle_identity() {
    let reader = FrameReader::with_source(&config(), ScriptedSource::default());
    let handle = reader.metrics_handle();

    assert_eq!(handle.source_id(), "vcan0");
    assert_eq!(handle.source_type(), "can_reader");
    assert_eq!(handle.snapshot().records_received, 0);
}

// =============================================================================
// Filters
// =============================================================================

#[test]
fn test_set_filter_passes_ids() {
    let source = ScriptedSource::default();
    let installed = Arc::clone(&source.filters);
    let reader = FrameReader::with_source(&config(), source);

    reader.set_filter(&[0x181, 0x701]).unwrap();

    assert_eq!(*installed.lock().unwrap(), vec![0x181, 0x701]);
}

#[test]
fn test_set_filter_empty_is_noop() {
    let source = ScriptedSource {
        reject_filter: true,
        ..Default::default()
    };
    let reader = FrameReader::with_source(&config(), source);

    assert!(reader.set_filter(&[]).is_ok());
}

#[test]
fn test_set_filter_rejected() {
    let source = ScriptedSource {
        reject_filter: true,
        ..Default::default()
    };
    let reader = FrameReader::with_source(&config(), source);

    let err = reader.set_filter(&[0x181]).unwrap_err();
    assert!(matches!(err, CanReaderError::FilterRejected { .. }));
    assert!(err.to_string().contains("vcan0"));
}

#[test]
fn test_read_error_display() {
    let err = ReadError::QueueFull { can_id: 0x181 };
    assert_eq!(err.to_string(), "frame queue full, dropped frame 0x181");
}
