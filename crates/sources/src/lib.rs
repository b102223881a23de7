//! canbridge - Sources
//!
//! Producers that feed the ingestion pipeline through bounded queues.
//!
//! # Available Sources
//!
//! - **Frame Reader** - Raw SocketCAN reader on a dedicated OS thread
//! - **Statistics Sampler** - Timer-driven interface health snapshots
//!
//! # Design Principles
//!
//! - **Never block the bus**: every queue push is `try_send`; a full queue
//!   drops the record and bumps a counter
//! - **Cooperative stop**: both sources observe a `CancellationToken`
//! - **Metrics handles**: each source exposes a handle implementing
//!   `SourceMetricsProvider` that outlives the running task
//!
//! # Example
//!
//! ```ignore
//! use canbridge_sources::FrameReader;
//!
//! let mut reader = FrameReader::open(&config.can)?;
//! reader.set_filter(&config.can.filter_ids())?;
//! let output = reader.start()?;
//! // ... consume output.frames / output.errors
//! reader.close();
//! ```

pub mod can;
pub mod stats;

pub use can::{
    CanReaderError, FrameReader, FrameReaderMetricsHandle, RawFrameSource, ReadError,
    ReaderOutput,
};
#[cfg(target_os = "linux")]
pub use can::CanSocket;
pub use stats::{
    IpLinkProvider, StatsError, StatsProvider, StatsSampler, StatsSamplerMetricsHandle,
    parse_ip_link,
};
