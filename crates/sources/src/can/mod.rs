//! SocketCAN frame reader
//!
//! The reader owns one raw CAN socket and runs its blocking read loop on a
//! dedicated OS thread. Decoded frames and read errors are published on two
//! independent bounded queues.

mod reader;
#[cfg(target_os = "linux")]
mod socket;

pub use reader::{
    CanReaderError, FrameReader, FrameReaderMetricsHandle, RawFrameSource, ReadError,
    ReaderOutput,
};
#[cfg(target_os = "linux")]
pub use socket::CanSocket;

#[cfg(test)]
#[path = "reader_test.rs"]
mod reader_test;
