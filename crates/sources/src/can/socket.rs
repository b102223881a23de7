//! Raw SocketCAN socket
//!
//! Wraps a `socketcan::CanSocket`. Frames are read as the kernel's 16-byte
//! `struct can_frame` and decoded by `canbridge_protocol::decode_frame`.

use std::fmt;
use std::io;
use std::os::fd::AsRawFd;
use std::time::Duration;

use canbridge_protocol::CAN_FRAME_SIZE;
use socketcan::{CanFilter, Socket, SocketOptions};

use super::RawFrameSource;

/// Mask requiring every identifier bit, including flags, to match
const EXACT_MATCH_MASK: u32 = 0xFFFF_FFFF;

/// Shortest receive timeout handed to the kernel
///
/// A zero `SO_RCVTIMEO` means "block forever".
pub const MIN_READ_TIMEOUT: Duration = Duration::from_millis(1);

/// A raw CAN socket bound to one interface
pub struct CanSocket {
    inner: socketcan::CanSocket,
    interface: String,
}

impl CanSocket {
    /// Create a raw CAN socket and bind it to `interface`
    pub fn open(interface: &str) -> io::Result<Self> {
        let inner = socketcan::CanSocket::open(interface)?;
        Ok(Self {
            inner,
            interface: interface.to_string(),
        })
    }

    /// Interface this socket is bound to
    pub fn interface(&self) -> &str {
        &self.interface
    }

    /// Bound each blocking read so the read loop can observe its stop signal
    pub fn set_read_timeout(&self, timeout: Duration) -> io::Result<()> {
        self.inner.set_read_timeout(clamp_read_timeout(timeout))
    }
}

impl fmt::Debug for CanSocket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CanSocket")
            .field("interface", &self.interface)
            .field("fd", &self.inner.as_raw_fd())
            .finish()
    }
}

/// Raise timeouts too short to survive the conversion to `timeval`
pub(crate) fn clamp_read_timeout(timeout: Duration) -> Duration {
    timeout.max(MIN_READ_TIMEOUT)
}

fn exact_filters(ids: &[u32]) -> Vec<CanFilter> {
    ids.iter()
        .map(|&id| CanFilter::new(id, EXACT_MATCH_MASK))
        .collect()
}

impl RawFrameSource for CanSocket {
    fn read_raw(&self, buf: &mut [u8; CAN_FRAME_SIZE]) -> io::Result<usize> {
        // SAFETY: the descriptor is owned by `inner` and `buf` is valid for its length
        let ret = unsafe {
            libc::read(
                self.inner.as_raw_fd(),
                buf.as_mut_ptr() as *mut libc::c_void,
                buf.len(),
            )
        };
        if ret < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(ret as usize)
    }

    fn set_filter(&self, ids: &[u32]) -> io::Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        self.inner.set_filters(&exact_filters(ids))
    }
}
