//! CAN frame types and the kernel frame decoder
//!
//! SocketCAN delivers classic frames as a 16-byte `struct can_frame`:
//!
//! ```text
//! offset  size  field
//! 0       4     can_id   (little-endian on all supported hosts, flags in bits 29-31)
//! 4       1     len      (DLC, 0..=8)
//! 5       3     padding / reserved
//! 8       8     data
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::ProtocolError;

/// Size of a classic `struct can_frame` in bytes
pub const CAN_FRAME_SIZE: usize = 16;

/// Maximum data length of a classic CAN frame
pub const CAN_MAX_DLC: u8 = 8;

/// Extended frame format flag (29-bit identifier)
pub const CAN_EFF_FLAG: u32 = 0x8000_0000;

/// Remote transmission request flag
pub const CAN_RTR_FLAG: u32 = 0x4000_0000;

/// Error message frame flag
pub const CAN_ERR_FLAG: u32 = 0x2000_0000;

/// Standard frame format mask (11-bit identifier)
pub const CAN_SFF_MASK: u32 = 0x0000_07FF;

/// Extended frame format mask (29-bit identifier)
pub const CAN_EFF_MASK: u32 = 0x1FFF_FFFF;

const DLC_OFFSET: usize = 4;
const DATA_OFFSET: usize = 8;

/// A classic CAN 2.0 frame as read from the socket
///
/// `can_id` is the raw 32-bit word, flag bits included, so that a decoded
/// frame re-encodes to the exact bytes it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct CanFrame {
    /// Raw identifier word (identifier plus EFF/RTR/ERR flags)
    pub can_id: u32,
    /// Data length code (0..=8)
    pub dlc: u8,
    /// Payload; bytes past `dlc` are whatever the kernel delivered (normally zero)
    pub data: [u8; 8],
}

impl CanFrame {
    /// Build a frame from an identifier word and up to 8 payload bytes
    ///
    /// Extra bytes beyond 8 are ignored.
    pub fn new(can_id: u32, payload: &[u8]) -> Self {
        let len = payload.len().min(CAN_MAX_DLC as usize);
        let mut data = [0u8; 8];
        data[..len].copy_from_slice(&payload[..len]);
        Self {
            can_id,
            dlc: len as u8,
            data,
        }
    }

    /// Identifier with the flag bits removed (11-bit or 29-bit)
    #[inline]
    pub fn identifier(&self) -> u32 {
        if self.is_extended() {
            self.can_id & CAN_EFF_MASK
        } else {
            self.can_id & CAN_SFF_MASK
        }
    }

    /// True for 29-bit extended frames
    #[inline]
    pub fn is_extended(&self) -> bool {
        self.can_id & CAN_EFF_FLAG != 0
    }

    /// True for remote transmission requests
    #[inline]
    pub fn is_remote(&self) -> bool {
        self.can_id & CAN_RTR_FLAG != 0
    }

    /// True for error frames generated by the controller
    #[inline]
    pub fn is_error(&self) -> bool {
        self.can_id & CAN_ERR_FLAG != 0
    }

    /// Valid payload bytes (`data[..dlc]`)
    #[inline]
    pub fn payload(&self) -> &[u8] {
        let len = usize::from(self.dlc.min(CAN_MAX_DLC));
        &self.data[..len]
    }

    /// Encode back into a kernel `struct can_frame`
    pub fn encode(&self) -> [u8; CAN_FRAME_SIZE] {
        let mut buf = [0u8; CAN_FRAME_SIZE];
        buf[..4].copy_from_slice(&self.can_id.to_le_bytes());
        buf[DLC_OFFSET] = self.dlc;
        buf[DATA_OFFSET..].copy_from_slice(&self.data);
        buf
    }

    /// Payload formatted as space-separated upper-case hex
    pub fn data_hex(&self) -> String {
        self.payload()
            .iter()
            .map(|b| format!("{:02X}", b))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl std::fmt::Display for CanFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_extended() {
            write!(f, "{:08X} [{}] {}", self.identifier(), self.dlc, self.data_hex())
        } else {
            write!(f, "{:03X} [{}] {}", self.identifier(), self.dlc, self.data_hex())
        }
    }
}

/// Decode a kernel `struct can_frame`
///
/// # Errors
///
/// - [`ProtocolError::MalformedFrame`] if fewer than 16 bytes were read
/// - [`ProtocolError::InvalidDlc`] if the length byte exceeds 8
pub fn decode_frame(buf: &[u8]) -> Result<CanFrame, ProtocolError> {
    if buf.len() < CAN_FRAME_SIZE {
        return Err(ProtocolError::malformed(buf.len()));
    }

    let can_id = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
    let dlc = buf[DLC_OFFSET];
    if dlc > CAN_MAX_DLC {
        return Err(ProtocolError::invalid_dlc(dlc));
    }

    let mut data = [0u8; 8];
    data.copy_from_slice(&buf[DATA_OFFSET..CAN_FRAME_SIZE]);

    Ok(CanFrame { can_id, dlc, data })
}

/// A frame stamped with receive time and source interface
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanMessage {
    /// Decoded frame
    pub frame: CanFrame,
    /// Wall-clock receive time
    pub timestamp: DateTime<Utc>,
    /// Interface the frame was read from (e.g. "can0")
    pub interface: String,
}

impl CanMessage {
    /// Stamp a frame with the current time
    pub fn now(frame: CanFrame, interface: impl Into<String>) -> Self {
        Self {
            frame,
            timestamp: Utc::now(),
            interface: interface.into(),
        }
    }
}
