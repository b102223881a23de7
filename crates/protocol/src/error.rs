//! Protocol error types
//!
//! Errors that can occur when decoding frames or building field schemas.

use thiserror::Error;

/// Errors that can occur while decoding a raw CAN frame
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Read returned fewer bytes than a full `struct can_frame`
    #[error("malformed frame: expected {expected} bytes, got {actual}")]
    MalformedFrame { expected: usize, actual: usize },

    /// DLC byte is larger than a classic CAN payload
    #[error("invalid DLC {dlc}: classic CAN carries at most {max} data bytes")]
    InvalidDlc { dlc: u8, max: u8 },
}

impl ProtocolError {
    /// Create a malformed frame error
    #[inline]
    pub fn malformed(actual: usize) -> Self {
        Self::MalformedFrame {
            expected: crate::CAN_FRAME_SIZE,
            actual,
        }
    }

    /// Create an invalid DLC error
    #[inline]
    pub fn invalid_dlc(dlc: u8) -> Self {
        Self::InvalidDlc {
            dlc,
            max: crate::CAN_MAX_DLC,
        }
    }
}

/// Errors raised while building a field schema
///
/// All of these are construction-time failures. A schema that was built
/// successfully never fails to decode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// Field definition does not have the `name:type:offset:length` shape
    #[error("invalid field definition '{0}', expected format: name:type:offset:length")]
    InvalidDefinition(String),

    /// Field name is empty
    #[error("field name must not be empty")]
    EmptyName,

    /// Unknown primitive type name
    #[error("invalid field type '{0}', must be one of: int8, uint8, int16, uint16, int32, uint32")]
    UnknownType(String),

    /// Byte offset is not a number in 0..=7
    #[error("invalid byte offset '{0}', must be 0-7")]
    InvalidOffset(String),

    /// Byte length is not one of 1, 2, 4
    #[error("invalid byte length '{0}', must be 1, 2 or 4")]
    InvalidLength(String),

    /// Byte length is shorter than the width of the primitive type
    #[error("field '{name}' has length {length} but type {field_type} needs {width} bytes")]
    LengthMismatch {
        name: String,
        field_type: &'static str,
        length: u8,
        width: u8,
    },

    /// Field would read past the 8-byte CAN payload
    #[error("field '{name}' exceeds 8-byte CAN data limit (offset {offset} + length {length})")]
    OutOfRange { name: String, offset: u8, length: u8 },
}
