//! canbridge Protocol - Core types for the CAN ingestion pipeline
//!
//! This crate provides the foundational types that flow through the pipeline
//! and the pure decoding functions used at query time:
//! - `CanFrame` / `CanMessage` - Decoded SocketCAN frames
//! - `decode_frame` - 16-byte kernel `struct can_frame` decoder
//! - `classify` - CANopen COB-ID classification (table-driven)
//! - `FieldSchema` - Validated PDO field schema and little-endian decoder
//! - `BusStatistics` - Interface health snapshot produced by the sampler
//!
//! # Design Principles
//!
//! - **Pure leaves**: decoding and classification never allocate on the
//!   error path and never touch I/O
//! - **Validate early**: schemas are checked at construction, so decoding
//!   a payload cannot fail
//! - **Decode at query time**: nothing in this crate runs on the write path
//!   except `decode_frame`

mod canopen;
mod error;
mod frame;
mod pdo;
mod stats;

pub use canopen::{
    COB_ID_RANGES, CanOpenCategory, Classification, CobIdRange, MessageFilter, MessageGroup,
    NodeIdRule, classify,
};
pub use error::{ProtocolError, SchemaError};
pub use frame::{
    CAN_EFF_FLAG, CAN_EFF_MASK, CAN_ERR_FLAG, CAN_FRAME_SIZE, CAN_MAX_DLC, CAN_RTR_FLAG,
    CAN_SFF_MASK, CanFrame, CanMessage, decode_frame,
};
pub use pdo::{
    DecodedField, DecodedFields, FieldSchema, FieldSpec, FieldType, FieldValue, PdoDirection,
    PdoMapping, PdoMappings,
};
pub use stats::{BusState, BusStatistics, LinkState, sample_point_from_segments};

/// Result type for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

// Test modules - only compiled during testing
#[cfg(test)]
mod canopen_test;
#[cfg(test)]
mod frame_test;
