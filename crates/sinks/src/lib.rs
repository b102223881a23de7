//! canbridge - Sinks
//!
//! Batched output for CAN frames and interface statistics.
//!
//! # Architecture
//!
//! Producers push records through a non-blocking [`batching::SinkHandle`].
//! Each sink task accumulates records and hands full (or aged) batches to a
//! [`batching::BatchWriter`].
//!
//! ```text
//! [Frame Reader] --CanMessage-->     [SinkHandle] --> [BatchingSink] --> [ClickHouseWriter]
//! [Stats Sampler] --BusStatistics--> [SinkHandle] --> [BatchingSink] --> [ClickHouseWriter]
//! ```
//!
//! # Available Writers
//!
//! | Writer | Purpose |
//! |--------|---------|
//! | `clickhouse` | One `INSERT` per batch into a MergeTree table |
//! | `null` | Discard everything (benchmarking, dry runs) |

// =============================================================================
// Core
// =============================================================================

/// Generic batching sink with size and time triggers
pub mod batching;

/// Sink error types
pub mod error;

// =============================================================================
// Writers
// =============================================================================

/// ClickHouse writer and table definitions
pub mod clickhouse;

/// Null writer - discards every batch
pub mod null;

// =============================================================================
// Utilities
// =============================================================================

pub mod util;

pub use batching::{
    Batch, BatchWriter, BatchingSink, BatchingSinkConfig, BatchingSinkMetricsHandle, RunningSink,
    SinkHandle,
};
pub use error::SinkError;
