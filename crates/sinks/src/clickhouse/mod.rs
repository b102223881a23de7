//! ClickHouse writer
//!
//! Frames and interface statistics each go to their own MergeTree table. A
//! [`ClickHouseWriter`] turns every batch handed over by the batching sink
//! into one RowBinary `INSERT`.
//!
//! # Tables
//!
//! | Table (default name) | Record | Order key |
//! |----------------------|--------|-----------|
//! | can_messages | `CanMessage` | (timestamp, can_id) |
//! | can_interface_stats | `BusStatistics` | (interface, timestamp) |

mod client;
mod tables;
mod writer;

pub use client::build_client;
pub use tables::{FrameRow, StatsRow, TableRecord, frames_table_sql, stats_table_sql};
pub use writer::ClickHouseWriter;

#[cfg(test)]
#[path = "clickhouse_test.rs"]
mod clickhouse_test;
