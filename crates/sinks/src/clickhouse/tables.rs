//! Table row types and DDL
//!
//! Timestamps are stored as microseconds since the epoch, which is the
//! RowBinary encoding of `DateTime64(6)`.

use canbridge_protocol::{BusStatistics, CanMessage};
use clickhouse::Row;
use serde::Serialize;

/// A record type that maps onto one ClickHouse table
pub trait TableRecord: Send + Sync + 'static {
    /// Wire row inserted for each record
    type Row: Row + Serialize + Send + Sync + 'static;

    /// Convert the record into its table row
    fn to_row(&self) -> Self::Row;

    /// `CREATE TABLE IF NOT EXISTS` statement for `table`
    fn create_table_sql(table: &str) -> String;
}

// =============================================================================
// Frames
// =============================================================================

/// One received frame
///
/// `can_id` is the raw identifier word, flag bits included, so extended and
/// remote frames stay distinguishable. `data` holds the first `dlc` bytes.
#[derive(Debug, Clone, PartialEq, Row, Serialize)]
pub struct FrameRow {
    /// Receive time in microseconds since epoch
    pub timestamp: i64,
    pub interface: String,
    pub can_id: u32,
    pub dlc: u8,
    pub data: Vec<u8>,
}

impl TableRecord for CanMessage {
    type Row = FrameRow;

    fn to_row(&self) -> FrameRow {
        FrameRow {
            timestamp: self.timestamp.timestamp_micros(),
            interface: self.interface.clone(),
            can_id: self.frame.can_id,
            dlc: self.frame.dlc,
            data: self.frame.payload().to_vec(),
        }
    }

    fn create_table_sql(table: &str) -> String {
        frames_table_sql(table)
    }
}

/// DDL for the frames table
pub fn frames_table_sql(table: &str) -> String {
    format!(
        r#"CREATE TABLE IF NOT EXISTS {table}
(
    timestamp DateTime64(6),
    interface LowCardinality(String),
    can_id UInt32,
    dlc UInt8,
    data Array(UInt8)
)
ENGINE = MergeTree()
PARTITION BY toYYYYMMDD(timestamp)
ORDER BY (timestamp, can_id)
TTL toDateTime(timestamp) + INTERVAL 1 MONTH
SETTINGS index_granularity = 8192"#
    )
}

// =============================================================================
// Interface statistics
// =============================================================================

/// One statistics snapshot, one column per field
#[derive(Debug, Clone, PartialEq, Row, Serialize)]
pub struct StatsRow {
    /// Sample time in microseconds since epoch
    pub timestamp: i64,
    pub interface: String,

    pub link_state: String,
    pub mtu: u32,
    pub queue_length: u32,

    pub bitrate: u32,
    pub sample_point: f64,
    pub time_quantum: u32,
    pub prop_seg: u32,
    pub phase_seg1: u32,
    pub phase_seg2: u32,
    pub sjw: u32,
    pub brp: u32,
    pub restart_ms: u32,

    pub controller_mode: String,
    pub bus_state: String,
    pub tx_error_counter: u32,
    pub rx_error_counter: u32,

    pub rx_bytes: u64,
    pub rx_packets: u64,
    pub rx_errors: u64,
    pub rx_dropped: u64,
    pub rx_overrun: u64,
    pub rx_multicast: u64,
    pub rx_length_errors: u64,
    pub rx_crc_errors: u64,
    pub rx_frame_errors: u64,
    pub rx_fifo_errors: u64,
    pub rx_missed_errors: u64,

    pub tx_bytes: u64,
    pub tx_packets: u64,
    pub tx_errors: u64,
    pub tx_dropped: u64,
    pub tx_carrier_errors: u64,
    pub tx_collisions: u64,
    pub tx_aborted_errors: u64,
    pub tx_fifo_errors: u64,
    pub tx_window_errors: u64,
    pub tx_heartbeat_errors: u64,

    pub bus_off_restarts: u64,
    pub bus_errors: u64,
    pub arbitration_lost: u64,
    pub error_warning_transitions: u64,
    pub error_passive_transitions: u64,
    pub bus_off_transitions: u64,
}

impl TableRecord for BusStatistics {
    type Row = StatsRow;

    fn to_row(&self) -> StatsRow {
        StatsRow {
            timestamp: self.timestamp.timestamp_micros(),
            interface: self.interface.clone(),
            link_state: self.link_state.as_str().to_string(),
            mtu: self.mtu,
            queue_length: self.queue_length,
            bitrate: self.bitrate,
            sample_point: self.sample_point,
            time_quantum: self.time_quantum,
            prop_seg: self.prop_seg,
            phase_seg1: self.phase_seg1,
            phase_seg2: self.phase_seg2,
            sjw: self.sjw,
            brp: self.brp,
            restart_ms: self.restart_ms,
            controller_mode: self.controller_mode.clone(),
            bus_state: self.bus_state.to_string(),
            tx_error_counter: self.tx_error_counter,
            rx_error_counter: self.rx_error_counter,
            rx_bytes: self.rx_bytes,
            rx_packets: self.rx_packets,
            rx_errors: self.rx_errors,
            rx_dropped: self.rx_dropped,
            rx_overrun: self.rx_overrun,
            rx_multicast: self.rx_multicast,
            rx_length_errors: self.rx_length_errors,
            rx_crc_errors: self.rx_crc_errors,
            rx_frame_errors: self.rx_frame_errors,
            rx_fifo_errors: self.rx_fifo_errors,
            rx_missed_errors: self.rx_missed_errors,
            tx_bytes: self.tx_bytes,
            tx_packets: self.tx_packets,
            tx_errors: self.tx_errors,
            tx_dropped: self.tx_dropped,
            tx_carrier_errors: self.tx_carrier_errors,
            tx_collisions: self.tx_collisions,
            tx_aborted_errors: self.tx_aborted_errors,
            tx_fifo_errors: self.tx_fifo_errors,
            tx_window_errors: self.tx_window_errors,
            tx_heartbeat_errors: self.tx_heartbeat_errors,
            bus_off_restarts: self.bus_off_restarts,
            bus_errors: self.bus_errors,
            arbitration_lost: self.arbitration_lost,
            error_warning_transitions: self.error_warning_transitions,
            error_passive_transitions: self.error_passive_transitions,
            bus_off_transitions: self.bus_off_transitions,
        }
    }

    fn create_table_sql(table: &str) -> String {
        stats_table_sql(table)
    }
}

/// DDL for the interface statistics table
pub fn stats_table_sql(table: &str) -> String {
    format!(
        r#"CREATE TABLE IF NOT EXISTS {table}
(
    timestamp DateTime64(6),
    interface LowCardinality(String),

    link_state LowCardinality(String),
    mtu UInt32,
    queue_length UInt32,

    bitrate UInt32,
    sample_point Float64,
    time_quantum UInt32,
    prop_seg UInt32,
    phase_seg1 UInt32,
    phase_seg2 UInt32,
    sjw UInt32,
    brp UInt32,
    restart_ms UInt32,

    controller_mode String,
    bus_state LowCardinality(String),
    tx_error_counter UInt32,
    rx_error_counter UInt32,

    rx_bytes UInt64,
    rx_packets UInt64,
    rx_errors UInt64,
    rx_dropped UInt64,
    rx_overrun UInt64,
    rx_multicast UInt64,
    rx_length_errors UInt64,
    rx_crc_errors UInt64,
    rx_frame_errors UInt64,
    rx_fifo_errors UInt64,
    rx_missed_errors UInt64,

    tx_bytes UInt64,
    tx_packets UInt64,
    tx_errors UInt64,
    tx_dropped UInt64,
    tx_carrier_errors UInt64,
    tx_collisions UInt64,
    tx_aborted_errors UInt64,
    tx_fifo_errors UInt64,
    tx_window_errors UInt64,
    tx_heartbeat_errors UInt64,

    bus_off_restarts UInt64,
    bus_errors UInt64,
    arbitration_lost UInt64,
    error_warning_transitions UInt64,
    error_passive_transitions UInt64,
    bus_off_transitions UInt64
)
ENGINE = MergeTree()
PARTITION BY toYYYYMMDD(timestamp)
ORDER BY (interface, timestamp)
SETTINGS index_granularity = 8192"#
    )
}
