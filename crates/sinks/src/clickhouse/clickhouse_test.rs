//! Tests for the ClickHouse row mapping and DDL

use canbridge_config::ClickHouseConfig;
use canbridge_protocol::{BusState, BusStatistics, CAN_EFF_FLAG, CanFrame, CanMessage, LinkState};
use chrono::{TimeZone, Utc};

use super::*;
use crate::batching::BatchWriter;

fn message(can_id: u32, payload: &[u8]) -> CanMessage {
    CanMessage {
        frame: CanFrame::new(can_id, payload),
        timestamp: Utc.timestamp_opt(1_700_000_000, 123_456_000).unwrap(),
        interface: "can0".into(),
    }
}

// =============================================================================
// Frame rows
// =============================================================================

#[test]
fn test_frame_row_fields() {
    let row = message(0x181, &[0x01, 0x02, 0x03]).to_row();

    assert_eq!(row.timestamp, 1_700_000_000_123_456);
    assert_eq!(row.interface, "can0");
    assert_eq!(row.can_id, 0x181);
    assert_eq!(row.dlc, 3);
    assert_eq!(row.data, vec![0x01, 0x02, 0x03]);
}

#[test]
fn test_frame_row_keeps_flag_bits() {
    let row = message(CAN_EFF_FLAG | 0x18DA_F110, &[0xAA; 8]).to_row();

    assert_eq!(row.can_id, CAN_EFF_FLAG | 0x18DA_F110);
    assert_eq!(row.data.len(), 8);
}

#[test]
fn test_frame_row_empty_payload() {
    let row = message(0x080, &[]).to_row();
    assert_eq!(row.dlc, 0);
    assert!(row.data.is_empty());
}

// =============================================================================
// Stats rows
// =============================================================================

#[test]
fn test_stats_row_fields() {
    let stats = BusStatistics {
        timestamp: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        interface: "can1".into(),
        link_state: LinkState::Up,
        bitrate: 500_000,
        sample_point: 0.875,
        controller_mode: "LISTEN-ONLY".into(),
        bus_state: BusState::ErrorPassive,
        tx_error_counter: 128,
        rx_packets: 42,
        bus_off_transitions: 2,
        ..Default::default()
    };
    let row = stats.to_row();

    assert_eq!(row.timestamp, 1_700_000_000_000_000);
    assert_eq!(row.interface, "can1");
    assert_eq!(row.link_state, "UP");
    assert_eq!(row.bitrate, 500_000);
    assert_eq!(row.sample_point, 0.875);
    assert_eq!(row.controller_mode, "LISTEN-ONLY");
    assert_eq!(row.bus_state, "ERROR-PASSIVE");
    assert_eq!(row.tx_error_counter, 128);
    assert_eq!(row.rx_packets, 42);
    assert_eq!(row.bus_off_transitions, 2);
}

#[test]
fn test_stats_row_unknown_state_keeps_code() {
    let stats = BusStatistics {
        bus_state: BusState::Unknown(9),
        ..Default::default()
    };
    assert_eq!(stats.to_row().bus_state, "UNKNOWN(9)");
}

// =============================================================================
// DDL
// =============================================================================

#[test]
fn test_frames_ddl() {
    let sql = frames_table_sql("can_messages");

    assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS can_messages"));
    assert!(sql.contains("timestamp DateTime64(6)"));
    assert!(sql.contains("can_id UInt32"));
    assert!(sql.contains("data Array(UInt8)"));
    assert!(sql.contains("ORDER BY (timestamp, can_id)"));
    assert!(sql.contains("PARTITION BY toYYYYMMDD(timestamp)"));
    assert!(sql.contains("INTERVAL 1 MONTH"));
    assert_eq!(sql, CanMessage::create_table_sql("can_messages"));
}

#[test]
fn test_stats_ddl_has_every_column() {
    let sql = stats_table_sql("can_interface_stats");

    assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS can_interface_stats"));
    assert!(sql.contains("ORDER BY (interface, timestamp)"));
    for column in [
        "link_state",
        "sample_point Float64",
        "controller_mode",
        "bus_state",
        "rx_missed_errors",
        "tx_heartbeat_errors",
        "arbitration_lost",
        "bus_off_transitions UInt64",
    ] {
        assert!(sql.contains(column), "missing {column}");
    }
    assert_eq!(sql, BusStatistics::create_table_sql("can_interface_stats"));
}

// =============================================================================
// Writer
// =============================================================================

#[tokio::test]
async fn test_writer_identity_and_empty_batch() {
    let client = build_client(&ClickHouseConfig::default());
    let mut writer = ClickHouseWriter::<CanMessage>::new(client, "can_messages");

    assert_eq!(writer.table(), "can_messages");
    assert_eq!(writer.writer_type(), "clickhouse");

    // Nothing to insert means no request is made
    let empty: &[CanMessage] = &[];
    writer.write_batch(empty).await.unwrap();
}
