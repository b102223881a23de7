//! `ip -details -statistics link show` parser
//!
//! Line-driven state machine over the text `ip` prints for a CAN link:
//!
//! ```text
//! 3: can0: <NOARP,UP,LOWER_UP,ECHO> mtu 16 qdisc pfifo_fast state UP mode DEFAULT group default qlen 10
//!     link/can  promiscuity 0 minmtu 0 maxmtu 0
//!     can <LOOPBACK> state ERROR-ACTIVE (berr-counter tx 0 rx 0) restart-ms 100
//!       bitrate 500000 sample-point 0.875
//!       tq 125 prop-seg 6 phase-seg1 7 phase-seg2 2 sjw 1 brp 5
//!       re-started bus-errors arbit-lost error-warn error-pass bus-off
//!       0          3          1          2          0          0
//!     RX:  bytes packets errors dropped  missed   mcast
//!         123456     789      0       0       0       0
//! ```
//!
//! Header lines (`RX:`, `RX errors:`, `TX:`, `TX errors:`, `re-started ...`)
//! set the pending column layout; the next line's numbers are assigned to
//! those columns by name, so both the old and the new `iproute2` layouts
//! parse. Every other line is scanned for `key value` pairs.

use canbridge_protocol::{BusState, BusStatistics, LinkState};
use once_cell::sync::Lazy;
use regex::Regex;

use super::StatsError;

/// Interface flags on the first line: `<NOARP,UP,LOWER_UP,ECHO>`
static LINK_FLAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+:\s+\S+:\s+<([^>]*)>").unwrap());

/// CAN controller line: `can <LOOPBACK,LISTEN-ONLY> state ERROR-ACTIVE`
static CAN_STATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^can\s+(?:<([^>]*)>\s+)?state\s+(\S+)").unwrap());

/// `berr-counter tx 0 rx 0`
static BERR_COUNTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"berr-counter\s+tx\s+(\d+)\s+rx\s+(\d+)").unwrap());

/// Counter block announced by a header line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Block {
    Rx,
    RxErrors,
    Tx,
    TxErrors,
    Controller,
}

/// Parse one interface's `ip -details -statistics link show` output
///
/// `timestamp` and `interface` are left for the caller to stamp.
///
/// # Errors
///
/// Returns [`StatsError::Parse`] when the output has no link header line.
pub fn parse_ip_link(output: &str) -> Result<BusStatistics, StatsError> {
    let mut lines = output.lines().map(str::trim).filter(|l| !l.is_empty());

    let first = lines
        .next()
        .ok_or_else(|| StatsError::Parse("empty output".into()))?;
    let flags = LINK_FLAGS
        .captures(first)
        .and_then(|c| c.get(1))
        .ok_or_else(|| StatsError::Parse(format!("missing link header: '{}'", first)))?;

    let mut stats = BusStatistics::default();
    if flags.as_str().split(',').any(|f| f == "UP") {
        stats.link_state = LinkState::Up;
    }
    scan_key_values(&mut stats, first);

    let mut pending: Option<(Block, Vec<&str>)> = None;

    for line in lines {
        if let Some((block, columns)) = pending.take() {
            assign_counters(&mut stats, block, &columns, line);
            continue;
        }

        if let Some(header) = counter_header(line) {
            pending = Some(header);
            continue;
        }

        if let Some(caps) = CAN_STATE.captures(line) {
            if let Some(modes) = caps.get(1) {
                stats.controller_mode = modes.as_str().to_string();
            }
            if let Some(state) = caps.get(2) {
                stats.bus_state = BusState::from_name(state.as_str());
            }
        }

        if let Some(caps) = BERR_COUNTER.captures(line) {
            stats.tx_error_counter = caps[1].parse().unwrap_or(0);
            stats.rx_error_counter = caps[2].parse().unwrap_or(0);
        }

        scan_key_values(&mut stats, line);
    }

    stats.derive_sample_point();
    Ok(stats)
}

/// Recognize a counter header and split out its column names
fn counter_header(line: &str) -> Option<(Block, Vec<&str>)> {
    let (block, columns) = if let Some(rest) = line.strip_prefix("RX errors:") {
        (Block::RxErrors, rest)
    } else if let Some(rest) = line.strip_prefix("TX errors:") {
        (Block::TxErrors, rest)
    } else if let Some(rest) = line.strip_prefix("RX:") {
        (Block::Rx, rest)
    } else if let Some(rest) = line.strip_prefix("TX:") {
        (Block::Tx, rest)
    } else if line.starts_with("re-started") {
        (Block::Controller, line)
    } else {
        return None;
    };

    Some((block, columns.split_whitespace().collect()))
}

/// Assign a value line to the pending columns, by position
///
/// Trailing tokens past the last column (`ip` appends `numtxqueues ...` to
/// the controller counter line) are ignored.
fn assign_counters(stats: &mut BusStatistics, block: Block, columns: &[&str], line: &str) {
    for (column, token) in columns.iter().zip(line.split_whitespace()) {
        let Ok(value) = token.parse::<u64>() else {
            continue;
        };
        if let Some(field) = counter_field(stats, block, column) {
            *field = value;
        }
    }
}

fn counter_field<'a>(
    stats: &'a mut BusStatistics,
    block: Block,
    column: &str,
) -> Option<&'a mut u64> {
    use Block::*;

    let field = match (block, column) {
        (Rx, "bytes") => &mut stats.rx_bytes,
        (Rx, "packets") => &mut stats.rx_packets,
        (Rx, "errors") => &mut stats.rx_errors,
        (Rx, "dropped") => &mut stats.rx_dropped,
        (Rx, "mcast") => &mut stats.rx_multicast,
        (Rx | RxErrors, "overrun") => &mut stats.rx_overrun,
        (Rx | RxErrors, "missed") => &mut stats.rx_missed_errors,
        (RxErrors, "length") => &mut stats.rx_length_errors,
        (RxErrors, "crc") => &mut stats.rx_crc_errors,
        (RxErrors, "frame") => &mut stats.rx_frame_errors,
        (RxErrors, "fifo") => &mut stats.rx_fifo_errors,

        (Tx, "bytes") => &mut stats.tx_bytes,
        (Tx, "packets") => &mut stats.tx_packets,
        (Tx, "errors") => &mut stats.tx_errors,
        (Tx, "dropped") => &mut stats.tx_dropped,
        (Tx | TxErrors, "carrier") => &mut stats.tx_carrier_errors,
        (Tx, "collsns") => &mut stats.tx_collisions,
        (TxErrors, "aborted") => &mut stats.tx_aborted_errors,
        (TxErrors, "fifo") => &mut stats.tx_fifo_errors,
        (TxErrors, "window") => &mut stats.tx_window_errors,
        (TxErrors, "heartbt" | "heartbeat") => &mut stats.tx_heartbeat_errors,

        (Controller, "re-started") => &mut stats.bus_off_restarts,
        (Controller, "bus-errors") => &mut stats.bus_errors,
        (Controller, "arbit-lost") => &mut stats.arbitration_lost,
        (Controller, "error-warn") => &mut stats.error_warning_transitions,
        (Controller, "error-pass") => &mut stats.error_passive_transitions,
        (Controller, "bus-off") => &mut stats.bus_off_transitions,

        _ => return None,
    };
    Some(field)
}

/// Pick up `key value` pairs for link and bit-timing parameters
///
/// Values that are not plain numbers are skipped, so the controller's
/// timing-constant line (`sjw 1..4 brp 1..64`) never overwrites the
/// configured values.
fn scan_key_values(stats: &mut BusStatistics, line: &str) {
    let tokens: Vec<&str> = line.split_whitespace().collect();

    for pair in tokens.windows(2) {
        let (key, value) = (pair[0], pair[1]);

        if key == "sample-point" {
            if let Ok(v) = value.parse::<f64>() {
                stats.sample_point = v;
            }
            continue;
        }

        let slot = match key {
            "mtu" => &mut stats.mtu,
            "qlen" => &mut stats.queue_length,
            "bitrate" => &mut stats.bitrate,
            "tq" => &mut stats.time_quantum,
            "prop-seg" => &mut stats.prop_seg,
            "phase-seg1" => &mut stats.phase_seg1,
            "phase-seg2" => &mut stats.phase_seg2,
            "sjw" => &mut stats.sjw,
            "brp" => &mut stats.brp,
            "restart-ms" => &mut stats.restart_ms,
            _ => continue,
        };
        if let Ok(v) = value.parse::<u32>() {
            *slot = v;
        }
    }
}
