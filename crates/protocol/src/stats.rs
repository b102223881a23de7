//! Interface health snapshot
//!
//! `BusStatistics` is the flat record produced by the statistics sampler,
//! one per tick per interface. Counters are cumulative as reported by the
//! kernel; nothing here computes deltas.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

/// CAN controller error state
///
/// Ordinals follow the kernel's `enum can_state`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BusState {
    #[default]
    ErrorActive,
    ErrorWarning,
    ErrorPassive,
    BusOff,
    Stopped,
    Sleeping,
    /// Ordinal outside the known table
    Unknown(u8),
}

/// Ordinal table shared by `from_code` and `from_name`
const BUS_STATE_NAMES: [&str; 6] = [
    "ERROR-ACTIVE",
    "ERROR-WARNING",
    "ERROR-PASSIVE",
    "BUS-OFF",
    "STOPPED",
    "SLEEPING",
];

impl BusState {
    /// Map a kernel ordinal
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => Self::ErrorActive,
            1 => Self::ErrorWarning,
            2 => Self::ErrorPassive,
            3 => Self::BusOff,
            4 => Self::Stopped,
            5 => Self::Sleeping,
            other => Self::Unknown(other),
        }
    }

    /// Map the textual name printed by `ip` (e.g. `ERROR-ACTIVE`)
    ///
    /// Unrecognized names become `Unknown(255)`.
    pub fn from_name(name: &str) -> Self {
        BUS_STATE_NAMES
            .iter()
            .position(|n| n.eq_ignore_ascii_case(name.trim()))
            .map(|code| Self::from_code(code as u8))
            .unwrap_or(Self::Unknown(u8::MAX))
    }

    /// Kernel ordinal
    pub fn code(&self) -> u8 {
        match self {
            Self::ErrorActive => 0,
            Self::ErrorWarning => 1,
            Self::ErrorPassive => 2,
            Self::BusOff => 3,
            Self::Stopped => 4,
            Self::Sleeping => 5,
            Self::Unknown(code) => *code,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown(_) => "UNKNOWN",
            known => BUS_STATE_NAMES[usize::from(known.code())],
        }
    }
}

impl fmt::Display for BusState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(code) => write!(f, "UNKNOWN({})", code),
            known => f.write_str(known.as_str()),
        }
    }
}

impl Serialize for BusState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Administrative link state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LinkState {
    Up,
    #[default]
    Down,
}

impl LinkState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "UP",
            Self::Down => "DOWN",
        }
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sample point as a fraction of the bit time, derived from segment lengths
///
/// Returns `None` when no segment is known.
pub fn sample_point_from_segments(prop_seg: u32, phase_seg1: u32, phase_seg2: u32) -> Option<f64> {
    if prop_seg == 0 && phase_seg1 == 0 && phase_seg2 == 0 {
        return None;
    }
    let before = 1.0 + f64::from(prop_seg) + f64::from(phase_seg1);
    Some(before / (before + f64::from(phase_seg2)))
}

/// Snapshot of one CAN interface
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BusStatistics {
    pub timestamp: DateTime<Utc>,
    pub interface: String,

    // Link
    pub link_state: LinkState,
    pub mtu: u32,
    pub queue_length: u32,

    // Bit timing
    pub bitrate: u32,
    /// Fraction of the bit time (0.875 = 87.5%)
    pub sample_point: f64,
    /// Time quantum in nanoseconds
    pub time_quantum: u32,
    pub prop_seg: u32,
    pub phase_seg1: u32,
    pub phase_seg2: u32,
    pub sjw: u32,
    pub brp: u32,
    pub restart_ms: u32,

    /// Controller mode flags (e.g. "LOOPBACK", "LISTEN-ONLY"), empty when normal
    pub controller_mode: String,

    // Error state
    pub bus_state: BusState,
    pub tx_error_counter: u32,
    pub rx_error_counter: u32,

    // RX counters
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

    // TX counters
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

    // CAN device counters
    pub bus_off_restarts: u64,
    pub bus_errors: u64,
    pub arbitration_lost: u64,
    pub error_warning_transitions: u64,
    pub error_passive_transitions: u64,
    pub bus_off_transitions: u64,
}

impl BusStatistics {
    /// Empty snapshot for an interface, stamped now
    pub fn new(interface: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            interface: interface.into(),
            ..Default::default()
        }
    }

    /// Fill `sample_point` from the segments when it was not reported
    pub fn derive_sample_point(&mut self) {
        if self.sample_point > 0.0 {
            return;
        }
        self.sample_point =
            sample_point_from_segments(self.prop_seg, self.phase_seg1, self.phase_seg2)
                .unwrap_or(0.0);
    }

    /// Sample point as a percentage
    pub fn sample_point_percent(&self) -> f64 {
        self.sample_point * 100.0
    }
}
