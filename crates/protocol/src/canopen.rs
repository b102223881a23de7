//! CANopen COB-ID classification
//!
//! CANopen assigns meaning to fixed identifier ranges. Classification is a
//! linear scan over [`COB_ID_RANGES`], evaluated in order, so every range
//! boundary can be tested mechanically against the table itself.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

/// CANopen message category derived from a COB-ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanOpenCategory {
    /// Network management (0x000)
    Nmt,
    /// Synchronization (0x080)
    Sync,
    /// Emergency (0x081-0x0FF)
    Emcy,
    /// Transmit PDO 1-4
    Tpdo(u8),
    /// Receive PDO 1-4
    Rpdo(u8),
    /// SDO client → server (0x600-0x67F)
    SdoRequest,
    /// SDO server → client (0x580-0x5FF)
    SdoResponse,
    /// Heartbeat / node guarding (0x700-0x77F)
    Heartbeat,
    /// Not a predefined CANopen identifier
    Unknown,
}

impl CanOpenCategory {
    /// Canonical upper-case label
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nmt => "NMT",
            Self::Sync => "SYNC",
            Self::Emcy => "EMCY",
            Self::Tpdo(1) => "TPDO1",
            Self::Tpdo(2) => "TPDO2",
            Self::Tpdo(3) => "TPDO3",
            Self::Tpdo(4) => "TPDO4",
            Self::Rpdo(1) => "RPDO1",
            Self::Rpdo(2) => "RPDO2",
            Self::Rpdo(3) => "RPDO3",
            Self::Rpdo(4) => "RPDO4",
            Self::Tpdo(_) | Self::Rpdo(_) => "PDO",
            Self::SdoRequest => "SDO_REQUEST",
            Self::SdoResponse => "SDO_RESPONSE",
            Self::Heartbeat => "HEARTBEAT",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Coarse message group used by query filters
    pub fn group(&self) -> Option<MessageGroup> {
        match self {
            Self::Nmt => Some(MessageGroup::Nmt),
            Self::Sync => Some(MessageGroup::Sync),
            Self::Emcy => Some(MessageGroup::Emcy),
            Self::Tpdo(_) | Self::Rpdo(_) => Some(MessageGroup::Pdo),
            Self::SdoRequest | Self::SdoResponse => Some(MessageGroup::Sdo),
            Self::Heartbeat => Some(MessageGroup::Heartbeat),
            Self::Unknown => None,
        }
    }

    /// PDO number (1-4) for TPDO/RPDO categories
    pub fn pdo_number(&self) -> Option<u8> {
        match self {
            Self::Tpdo(n) | Self::Rpdo(n) => Some(*n),
            _ => None,
        }
    }

    /// Whether the category carries a node number
    pub fn has_node_id(&self) -> bool {
        !matches!(self, Self::Nmt | Self::Sync | Self::Unknown)
    }
}

impl fmt::Display for CanOpenCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for CanOpenCategory {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// How the node number is derived from an identifier inside a range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeIdRule {
    /// Broadcast object, node is always 0
    Broadcast,
    /// `id - lower`
    Offset,
    /// `id - lower + 1`
    OffsetPlusOne,
}

/// One row of the COB-ID classification table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CobIdRange {
    /// First identifier in the range (inclusive)
    pub lower: u32,
    /// Last identifier in the range (inclusive)
    pub upper: u32,
    /// Category assigned to the range
    pub category: CanOpenCategory,
    /// Node number formula
    pub node_id: NodeIdRule,
}

impl CobIdRange {
    const fn new(lower: u32, upper: u32, category: CanOpenCategory, node_id: NodeIdRule) -> Self {
        Self {
            lower,
            upper,
            category,
            node_id,
        }
    }

    /// Whether the identifier falls inside this range
    #[inline]
    pub fn contains(&self, identifier: u32) -> bool {
        identifier >= self.lower && identifier <= self.upper
    }

    /// Node number for an identifier inside this range
    #[inline]
    fn node_for(&self, identifier: u32) -> u8 {
        let node = match self.node_id {
            NodeIdRule::Broadcast => 0,
            NodeIdRule::Offset => identifier - self.lower,
            NodeIdRule::OffsetPlusOne => identifier - self.lower + 1,
        };
        node as u8
    }
}

/// Predefined connection set, evaluated top to bottom
///
/// Identifiers matching no row classify as [`CanOpenCategory::Unknown`].
pub const COB_ID_RANGES: [CobIdRange; 14] = [
    CobIdRange::new(0x000, 0x000, CanOpenCategory::Nmt, NodeIdRule::Broadcast),
    CobIdRange::new(0x080, 0x080, CanOpenCategory::Sync, NodeIdRule::Broadcast),
    CobIdRange::new(0x081, 0x0FF, CanOpenCategory::Emcy, NodeIdRule::Offset),
    CobIdRange::new(0x180, 0x1FF, CanOpenCategory::Tpdo(1), NodeIdRule::OffsetPlusOne),
    CobIdRange::new(0x200, 0x27F, CanOpenCategory::Rpdo(1), NodeIdRule::OffsetPlusOne),
    CobIdRange::new(0x280, 0x2FF, CanOpenCategory::Tpdo(2), NodeIdRule::OffsetPlusOne),
    CobIdRange::new(0x300, 0x37F, CanOpenCategory::Rpdo(2), NodeIdRule::OffsetPlusOne),
    CobIdRange::new(0x380, 0x3FF, CanOpenCategory::Tpdo(3), NodeIdRule::OffsetPlusOne),
    CobIdRange::new(0x400, 0x47F, CanOpenCategory::Rpdo(3), NodeIdRule::OffsetPlusOne),
    CobIdRange::new(0x480, 0x4FF, CanOpenCategory::Tpdo(4), NodeIdRule::OffsetPlusOne),
    CobIdRange::new(0x500, 0x57F, CanOpenCategory::Rpdo(4), NodeIdRule::OffsetPlusOne),
    CobIdRange::new(0x580, 0x5FF, CanOpenCategory::SdoResponse, NodeIdRule::OffsetPlusOne),
    CobIdRange::new(0x600, 0x67F, CanOpenCategory::SdoRequest, NodeIdRule::OffsetPlusOne),
    CobIdRange::new(0x700, 0x77F, CanOpenCategory::Heartbeat, NodeIdRule::Offset),
];

/// Result of classifying an identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Classification {
    /// Message category
    pub category: CanOpenCategory,
    /// Node number (0 for broadcast objects and unknown identifiers)
    pub node_id: u8,
}

impl Classification {
    /// Classification for identifiers outside every CANopen range
    pub const UNKNOWN: Self = Self {
        category: CanOpenCategory::Unknown,
        node_id: 0,
    };
}

/// Classify a CAN identifier into a CANopen category and node number
pub fn classify(identifier: u32) -> Classification {
    COB_ID_RANGES
        .iter()
        .find(|range| range.contains(identifier))
        .map(|range| Classification {
            category: range.category,
            node_id: range.node_for(identifier),
        })
        .unwrap_or(Classification::UNKNOWN)
}

/// Coarse message group accepted by query filters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageGroup {
    Nmt,
    Sync,
    Emcy,
    Pdo,
    Sdo,
    Heartbeat,
}

impl MessageGroup {
    /// Lower-case filter name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nmt => "nmt",
            Self::Sync => "sync",
            Self::Emcy => "emcy",
            Self::Pdo => "pdo",
            Self::Sdo => "sdo",
            Self::Heartbeat => "heartbeat",
        }
    }
}

impl FromStr for MessageGroup {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nmt" => Ok(Self::Nmt),
            "sync" => Ok(Self::Sync),
            "emcy" => Ok(Self::Emcy),
            "pdo" => Ok(Self::Pdo),
            "sdo" => Ok(Self::Sdo),
            "heartbeat" => Ok(Self::Heartbeat),
            other => Err(format!(
                "unknown message type '{}', expected one of: nmt, sync, emcy, pdo, sdo, heartbeat",
                other
            )),
        }
    }
}

/// Predicate over identifiers by message group and node number
///
/// An empty group list accepts every category (including unknown ones).
/// A node filter only ever matches categories that carry a node number.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageFilter {
    /// Accepted groups (empty = all)
    pub groups: Vec<MessageGroup>,
    /// Required node number
    pub node_id: Option<u8>,
}

impl MessageFilter {
    /// Parse a comma-separated group list such as `"pdo,heartbeat"`
    pub fn parse_groups(list: &str) -> Result<Vec<MessageGroup>, String> {
        list.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(MessageGroup::from_str)
            .collect()
    }

    /// Whether an identifier passes the filter
    pub fn matches(&self, identifier: u32) -> bool {
        let classification = classify(identifier);

        if !self.groups.is_empty() {
            match classification.category.group() {
                Some(group) if self.groups.contains(&group) => {}
                _ => return false,
            }
        }

        match self.node_id {
            Some(node) => {
                classification.category.has_node_id() && classification.node_id == node
            }
            None => true,
        }
    }
}
