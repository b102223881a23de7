//! Tests for COB-ID classification

use crate::canopen::{
    COB_ID_RANGES, CanOpenCategory, Classification, MessageFilter, MessageGroup, NodeIdRule,
    classify,
};

fn class(category: CanOpenCategory, node_id: u8) -> Classification {
    Classification { category, node_id }
}

// =============================================================================
// classify: fixed points
// =============================================================================

#[test]
fn test_classify_broadcast_objects() {
    assert_eq!(classify(0x000), class(CanOpenCategory::Nmt, 0));
    assert_eq!(classify(0x080), class(CanOpenCategory::Sync, 0));
}

#[test]
fn test_classify_pdo_examples() {
    assert_eq!(classify(0x181), class(CanOpenCategory::Tpdo(1), 2));
    assert_eq!(classify(0x180), class(CanOpenCategory::Tpdo(1), 1));
    assert_eq!(classify(0x1FF), class(CanOpenCategory::Tpdo(1), 128));
    assert_eq!(classify(0x201), class(CanOpenCategory::Rpdo(1), 2));
}

#[test]
fn test_classify_emcy_and_heartbeat() {
    assert_eq!(classify(0x081), class(CanOpenCategory::Emcy, 1));
    assert_eq!(classify(0x0FF), class(CanOpenCategory::Emcy, 127));
    assert_eq!(classify(0x700), class(CanOpenCategory::Heartbeat, 0));
    assert_eq!(classify(0x705), class(CanOpenCategory::Heartbeat, 5));
    assert_eq!(classify(0x77F), class(CanOpenCategory::Heartbeat, 127));
}

#[test]
fn test_classify_sdo() {
    assert_eq!(classify(0x581), class(CanOpenCategory::SdoResponse, 2));
    assert_eq!(classify(0x601), class(CanOpenCategory::SdoRequest, 2));
}

#[test]
fn test_classify_gaps_are_unknown() {
    for id in [0x001, 0x07F, 0x100, 0x17F, 0x680, 0x6FF, 0x780, 0x7FF, 0x1FFF_FFFF] {
        assert_eq!(classify(id), Classification::UNKNOWN, "id {:#x}", id);
    }
}

// =============================================================================
// classify: every table boundary
// =============================================================================

#[test]
fn test_classify_every_range_boundary() {
    use CanOpenCategory::*;

    // (id, category, node) at lower-1, lower, upper and upper+1 of each range
    let cases: &[(u32, CanOpenCategory, u8)] = &[
        (0x000, Nmt, 0),
        (0x001, Unknown, 0),
        (0x07F, Unknown, 0),
        (0x080, Sync, 0),
        (0x081, Emcy, 1),
        (0x0FF, Emcy, 127),
        (0x100, Unknown, 0),
        (0x17F, Unknown, 0),
        (0x180, Tpdo(1), 1),
        (0x1FF, Tpdo(1), 128),
        (0x200, Rpdo(1), 1),
        (0x27F, Rpdo(1), 128),
        (0x280, Tpdo(2), 1),
        (0x2FF, Tpdo(2), 128),
        (0x300, Rpdo(2), 1),
        (0x37F, Rpdo(2), 128),
        (0x380, Tpdo(3), 1),
        (0x3FF, Tpdo(3), 128),
        (0x400, Rpdo(3), 1),
        (0x47F, Rpdo(3), 128),
        (0x480, Tpdo(4), 1),
        (0x4FF, Tpdo(4), 128),
        (0x500, Rpdo(4), 1),
        (0x57F, Rpdo(4), 128),
        (0x580, SdoResponse, 1),
        (0x5FF, SdoResponse, 128),
        (0x600, SdoRequest, 1),
        (0x67F, SdoRequest, 128),
        (0x680, Unknown, 0),
        (0x6FF, Unknown, 0),
        (0x700, Heartbeat, 0),
        (0x77F, Heartbeat, 127),
        (0x780, Unknown, 0),
        (0x999, Unknown, 0),
    ];

    for &(id, category, node_id) in cases {
        assert_eq!(classify(id), class(category, node_id), "id {:#x}", id);
    }
}

#[test]
fn test_table_matches_node_id_rules() {
    for range in COB_ID_RANGES.iter() {
        let expected_node = match range.node_id {
            NodeIdRule::Broadcast => 0,
            NodeIdRule::Offset => (range.upper - range.lower) as u8,
            NodeIdRule::OffsetPlusOne => (range.upper - range.lower + 1) as u8,
        };
        assert_eq!(classify(range.upper).node_id, expected_node, "range {:?}", range);
    }
}

#[test]
fn test_table_ranges_do_not_overlap() {
    for (i, a) in COB_ID_RANGES.iter().enumerate() {
        for b in COB_ID_RANGES.iter().skip(i + 1) {
            assert!(a.upper < b.lower, "{:?} overlaps {:?}", a, b);
        }
    }
}

// =============================================================================
// Labels and groups
// =============================================================================

#[test]
fn test_category_labels() {
    assert_eq!(CanOpenCategory::Tpdo(3).to_string(), "TPDO3");
    assert_eq!(CanOpenCategory::Rpdo(4).to_string(), "RPDO4");
    assert_eq!(CanOpenCategory::SdoRequest.to_string(), "SDO_REQUEST");
    assert_eq!(CanOpenCategory::Unknown.to_string(), "UNKNOWN");
}

#[test]
fn test_category_serializes_as_label() {
    let json = serde_json::to_string(&classify(0x181)).unwrap();
    assert_eq!(json, r#"{"category":"TPDO1","node_id":2}"#);
}

#[test]
fn test_category_group() {
    assert_eq!(CanOpenCategory::Rpdo(2).group(), Some(MessageGroup::Pdo));
    assert_eq!(CanOpenCategory::SdoResponse.group(), Some(MessageGroup::Sdo));
    assert_eq!(CanOpenCategory::Unknown.group(), None);
}

#[test]
fn test_message_group_from_str() {
    assert_eq!("PDO".parse::<MessageGroup>().unwrap(), MessageGroup::Pdo);
    assert_eq!(" heartbeat ".parse::<MessageGroup>().unwrap(), MessageGroup::Heartbeat);
    assert!("lss".parse::<MessageGroup>().is_err());
}

// =============================================================================
// MessageFilter
// =============================================================================

#[test]
fn test_filter_default_accepts_everything() {
    let filter = MessageFilter::default();
    assert!(filter.matches(0x000));
    assert!(filter.matches(0x7FF));
}

#[test]
fn test_filter_by_group() {
    let filter = MessageFilter {
        groups: MessageFilter::parse_groups("pdo, heartbeat").unwrap(),
        node_id: None,
    };

    assert!(filter.matches(0x181));
    assert!(filter.matches(0x501));
    assert!(filter.matches(0x705));
    assert!(!filter.matches(0x080));
    assert!(!filter.matches(0x601));
    assert!(!filter.matches(0x7FF));
}

#[test]
fn test_filter_by_node() {
    let filter = MessageFilter {
        groups: Vec::new(),
        node_id: Some(5),
    };

    assert!(filter.matches(0x184)); // TPDO1 node 5
    assert!(filter.matches(0x085)); // EMCY node 5
    assert!(filter.matches(0x705)); // heartbeat node 5
    assert!(!filter.matches(0x185));
    assert!(!filter.matches(0x000));
}

#[test]
fn test_filter_node_zero_excludes_broadcast() {
    let filter = MessageFilter {
        groups: Vec::new(),
        node_id: Some(0),
    };

    assert!(!filter.matches(0x000));
    assert!(!filter.matches(0x080));
    assert!(filter.matches(0x700));
}

#[test]
fn test_parse_groups_rejects_unknown() {
    assert!(MessageFilter::parse_groups("pdo,foo").is_err());
    assert!(MessageFilter::parse_groups("").unwrap().is_empty());
}
