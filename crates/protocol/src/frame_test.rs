//! Tests for the frame decoder

use crate::error::ProtocolError;
use crate::frame::{
    CAN_EFF_FLAG, CAN_ERR_FLAG, CAN_FRAME_SIZE, CAN_RTR_FLAG, CanFrame, decode_frame,
};

fn raw_frame(can_id: u32, dlc: u8, data: [u8; 8]) -> [u8; CAN_FRAME_SIZE] {
    let mut buf = [0u8; CAN_FRAME_SIZE];
    buf[..4].copy_from_slice(&can_id.to_le_bytes());
    buf[4] = dlc;
    buf[8..].copy_from_slice(&data);
    buf
}

// =============================================================================
// decode_frame tests
// =============================================================================

#[test]
fn test_decode_standard_frame() {
    let buf = raw_frame(0x123, 3, [0x01, 0x02, 0x03, 0, 0, 0, 0, 0]);

    let frame = decode_frame(&buf).unwrap();

    assert_eq!(frame.can_id, 0x123);
    assert_eq!(frame.identifier(), 0x123);
    assert_eq!(frame.dlc, 3);
    assert_eq!(frame.payload(), &[0x01, 0x02, 0x03]);
    assert!(!frame.is_extended());
}

#[test]
fn test_decode_reads_id_little_endian() {
    let mut buf = [0u8; CAN_FRAME_SIZE];
    buf[0] = 0x81;
    buf[1] = 0x01;
    buf[4] = 0;

    let frame = decode_frame(&buf).unwrap();

    assert_eq!(frame.can_id, 0x181);
}

#[test]
fn test_decode_extended_frame_keeps_flag() {
    let buf = raw_frame(CAN_EFF_FLAG | 0x18FF_50E5, 8, [1, 2, 3, 4, 5, 6, 7, 8]);

    let frame = decode_frame(&buf).unwrap();

    assert!(frame.is_extended());
    assert_eq!(frame.identifier(), 0x18FF_50E5);
    assert_eq!(frame.can_id, CAN_EFF_FLAG | 0x18FF_50E5);
    assert_eq!(frame.payload().len(), 8);
}

#[test]
fn test_decode_remote_and_error_flags() {
    let rtr = decode_frame(&raw_frame(CAN_RTR_FLAG | 0x700, 0, [0; 8])).unwrap();
    assert!(rtr.is_remote());
    assert_eq!(rtr.identifier(), 0x700);

    let err = decode_frame(&raw_frame(CAN_ERR_FLAG | 0x004, 8, [0; 8])).unwrap();
    assert!(err.is_error());
}

#[test]
fn test_decode_ignores_padding_bytes() {
    let mut buf = raw_frame(0x80, 0, [0; 8]);
    buf[5] = 0xAA;
    buf[6] = 0xBB;
    buf[7] = 0xCC;

    let frame = decode_frame(&buf).unwrap();

    assert_eq!(frame.identifier(), 0x80);
    assert_eq!(frame.dlc, 0);
    assert!(frame.payload().is_empty());
}

#[test]
fn test_decode_zero_length_buffer() {
    let err = decode_frame(&[]).unwrap_err();
    assert_eq!(
        err,
        ProtocolError::MalformedFrame {
            expected: 16,
            actual: 0
        }
    );
}

#[test]
fn test_decode_short_read_is_rejected() {
    for len in [1, 4, 8, 15] {
        let buf = vec![0u8; len];
        let err = decode_frame(&buf).unwrap_err();
        assert!(
            matches!(err, ProtocolError::MalformedFrame { expected: 16, actual } if actual == len),
            "length {} should be malformed",
            len
        );
    }
}

#[test]
fn test_decode_longer_buffer_uses_first_16_bytes() {
    let mut buf = raw_frame(0x181, 2, [0xAB, 0xCD, 0, 0, 0, 0, 0, 0]).to_vec();
    buf.extend_from_slice(&[0xFF; 16]);

    let frame = decode_frame(&buf).unwrap();

    assert_eq!(frame.payload(), &[0xAB, 0xCD]);
}

#[test]
fn test_decode_rejects_dlc_above_eight() {
    let buf = raw_frame(0x181, 9, [0; 8]);
    let err = decode_frame(&buf).unwrap_err();
    assert_eq!(err, ProtocolError::InvalidDlc { dlc: 9, max: 8 });
}

#[test]
fn test_encode_decode_is_lossless() {
    let frame = CanFrame::new(CAN_EFF_FLAG | 0x1234_5678, &[9, 8, 7, 6]);
    let decoded = decode_frame(&frame.encode()).unwrap();
    assert_eq!(decoded, frame);
}

// =============================================================================
// CanFrame helpers
// =============================================================================

#[test]
fn test_frame_new_truncates_payload() {
    let frame = CanFrame::new(0x200, &[0; 12]);
    assert_eq!(frame.dlc, 8);
}

#[test]
fn test_frame_display() {
    let frame = CanFrame::new(0x181, &[0x0A, 0xFF]);
    assert_eq!(frame.to_string(), "181 [2] 0A FF");

    let ext = CanFrame::new(CAN_EFF_FLAG | 0x1ABC, &[]);
    assert_eq!(ext.to_string(), "00001ABC [0] ");
}

#[test]
fn test_error_display() {
    assert_eq!(
        ProtocolError::malformed(10).to_string(),
        "malformed frame: expected 16 bytes, got 10"
    );
    assert_eq!(
        ProtocolError::invalid_dlc(15).to_string(),
        "invalid DLC 15: classic CAN carries at most 8 data bytes"
    );
}
