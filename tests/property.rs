//! Property-based tests for the frame codec the harness speaks.
//!
//! These use proptest to fuzz frame parsing and the handshake response
//! parser with inputs a misbehaving server could send.

use proptest::prelude::*;
use ws_resilience::Error;
use ws_resilience::Message;
use ws_resilience::protocol::{Frame, HandshakeResponse, OpCode, apply_mask};

fn data_opcode_strategy() -> impl Strategy<Value = OpCode> {
    prop_oneof![
        Just(OpCode::Text),
        Just(OpCode::Binary),
        Just(OpCode::Continuation),
    ]
}

fn control_opcode_strategy() -> impl Strategy<Value = OpCode> {
    prop_oneof![Just(OpCode::Close), Just(OpCode::Ping), Just(OpCode::Pong),]
}

proptest! {
    #[test]
    fn test_masked_client_frame_unmasks_on_parse(
        fin in any::<bool>(),
        opcode in data_opcode_strategy(),
        mask in any::<[u8; 4]>(),
        payload in prop::collection::vec(any::<u8>(), 0..70_000)
    ) {
        let frame = Frame::new(fin, opcode, payload.clone());
        let mut buf = Vec::new();
        frame.write(&mut buf, Some(mask));

        prop_assert_eq!(buf.len(), frame.wire_size(true));
        prop_assert_eq!(buf[1] & 0x80, 0x80);

        let (parsed, consumed) = Frame::parse(&buf).unwrap();
        prop_assert_eq!(consumed, buf.len());
        prop_assert_eq!(parsed.fin, fin);
        prop_assert_eq!(parsed.opcode, opcode);
        prop_assert_eq!(parsed.payload(), &payload[..]);
    }

    #[test]
    fn test_mask_is_an_involution(
        mask in any::<[u8; 4]>(),
        data in prop::collection::vec(any::<u8>(), 0..1000)
    ) {
        let mut buf = data.clone();
        apply_mask(&mut buf, mask);
        apply_mask(&mut buf, mask);
        prop_assert_eq!(buf, data);
    }

    #[test]
    fn test_parse_never_panics(data in prop::collection::vec(any::<u8>(), 0..512)) {
        if let Ok((frame, consumed)) = Frame::parse(&data) {
            prop_assert!(consumed <= data.len());
            let _ = frame.validate();
        }
    }

    #[test]
    fn test_truncated_frame_is_incomplete(
        payload in prop::collection::vec(any::<u8>(), 1..300),
        cut in any::<prop::sample::Index>()
    ) {
        let mut buf = Vec::new();
        Frame::binary(payload).write(&mut buf, None);
        let cut = cut.index(buf.len());

        let result = Frame::parse(&buf[..cut]);
        prop_assert!(
            matches!(result, Err(Error::IncompleteFrame { .. })),
            "cut at {} of {}: {:?}", cut, buf.len(), result
        );
    }

    #[test]
    fn test_oversized_control_frame_rejected(
        opcode in control_opcode_strategy(),
        len in 126usize..1000
    ) {
        let frame = Frame::new(true, opcode, vec![0u8; len]);
        prop_assert_eq!(frame.validate(), Err(Error::ControlFrameTooLarge(len)));
    }

    #[test]
    fn test_fragmented_control_frame_rejected(
        opcode in control_opcode_strategy(),
        len in 0usize..=125
    ) {
        let frame = Frame::new(false, opcode, vec![0u8; len]);
        prop_assert_eq!(frame.validate(), Err(Error::FragmentedControlFrame));
    }

    #[test]
    fn test_handshake_response_parse_no_panic(data in prop::collection::vec(any::<u8>(), 0..2000)) {
        let _ = HandshakeResponse::parse(&data);
    }

    #[test]
    fn test_preview_is_bounded(text in ".{0,300}", max in 0usize..150) {
        let preview = Message::text(text.clone()).preview(max);
        let chars = preview.chars().count();
        if text.chars().count() > max {
            prop_assert_eq!(chars, max + 3);
            prop_assert!(preview.ends_with("..."));
        } else {
            prop_assert_eq!(preview, text);
        }
    }
}

#[test]
fn test_length_encoding_boundaries() {
    for (len, header) in [(125, 2), (126, 4), (65535, 4), (65536, 10)] {
        let frame = Frame::binary(vec![0u8; len]);
        let mut buf = Vec::new();
        frame.write(&mut buf, None);
        assert_eq!(buf.len(), header + len, "payload length {}", len);
        assert_eq!(Frame::parse(&buf).unwrap().0.payload().len(), len);
    }
}
