use proptest::prelude::*;
use turbine_core::{mask, mask_from, parse, swap64, MessageKind};

proptest! {
    #[test]
    fn mask_is_an_involution(key in any::<[u8; 4]>(), payload in prop::collection::vec(any::<u8>(), 0..512)) {
        let masked = mask(key, &payload);
        prop_assert_eq!(masked.len(), payload.len());
        prop_assert_eq!(mask(key, &masked), payload);
    }

    #[test]
    fn mask_split_anywhere(key in any::<[u8; 4]>(), payload in prop::collection::vec(any::<u8>(), 1..256), split in any::<prop::sample::Index>()) {
        let at = split.index(payload.len());
        let mut pieces = payload.clone();
        let (head, tail) = pieces.split_at_mut(at);
        mask_from(key, 0, head);
        mask_from(key, at, tail);
        prop_assert_eq!(pieces, mask(key, &payload));
    }

    #[test]
    fn swap64_is_an_involution(value in any::<u64>()) {
        prop_assert_eq!(swap64(swap64(value)), value);
    }

    #[test]
    fn headers_come_back_in_order(pairs in prop::collection::vec(("[A-Za-z][A-Za-z0-9-]{0,15}", "[a-z0-9]{1,16}"), 0..24)) {
        let mut buf = b"GET / HTTP/1.1\r\n".to_vec();
        for (name, value) in &pairs {
            buf.extend_from_slice(format!("X-{name}: {value}\r\n").as_bytes());
        }
        buf.extend_from_slice(b"\r\n");

        let message = parse(&buf, MessageKind::Request).unwrap();
        prop_assert!(message.headers_complete());
        let parsed: Vec<_> = message
            .headers()
            .map(|(k, v)| (k.to_vec(), v.to_vec()))
            .collect();
        let expected: Vec<_> = pairs
            .iter()
            .map(|(k, v)| (format!("X-{k}").into_bytes(), v.as_bytes().to_vec()))
            .collect();
        prop_assert_eq!(parsed, expected);
    }

    #[test]
    fn arbitrary_input_never_panics(buf in prop::collection::vec(any::<u8>(), 0..256), response in any::<bool>()) {
        let kind = if response { MessageKind::Response } else { MessageKind::Request };
        if let Ok(message) = parse(&buf, kind) {
            prop_assert!(message.bytes_consumed() <= buf.len());
        }
    }
}
