//! Property-based tests for the metadata line codec.

#![allow(clippy::expect_used)]

use proptest::prelude::*;

use super::{decode, encode, Metadata};

/// Strategy for map entries that lean on the characters the codec escapes.
fn arb_token() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[a-z0-9;=\\\\ ]{0,12}").expect("valid regex")
}

fn arb_metadata() -> impl Strategy<Value = Metadata> {
    prop::collection::btree_map(
        arb_token().prop_filter("keys must be non-empty", |k| !k.is_empty()),
        arb_token(),
        0..8,
    )
}

proptest! {
    #[test]
    fn roundtrip(meta in arb_metadata()) {
        let line = encode(&meta);
        let decoded = decode(&line).expect("encoded lines always decode");
        prop_assert_eq!(decoded, meta);
    }

    #[test]
    fn encode_is_single_line(meta in arb_metadata()) {
        let line = encode(&meta);
        prop_assert!(!line.contains('\n'));
    }

    #[test]
    fn decode_never_panics(line in "[a-z;=\\\\]{0,24}") {
        let _ = decode(&line);
    }
}
