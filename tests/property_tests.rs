//! Property-based tests using proptest
//!
//! These tests validate protocol invariants across a wide range of randomly
//! generated inputs: varint idempotence, chunk-boundary independence,
//! signature symmetry, and identifier parsing.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use bytes::BytesMut;
use mqtt_gateway_core::auth::{
    build_connection_credentials, derive_signature, verify_signature, CredentialValidator,
};
use mqtt_gateway_core::core::varint::{
    decode_remaining_length, encode_remaining_length, MAX_REMAINING_LENGTH,
};
use mqtt_gateway_core::protocol::encode::publish;
use mqtt_gateway_core::FrameReader;
use proptest::prelude::*;
use serde_json::json;

// Property: length-field decode(encode(n)) == n across the whole range
proptest! {
    #[test]
    fn prop_varint_roundtrip(n in 0u32..=MAX_REMAINING_LENGTH) {
        let mut encoded = BytesMut::new();
        encode_remaining_length(n, &mut encoded).expect("in range");

        prop_assert!(encoded.len() <= 4, "encode produced {} bytes", encoded.len());

        let decoded = decode_remaining_length(&encoded).expect("own output is well-formed");
        prop_assert_eq!(decoded, Some((n, encoded.len())));
    }
}

// Property: any 5-continuation-byte chain is malformed, regardless of content
proptest! {
    #[test]
    fn prop_long_continuation_chain_is_malformed(
        b0 in 0x80u8..,
        b1 in 0x80u8..,
        b2 in 0x80u8..,
        b3 in 0x80u8..,
        tail in any::<u8>()
    ) {
        let result = decode_remaining_length(&[b0, b1, b2, b3, tail]);
        prop_assert!(result.is_err());
    }
}

// Property: decoding a truncated continuation chain asks for more bytes
proptest! {
    #[test]
    fn prop_truncated_chain_waits(n in 128u32..=MAX_REMAINING_LENGTH) {
        let mut encoded = BytesMut::new();
        encode_remaining_length(n, &mut encoded).expect("in range");

        for cut in 0..encoded.len() {
            let decoded = decode_remaining_length(&encoded[..cut]).expect("truncation is not malformed");
            prop_assert_eq!(decoded, None);
        }
    }
}

// Property: splitting a frame at any byte offset yields exactly one frame,
// identical to feeding it whole
proptest! {
    #[test]
    fn prop_chunk_boundary_independence(
        topic in "[a-z0-9/]{1,32}",
        payload in prop::collection::vec(any::<u8>(), 0..256)
    ) {
        let frame = publish(&topic, &payload, 0, false, false, None).expect("valid publish");

        let mut whole = FrameReader::new(1024 * 1024);
        let expected = whole.feed(&frame).expect("valid frame");
        prop_assert_eq!(expected.len(), 1);

        for split in 0..=frame.len() {
            let mut reader = FrameReader::new(1024 * 1024);
            let mut emitted = Vec::new();
            emitted.extend(reader.feed(&frame[..split]).expect("valid prefix"));
            emitted.extend(reader.feed(&frame[split..]).expect("valid suffix"));

            prop_assert_eq!(emitted.len(), 1, "split at {} emitted {} frames", split, emitted.len());
            prop_assert_eq!(emitted[0].as_bytes(), expected[0].as_bytes());
        }
    }
}

// Property: a derived signature always verifies, and any single-byte
// corruption of the password is detected
proptest! {
    #[test]
    fn prop_signature_symmetry(
        client_id in "[A-Za-z0-9_-]{1,24}",
        username in "[A-Za-z0-9+/=]{1,24}",
        secret in "[ -~]{8,48}",
        flip in any::<u8>()
    ) {
        let content = format!("{client_id}|{username}");
        let password = derive_signature(&content, &secret);
        prop_assert!(verify_signature(&content, &secret, &password));

        // Flip one byte of the base64 password text.
        let mut corrupted = password.clone().into_bytes();
        let index = (flip as usize) % corrupted.len();
        corrupted[index] ^= 0x01;
        if corrupted != password.as_bytes() {
            let corrupted = String::from_utf8_lossy(&corrupted).into_owned();
            prop_assert!(!verify_signature(&content, &secret, &corrupted));
        }
    }
}

// Property: generated credentials always validate and parse back to the
// inputs that produced them
proptest! {
    #[test]
    fn prop_credential_roundtrip(
        group_id in "[A-Za-z0-9-]{1,16}",
        mac in "[0-9A-F]{2}(:[0-9A-F]{2}){5}",
        uuid in "[a-f0-9-]{8,36}",
        ip in "[0-9.]{7,15}"
    ) {
        let secret = "property-test-key";
        let creds = build_connection_credentials(
            &group_id,
            &mac,
            &uuid,
            &json!({ "ip": ip }),
            secret,
        );

        let validator = CredentialValidator::new(Some(secret.to_string()));
        let identity = validator
            .validate(&creds.client_id, &creds.username, &creds.password)
            .expect("generated credentials validate");

        prop_assert_eq!(identity.group_id, group_id);
        prop_assert_eq!(identity.mac_address, mac);
        prop_assert_eq!(identity.uuid, uuid);
        prop_assert_eq!(identity.user_data["ip"].as_str().expect("ip is a string"), ip);
    }
}

// Property: client ids with the wrong segment count are always rejected
proptest! {
    #[test]
    fn prop_wrong_segment_count_rejected(segment in "[A-Za-z0-9_:-]{0,24}") {
        use mqtt_gateway_core::auth::parse_client_id;

        prop_assume!(!segment.contains("@@@"));

        // One segment and two segments both violate the three-part format.
        prop_assert!(parse_client_id(&segment).is_err());
        let two_segments = format!("{}@@@{}", segment, segment);
        prop_assert!(parse_client_id(&two_segments).is_err());
    }
}
