//! Remaining-length varint codec.
//!
//! The wire format encodes "bytes following the length field itself" as a
//! variable-length integer: 7 bits per byte, little-endian weighted
//! (`128^index`), with the top bit (`0x80`) flagging a continuation byte.
//! The chain is hard-capped at 4 bytes, so the representable range is
//! `0..=268_435_455`.
//!
//! Decoding distinguishes two negative outcomes that must never be
//! conflated:
//! - `Ok(None)`: the continuation chain needs bytes not yet buffered. The
//!   frame reader waits for more input.
//! - `Err(MalformedLength)`: a fifth length byte would be required. The
//!   connection is torn down.

use bytes::{BufMut, BytesMut};

use crate::error::{ProtocolError, Result};

/// Largest value a 4-byte remaining-length field can carry.
pub const MAX_REMAINING_LENGTH: u32 = 268_435_455;

/// Maximum number of bytes a remaining-length field may occupy.
pub const MAX_LENGTH_BYTES: usize = 4;

/// Decode a remaining-length field from the start of `buf`.
///
/// `buf` must begin at the first length byte (one past the fixed header
/// byte). Returns the decoded value and the number of length bytes
/// consumed, or `Ok(None)` when the buffer ends before the continuation
/// chain does.
///
/// # Errors
/// Returns `ProtocolError::MalformedLength` when the continuation bit is
/// still set after [`MAX_LENGTH_BYTES`] bytes.
pub fn decode_remaining_length(buf: &[u8]) -> Result<Option<(u32, usize)>> {
    let mut value: u32 = 0;

    for index in 0..MAX_LENGTH_BYTES {
        let Some(&digit) = buf.get(index) else {
            // Chain continues past the buffered bytes: wait for more input.
            return Ok(None);
        };

        value += u32::from(digit & 0x7F) << (7 * index);

        if digit & 0x80 == 0 {
            return Ok(Some((value, index + 1)));
        }
    }

    Err(ProtocolError::MalformedLength)
}

/// Encode `length` as a remaining-length field appended to `dst`.
///
/// Emits 7 bits at a time, setting the continuation bit on every byte but
/// the last. Never produces more than [`MAX_LENGTH_BYTES`] bytes.
///
/// # Errors
/// Returns `ProtocolError::OversizedPacket` for values above
/// [`MAX_REMAINING_LENGTH`].
pub fn encode_remaining_length(length: u32, dst: &mut BytesMut) -> Result<()> {
    if length > MAX_REMAINING_LENGTH {
        return Err(ProtocolError::OversizedPacket(length as usize));
    }

    let mut remaining = length;
    loop {
        let mut digit = (remaining % 128) as u8;
        remaining /= 128;
        if remaining > 0 {
            digit |= 0x80;
        }
        dst.put_u8(digit);
        if remaining == 0 {
            return Ok(());
        }
    }
}

/// Number of bytes [`encode_remaining_length`] will emit for `length`.
pub fn encoded_length_size(length: u32) -> usize {
    match length {
        0..=127 => 1,
        128..=16_383 => 2,
        16_384..=2_097_151 => 3,
        _ => 4,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(length: u32) -> BytesMut {
        let mut dst = BytesMut::new();
        encode_remaining_length(length, &mut dst).expect("value in range");
        dst
    }

    #[test]
    fn test_single_byte_boundaries() {
        assert_eq!(encode(0).as_ref(), &[0x00]);
        assert_eq!(encode(127).as_ref(), &[0x7F]);
        assert_eq!(encode(128).as_ref(), &[0x80, 0x01]);
    }

    #[test]
    fn test_spec_reference_values() {
        // Reference encodings from the MQTT 3.1.1 standard, table 2.4.
        assert_eq!(encode(16_383).as_ref(), &[0xFF, 0x7F]);
        assert_eq!(encode(16_384).as_ref(), &[0x80, 0x80, 0x01]);
        assert_eq!(encode(2_097_151).as_ref(), &[0xFF, 0xFF, 0x7F]);
        assert_eq!(encode(2_097_152).as_ref(), &[0x80, 0x80, 0x80, 0x01]);
        assert_eq!(encode(MAX_REMAINING_LENGTH).as_ref(), &[0xFF, 0xFF, 0xFF, 0x7F]);
    }

    #[test]
    fn test_decode_roundtrip_boundaries() {
        for value in [0, 1, 127, 128, 16_383, 16_384, 2_097_151, 2_097_152, MAX_REMAINING_LENGTH] {
            let bytes = encode(value);
            let decoded = decode_remaining_length(&bytes).expect("well-formed");
            assert_eq!(decoded, Some((value, bytes.len())));
        }
    }

    #[test]
    fn test_insufficient_bytes_is_not_an_error() {
        // A continuation bit with no following byte means "wait", not "fail".
        assert!(matches!(decode_remaining_length(&[]), Ok(None)));
        assert!(matches!(decode_remaining_length(&[0x80]), Ok(None)));
        assert!(matches!(decode_remaining_length(&[0x80, 0x80, 0x80]), Ok(None)));
    }

    #[test]
    fn test_five_length_bytes_is_malformed() {
        let result = decode_remaining_length(&[0x80, 0x80, 0x80, 0x80, 0x01]);
        assert!(matches!(result, Err(ProtocolError::MalformedLength)));

        // Malformed even when the fifth byte has not arrived yet: four
        // continuation bytes already exceed the budget.
        let result = decode_remaining_length(&[0xFF, 0xFF, 0xFF, 0xFF]);
        assert!(matches!(result, Err(ProtocolError::MalformedLength)));
    }

    #[test]
    fn test_encode_rejects_out_of_range() {
        let mut dst = BytesMut::new();
        let result = encode_remaining_length(MAX_REMAINING_LENGTH + 1, &mut dst);
        assert!(matches!(result, Err(ProtocolError::OversizedPacket(_))));
    }

    #[test]
    fn test_encoded_length_size_matches_encoder() {
        for value in [0, 127, 128, 16_383, 16_384, 2_097_151, 2_097_152, MAX_REMAINING_LENGTH] {
            assert_eq!(encoded_length_size(value), encode(value).len());
        }
    }
}
