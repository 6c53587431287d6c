//! Outbound packet builders.
//!
//! Serializes the four response types the gateway sends: CONNACK, PUBLISH,
//! SUBACK, and PINGRESP. Every builder goes through the remaining-length
//! varint codec, even where the observed lengths fit one byte, so the
//! encoder and decoder stay symmetric.

use bytes::{BufMut, Bytes, BytesMut};

use crate::core::frame::PacketType;
use crate::core::varint::{encode_remaining_length, encoded_length_size};
use crate::error::{ProtocolError, Result};

/// CONNACK return codes from the 3.1.1 standard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectReturnCode {
    Accepted = 0,
    UnacceptableProtocolVersion = 1,
    IdentifierRejected = 2,
    ServerUnavailable = 3,
    BadCredentials = 4,
    NotAuthorized = 5,
}

fn fixed_header(packet_type: PacketType, flags: u8, remaining_length: u32) -> Result<BytesMut> {
    let mut dst =
        BytesMut::with_capacity(1 + encoded_length_size(remaining_length) + remaining_length as usize);
    dst.put_u8(((packet_type as u8) << 4) | flags);
    encode_remaining_length(remaining_length, &mut dst)?;
    Ok(dst)
}

/// Build a CONNACK frame: fixed 4 bytes.
pub fn connack(session_present: bool, return_code: ConnectReturnCode) -> Bytes {
    // Remaining length 2 always fits a single length byte.
    let mut dst = fixed_header(PacketType::Connack, 0, 2)
        .expect("remaining length 2 is always encodable");
    dst.put_u8(u8::from(session_present));
    dst.put_u8(return_code as u8);
    dst.freeze()
}

/// Build a PUBLISH frame.
///
/// Mirrors the decoder's flag layout: DUP bit 3, QoS bits 1-2, RETAIN
/// bit 0. The packet identifier is written iff `qos > 0`, in which case
/// `packet_id` must be supplied.
///
/// # Errors
/// `MalformedPacket` when `qos > 0` without a packet id or when the topic
/// cannot fit its 2-byte length prefix, `OversizedPacket` when the frame
/// would exceed the wire format's representable length.
pub fn publish(
    topic: &str,
    payload: &[u8],
    qos: u8,
    dup: bool,
    retain: bool,
    packet_id: Option<u16>,
) -> Result<Bytes> {
    if qos > 0 && packet_id.is_none() {
        return Err(ProtocolError::MalformedPacket(
            crate::error::constants::ERR_MISSING_PACKET_ID,
        ));
    }

    // The topic's length prefix is 2 bytes; a longer topic would wrap
    // modulo 65536 and contradict the outer remaining length.
    if topic.len() > usize::from(u16::MAX) {
        return Err(ProtocolError::MalformedPacket(
            crate::error::constants::ERR_TOPIC_TOO_LONG,
        ));
    }

    let mut remaining = 2 + topic.len() + payload.len();
    if qos > 0 {
        remaining += 2;
    }
    if remaining > crate::core::varint::MAX_REMAINING_LENGTH as usize {
        return Err(ProtocolError::OversizedPacket(remaining));
    }
    let remaining = remaining as u32;

    let mut flags = 0u8;
    if dup {
        flags |= 0x08;
    }
    flags |= (qos & 0x03) << 1;
    if retain {
        flags |= 0x01;
    }

    let mut dst = fixed_header(PacketType::Publish, flags, remaining)?;
    dst.put_u16(topic.len() as u16);
    dst.put_slice(topic.as_bytes());
    if let (true, Some(id)) = (qos > 0, packet_id) {
        dst.put_u16(id);
    }
    dst.put_slice(payload);
    Ok(dst.freeze())
}

/// Build a SUBACK frame: fixed 5 bytes carrying the packet identifier and
/// the granted QoS (doubling as the return code).
pub fn suback(packet_id: u16, granted_qos: u8) -> Bytes {
    let mut dst = fixed_header(PacketType::Suback, 0, 3)
        .expect("remaining length 3 is always encodable");
    dst.put_u16(packet_id);
    dst.put_u8(granted_qos);
    dst.freeze()
}

/// Build a PINGRESP frame: fixed 2 bytes, no payload.
pub fn pingresp() -> Bytes {
    fixed_header(PacketType::Pingresp, 0, 0)
        .expect("remaining length 0 is always encodable")
        .freeze()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connack_layout() {
        let bytes = connack(false, ConnectReturnCode::Accepted);
        assert_eq!(bytes.as_ref(), &[0x20, 0x02, 0x00, 0x00]);

        let bytes = connack(true, ConnectReturnCode::UnacceptableProtocolVersion);
        assert_eq!(bytes.as_ref(), &[0x20, 0x02, 0x01, 0x01]);
    }

    #[test]
    fn test_suback_layout() {
        let bytes = suback(0x1234, 1);
        assert_eq!(bytes.as_ref(), &[0x90, 0x03, 0x12, 0x34, 0x01]);
    }

    #[test]
    fn test_pingresp_layout() {
        assert_eq!(pingresp().as_ref(), &[0xD0, 0x00]);
    }

    #[test]
    fn test_publish_qos0_omits_packet_id() {
        let bytes = publish("a/b", b"hi", 0, false, false, None).expect("valid");
        assert_eq!(
            bytes.as_ref(),
            &[0x30, 0x07, 0x00, 0x03, b'a', b'/', b'b', b'h', b'i']
        );
    }

    #[test]
    fn test_publish_qos1_flags_and_packet_id() {
        let bytes = publish("t", b"x", 1, true, true, Some(7)).expect("valid");
        // DUP | QoS1 | RETAIN = 0b1011
        assert_eq!(bytes[0], 0x3B);
        assert_eq!(
            bytes.as_ref(),
            &[0x3B, 0x06, 0x00, 0x01, b't', 0x00, 0x07, b'x']
        );
    }

    #[test]
    fn test_publish_qos1_requires_packet_id() {
        let result = publish("t", b"x", 1, false, false, None);
        assert!(matches!(result, Err(ProtocolError::MalformedPacket(_))));
    }

    #[test]
    fn test_publish_topic_longer_than_length_prefix_rejected() {
        // 70,000 bytes fits the remaining length but not the topic prefix;
        // encoding must fail rather than wrap the prefix modulo 65536.
        let topic = "a".repeat(70_000);
        let result = publish(&topic, b"p", 0, false, false, None);
        assert!(matches!(result, Err(ProtocolError::MalformedPacket(_))));

        // Exactly at the prefix limit still encodes.
        let topic = "a".repeat(usize::from(u16::MAX));
        assert!(publish(&topic, b"p", 0, false, false, None).is_ok());
    }
}
