//! Fixed header parsing and frame extraction.
//!
//! A frame is one complete protocol message: the fixed header byte
//! (`(packet_type << 4) | flags`), the remaining-length field, and
//! `remaining_length` bytes of variable header plus payload. A [`Frame`] is
//! only ever materialized once the connection's buffer holds the whole
//! thing; partial input stays in the buffer untouched.

use bytes::{Bytes, BytesMut};

use crate::core::varint;
use crate::error::{ProtocolError, Result};

/// Packet types from the fixed header's high nibble.
///
/// Only the client-to-server types plus the server responses the gateway
/// emits are represented; everything else is rejected at the frame level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketType {
    Connect = 1,
    Connack = 2,
    Publish = 3,
    Subscribe = 8,
    Suback = 9,
    Pingreq = 12,
    Pingresp = 13,
    Disconnect = 14,
}

impl TryFrom<u8> for PacketType {
    type Error = ProtocolError;

    fn try_from(raw: u8) -> Result<Self> {
        match raw {
            1 => Ok(PacketType::Connect),
            2 => Ok(PacketType::Connack),
            3 => Ok(PacketType::Publish),
            8 => Ok(PacketType::Subscribe),
            9 => Ok(PacketType::Suback),
            12 => Ok(PacketType::Pingreq),
            13 => Ok(PacketType::Pingresp),
            14 => Ok(PacketType::Disconnect),
            other => Err(ProtocolError::UnsupportedPacketType(other)),
        }
    }
}

/// A complete frame split off a connection's receive buffer.
///
/// Invariant: `bytes.len() == 1 + length_field_len + remaining_length`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    bytes: Bytes,
    length_field_len: usize,
    remaining_length: usize,
}

impl Frame {
    /// The fixed header byte.
    pub fn first_byte(&self) -> u8 {
        self.bytes[0]
    }

    /// Packet type from the high nibble of the fixed header.
    pub fn packet_type(&self) -> Result<PacketType> {
        PacketType::try_from(self.first_byte() >> 4)
    }

    /// Flag bits from the low nibble of the fixed header.
    pub fn flags(&self) -> u8 {
        self.first_byte() & 0x0F
    }

    /// Value of the remaining-length field.
    pub fn remaining_length(&self) -> usize {
        self.remaining_length
    }

    /// Bytes occupied by the fixed header byte plus the length field.
    pub fn header_len(&self) -> usize {
        1 + self.length_field_len
    }

    /// Total bytes of the frame on the wire.
    pub fn total_len(&self) -> usize {
        self.bytes.len()
    }

    /// Variable header and payload: everything after the length field.
    pub fn payload(&self) -> &[u8] {
        &self.bytes[self.header_len()..]
    }

    /// The full frame as it appeared on the wire.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Try to split one complete frame off the front of `buf`.
///
/// Needs at least 2 buffered bytes before attempting a length decode.
/// Returns `Ok(None)` (buffer untouched) while the frame is incomplete,
/// including when the length field itself is still arriving.
///
/// # Errors
/// - `ProtocolError::MalformedLength` when the length field exceeds its
///   4-byte budget; the caller must discard the connection.
/// - `ProtocolError::OversizedPacket` when the declared length exceeds
///   `max_remaining_length`; checked before any allocation.
pub fn extract_frame(buf: &mut BytesMut, max_remaining_length: usize) -> Result<Option<Frame>> {
    if buf.len() < 2 {
        return Ok(None);
    }

    let Some((remaining_length, length_field_len)) = varint::decode_remaining_length(&buf[1..])?
    else {
        return Ok(None);
    };

    let remaining_length = remaining_length as usize;
    if remaining_length > max_remaining_length {
        return Err(ProtocolError::OversizedPacket(remaining_length));
    }

    let total = 1 + length_field_len + remaining_length;
    if buf.len() < total {
        return Ok(None);
    }

    Ok(Some(Frame {
        bytes: buf.split_to(total).freeze(),
        length_field_len,
        remaining_length,
    }))
}
