//! Typed packet decoding.
//!
//! One pure function per frame type, each taking a complete [`Frame`] and
//! returning a typed structure. Field layouts are bit-exact to MQTT 3.1.1:
//! 2-byte big-endian length-prefixed UTF-8 strings, a protocol level byte,
//! a connect-flags byte, and a 2-byte keep-alive in seconds.
//!
//! Decoding never touches connection state; whether a packet is legal in
//! the current state is the state machine's call.

use bytes::{Buf, Bytes};

use crate::core::frame::{Frame, PacketType};
use crate::error::{constants, ProtocolError, Result};

/// Decoded CONNECT payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectPacket {
    pub protocol_name: String,
    pub protocol_level: u8,
    pub clean_session: bool,
    pub keep_alive_secs: u16,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Decoded PUBLISH payload.
///
/// Created by the decoder and handed by value to collaborators; the
/// protocol engine retains nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishPacket {
    pub topic: String,
    pub payload: Bytes,
    pub qos: u8,
    pub dup: bool,
    pub retain: bool,
    /// Present iff `qos > 0`.
    pub packet_id: Option<u16>,
}

/// Decoded SUBSCRIBE payload (single topic filter).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscribePacket {
    pub packet_id: u16,
    pub topic: String,
    pub qos: u8,
}

/// A fully decoded client-to-server packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    Connect(ConnectPacket),
    Publish(PublishPacket),
    Subscribe(SubscribePacket),
    PingReq,
    Disconnect,
}

impl Packet {
    /// Decode a complete frame into its typed form.
    ///
    /// # Errors
    /// `MalformedPacket` for truncated or invalid field layouts,
    /// `ProtocolViolation` for server-to-client packet types arriving from
    /// a client, and `UnsupportedPacketType` for reserved type values.
    pub fn decode(frame: &Frame) -> Result<Self> {
        match frame.packet_type()? {
            PacketType::Connect => decode_connect(frame).map(Packet::Connect),
            PacketType::Publish => decode_publish(frame).map(Packet::Publish),
            PacketType::Subscribe => decode_subscribe(frame).map(Packet::Subscribe),
            PacketType::Pingreq => Ok(Packet::PingReq),
            PacketType::Disconnect => Ok(Packet::Disconnect),
            PacketType::Connack | PacketType::Suback | PacketType::Pingresp => {
                Err(ProtocolError::ProtocolViolation(constants::ERR_SERVER_PACKET))
            }
        }
    }
}

fn read_u16(buf: &mut &[u8]) -> Result<u16> {
    if buf.remaining() < 2 {
        return Err(ProtocolError::MalformedPacket(constants::ERR_TRUNCATED_FIELD));
    }
    Ok(buf.get_u16())
}

fn read_string(buf: &mut &[u8]) -> Result<String> {
    let len = read_u16(buf)? as usize;
    if buf.remaining() < len {
        return Err(ProtocolError::MalformedPacket(constants::ERR_TRUNCATED_FIELD));
    }
    let raw = buf[..len].to_vec();
    buf.advance(len);
    String::from_utf8(raw).map_err(|_| ProtocolError::MalformedPacket(constants::ERR_INVALID_UTF8))
}

/// Read just the protocol level from a CONNECT frame's variable header.
///
/// The state machine checks this before [`decode_connect`] runs, so an
/// unsupported level gets its negative CONNACK even when the rest of the
/// packet is malformed.
pub fn connect_protocol_level(frame: &Frame) -> Result<u8> {
    let mut buf = frame.payload();
    let _ = read_string(&mut buf)?;
    if !buf.has_remaining() {
        return Err(ProtocolError::MalformedPacket(constants::ERR_TRUNCATED_FIELD));
    }
    Ok(buf.get_u8())
}

/// Decode a CONNECT frame's variable header and payload.
///
/// Protocol-level acceptance is *not* decided here; the decoded level is
/// returned as-is and the state machine short-circuits on an unsupported
/// value so it can send the negative CONNACK first.
pub fn decode_connect(frame: &Frame) -> Result<ConnectPacket> {
    let mut buf = frame.payload();

    let protocol_name = read_string(&mut buf)?;

    if buf.remaining() < 2 {
        return Err(ProtocolError::MalformedPacket(constants::ERR_TRUNCATED_FIELD));
    }
    let protocol_level = buf.get_u8();
    let connect_flags = buf.get_u8();

    let has_username = connect_flags & 0x80 != 0;
    let has_password = connect_flags & 0x40 != 0;
    let clean_session = connect_flags & 0x02 != 0;

    let keep_alive_secs = read_u16(&mut buf)?;
    let client_id = read_string(&mut buf)?;

    let username = has_username.then(|| read_string(&mut buf)).transpose()?;
    let password = has_password.then(|| read_string(&mut buf)).transpose()?;

    Ok(ConnectPacket {
        protocol_name,
        protocol_level,
        clean_session,
        keep_alive_secs,
        client_id,
        username,
        password,
    })
}

/// Decode a PUBLISH frame.
///
/// QoS comes from bits 1-2 of the fixed header byte, DUP from bit 3,
/// RETAIN from bit 0. A 2-byte packet identifier follows the topic only
/// when QoS > 0; everything after it is the payload.
pub fn decode_publish(frame: &Frame) -> Result<PublishPacket> {
    let first_byte = frame.first_byte();
    let qos = (first_byte & 0x06) >> 1;
    let dup = first_byte & 0x08 != 0;
    let retain = first_byte & 0x01 != 0;

    if qos > 2 {
        return Err(ProtocolError::MalformedPacket(constants::ERR_INVALID_QOS));
    }

    let mut buf = frame.payload();
    let topic = read_string(&mut buf)?;

    let packet_id = if qos > 0 { Some(read_u16(&mut buf)?) } else { None };

    Ok(PublishPacket {
        topic,
        payload: Bytes::copy_from_slice(buf),
        qos,
        dup,
        retain,
        packet_id,
    })
}

/// Decode a SUBSCRIBE frame.
///
/// Reads the packet identifier plus exactly one topic filter and its
/// requested QoS; additional filters in the same packet are ignored, which
/// matches what the fleet's firmware actually sends.
pub fn decode_subscribe(frame: &Frame) -> Result<SubscribePacket> {
    let mut buf = frame.payload();

    let packet_id = read_u16(&mut buf)?;
    let topic = read_string(&mut buf)?;

    if !buf.has_remaining() {
        return Err(ProtocolError::MalformedPacket(constants::ERR_TRUNCATED_FIELD));
    }
    let qos = buf.get_u8();

    Ok(SubscribePacket {
        packet_id,
        topic,
        qos,
    })
}
