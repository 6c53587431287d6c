//! Tokio codec for framing the protocol over byte streams.
//!
//! [`MqttCodec`] adapts frame extraction to `tokio_util::codec` so the
//! transport can drive a `Framed<TcpStream, MqttCodec>`. Decoding delegates
//! to [`extract_frame`]; `Ok(None)` maps directly onto the codec's
//! "need more bytes" contract. Outbound responses are pre-encoded
//! [`Bytes`], so the encoder is a plain copy.

use bytes::{Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::config::DEFAULT_MAX_PACKET_BYTES;
use crate::core::frame::{extract_frame, Frame};
use crate::error::ProtocolError;

/// Codec emitting complete [`Frame`]s and writing pre-encoded responses.
#[derive(Debug, Clone)]
pub struct MqttCodec {
    max_remaining_length: usize,
}

impl MqttCodec {
    pub fn new(max_remaining_length: usize) -> Self {
        Self {
            max_remaining_length,
        }
    }
}

impl Default for MqttCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PACKET_BYTES)
    }
}

impl Decoder for MqttCodec {
    type Item = Frame;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, ProtocolError> {
        extract_frame(src, self.max_remaining_length)
    }
}

impl Encoder<Bytes> for MqttCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), ProtocolError> {
        dst.extend_from_slice(&item);
        Ok(())
    }
}
