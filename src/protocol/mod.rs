//! # Protocol Layer
//!
//! Typed packet decoding, outbound response building, and the
//! per-connection state machine that dispatches between them.
//!
//! ## Components
//! - **Packet**: pure decode functions, one per frame type
//! - **Encode**: CONNACK / PUBLISH / SUBACK / PINGRESP builders
//! - **Connection**: handshake gating, keep-alive bookkeeping, and the
//!   event/action model consumed by the transport

pub mod connection;
pub mod encode;
pub mod packet;


pub use connection::{Action, Connection, ConnectionState, Event, HandshakeInfo};
pub use encode::ConnectReturnCode;
pub use packet::{ConnectPacket, Packet, PublishPacket, SubscribePacket};
