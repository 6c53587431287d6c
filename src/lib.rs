//! # mqtt-gateway-core
//!
//! MQTT 3.1.1 publish/subscribe protocol core for IoT device gateways.
//!
//! Terminates raw byte-stream connections from embedded clients: assembles
//! frames out of arbitrarily-chunked input, decodes and encodes binary
//! packets, runs the per-connection handshake state machine, and validates
//! the HMAC identity binding between a device's connection parameters and
//! the gateway's shared secret.
//!
//! ## Layers
//! - [`core`]: varint length codec, frame extraction, tokio codec
//! - [`protocol`]: typed packet decode/encode and the connection state machine
//! - [`auth`]: signature derivation and composite client-id validation
//! - [`transport`]: TCP listener and per-connection drivers
//! - [`config`]: TOML/env configuration
//!
//! ## Design
//! Parsing is pure and synchronous; the only wait state is "not enough
//! bytes buffered", surfaced as `Ok(None)` so the transport's read loop
//! keeps polling instead of blocking a thread. Message routing and
//! keep-alive timeout enforcement belong to downstream collaborators that
//! consume [`protocol::Event`]s.

pub mod auth;
pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod transport;

pub use crate::core::codec::MqttCodec;
pub use crate::core::frame::{Frame, PacketType};
pub use crate::core::reader::FrameReader;
pub use config::GatewayConfig;
pub use error::{ProtocolError, Result};
pub use protocol::{Action, Connection, ConnectionState, Event, HandshakeInfo, Packet};
