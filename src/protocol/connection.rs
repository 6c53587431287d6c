//! Per-connection protocol state machine.
//!
//! An explicit state-machine value, decoupled from socket lifecycle: the
//! transport feeds it complete frames and applies the returned [`Action`]s
//! (write a reply, emit an event to collaborators, close). States advance
//! `AwaitingHandshake -> Connected -> Closed` and are never revisited.
//!
//! The machine records the negotiated keep-alive interval and the last
//! activity timestamp but does not enforce a timeout itself; an external
//! supervisor polls those and decides when to terminate idle connections.

use std::time::{Duration, Instant};

use bytes::Bytes;
use tracing::{debug, warn};

use crate::auth::{CredentialValidator, ParsedIdentity};
use crate::config::{ACCEPTED_PROTOCOL_LEVEL, KEEP_ALIVE_GRACE_MILLIS_PER_SEC};
use crate::core::frame::{Frame, PacketType};
use crate::error::{constants, ProtocolError};
use crate::protocol::encode::{connack, pingresp, suback, ConnectReturnCode};
use crate::protocol::packet::{connect_protocol_level, ConnectPacket, Packet, PublishPacket};

/// Connection lifecycle states. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    AwaitingHandshake,
    Connected,
    Closed,
}

/// Parsed handshake fields handed to collaborators on a successful CONNECT.
#[derive(Debug, Clone, PartialEq)]
pub struct HandshakeInfo {
    pub client_id: String,
    pub protocol_name: String,
    pub protocol_level: u8,
    pub clean_session: bool,
    pub keep_alive_secs: u16,
    /// Negotiated silence budget: 1.5x the client-declared seconds.
    pub keep_alive_millis: u64,
    pub identity: ParsedIdentity,
}

/// Events emitted to collaborators (message router, session tracker).
///
/// The engine makes no assumptions about how these are consumed.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Connect(HandshakeInfo),
    Publish(PublishPacket),
    Subscribe {
        packet_id: u16,
        topic: String,
        qos: u8,
    },
    Disconnect,
    ProtocolError(String),
}

/// What the transport must do in response to a handled frame, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Write these bytes back to the transport.
    Reply(Bytes),
    /// Forward this event to collaborators.
    Emit(Event),
    /// End the transport; no further frames will be handled.
    Close,
}

/// State for one device connection.
///
/// Exclusively owned by its connection's driver; the only shared input is
/// the read-only credential validator.
#[derive(Debug)]
pub struct Connection {
    state: ConnectionState,
    handshake_complete: bool,
    keep_alive: Duration,
    last_activity: Instant,
    validator: CredentialValidator,
}

impl Connection {
    /// Create a fresh connection in `AwaitingHandshake` with an empty
    /// activity history.
    pub fn new(validator: CredentialValidator) -> Self {
        Self {
            state: ConnectionState::AwaitingHandshake,
            handshake_complete: false,
            keep_alive: Duration::ZERO,
            last_activity: Instant::now(),
            validator,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state == ConnectionState::Closed
    }

    pub fn handshake_complete(&self) -> bool {
        self.handshake_complete
    }

    /// Negotiated keep-alive interval (zero before the handshake).
    pub fn keep_alive(&self) -> Duration {
        self.keep_alive
    }

    /// Timestamp of the most recent inbound chunk.
    pub fn last_activity(&self) -> Instant {
        self.last_activity
    }

    /// Record inbound transport activity. Called once per received chunk.
    pub fn record_activity(&mut self, now: Instant) {
        self.last_activity = now;
    }

    /// Handle one complete inbound frame and return the transport actions.
    ///
    /// Frames are handled strictly in arrival order, one at a time; the
    /// state reached by an earlier frame gates what later frames are legal.
    pub fn handle_frame(&mut self, frame: &Frame) -> Vec<Action> {
        if self.state == ConnectionState::Closed {
            return Vec::new();
        }

        let packet_type = match frame.packet_type() {
            Ok(packet_type) => packet_type,
            Err(err) => return self.fail(err),
        };

        // The engine refuses to process any traffic before a handshake.
        if self.state == ConnectionState::AwaitingHandshake
            && packet_type != PacketType::Connect
        {
            warn!(?packet_type, "packet before handshake, closing connection");
            return self.fail(ProtocolError::ProtocolViolation(
                constants::ERR_BEFORE_HANDSHAKE,
            ));
        }

        // An unsupported protocol level is refused on the level byte alone:
        // the negative CONNACK wins even when the rest of the CONNECT is
        // malformed, so full decode only runs for acceptable levels.
        if self.state == ConnectionState::AwaitingHandshake {
            match connect_protocol_level(frame) {
                Ok(level) if level != ACCEPTED_PROTOCOL_LEVEL => {
                    let err = ProtocolError::UnsupportedProtocolLevel(level);
                    warn!(error = %err, "refusing handshake");
                    self.state = ConnectionState::Closed;
                    return vec![
                        Action::Reply(connack(
                            false,
                            ConnectReturnCode::UnacceptableProtocolVersion,
                        )),
                        Action::Close,
                    ];
                }
                Ok(_) => {}
                Err(err) => return self.fail(err),
            }
        }

        let packet = match Packet::decode(frame) {
            Ok(packet) => packet,
            Err(err) => return self.fail(err),
        };

        match packet {
            Packet::Connect(connect) => self.on_connect(connect),
            Packet::Publish(publish) => {
                // No ack at QoS 0; routing is the downstream collaborator's job.
                vec![Action::Emit(Event::Publish(publish))]
            }
            Packet::Subscribe(subscribe) => {
                debug!(topic = %subscribe.topic, qos = subscribe.qos, "subscribe");
                vec![
                    Action::Reply(suback(subscribe.packet_id, subscribe.qos)),
                    Action::Emit(Event::Subscribe {
                        packet_id: subscribe.packet_id,
                        topic: subscribe.topic,
                        qos: subscribe.qos,
                    }),
                ]
            }
            Packet::PingReq => vec![Action::Reply(pingresp())],
            Packet::Disconnect => {
                self.handshake_complete = false;
                self.state = ConnectionState::Closed;
                vec![Action::Emit(Event::Disconnect), Action::Close]
            }
        }
    }

    fn on_connect(&mut self, connect: ConnectPacket) -> Vec<Action> {
        if self.state == ConnectionState::Connected {
            return self.fail(ProtocolError::ProtocolViolation(
                constants::ERR_DUPLICATE_CONNECT,
            ));
        }

        let username = connect.username.as_deref().unwrap_or("");
        let password = connect.password.as_deref().unwrap_or("");

        match self.validator.validate(&connect.client_id, username, password) {
            Ok(identity) => {
                let keep_alive_millis =
                    u64::from(connect.keep_alive_secs) * KEEP_ALIVE_GRACE_MILLIS_PER_SEC;
                self.keep_alive = Duration::from_millis(keep_alive_millis);
                self.handshake_complete = true;
                self.state = ConnectionState::Connected;

                debug!(
                    client_id = %connect.client_id,
                    keep_alive_millis,
                    "handshake accepted"
                );

                vec![
                    Action::Reply(connack(false, ConnectReturnCode::Accepted)),
                    Action::Emit(Event::Connect(HandshakeInfo {
                        client_id: connect.client_id,
                        protocol_name: connect.protocol_name,
                        protocol_level: connect.protocol_level,
                        clean_session: connect.clean_session,
                        keep_alive_secs: connect.keep_alive_secs,
                        keep_alive_millis,
                        identity,
                    })),
                ]
            }
            Err(err) => {
                // Sub-cases stay distinguishable here; the client sees only
                // a refused handshake and a closed socket.
                warn!(
                    error = %err,
                    client_id = %connect.client_id,
                    "credential validation failed, refusing handshake"
                );
                self.state = ConnectionState::Closed;
                vec![
                    Action::Reply(connack(false, ConnectReturnCode::BadCredentials)),
                    Action::Close,
                ]
            }
        }
    }

    fn fail(&mut self, err: ProtocolError) -> Vec<Action> {
        self.state = ConnectionState::Closed;
        vec![
            Action::Emit(Event::ProtocolError(err.to_string())),
            Action::Close,
        ]
    }
}
