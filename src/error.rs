//! # Error Types
//!
//! Comprehensive error handling for the gateway protocol core.
//!
//! This module defines all error variants that can occur while terminating a
//! device connection, from low-level I/O errors to protocol violations and
//! credential failures.
//!
//! ## Error Categories
//! - **I/O Errors**: Transport and file system failures
//! - **Framing Errors**: Malformed length fields, oversized packets
//! - **Protocol Errors**: Illegal packet types, handshake violations
//! - **Credential Errors**: Signature mismatches, malformed identities
//!
//! "Not enough bytes buffered yet" is deliberately *not* an error: the frame
//! reader signals it as `Ok(None)` so the transport read loop keeps waiting.
//!
//! All errors implement `std::error::Error` for interoperability.

use std::io;
use thiserror::Error;

/// Error message constants to reduce allocations in error paths.
/// Static strings are borrowed, avoiding heap allocations for common error cases.
pub mod constants {
    /// Framing errors
    pub const ERR_TRUNCATED_FIELD: &str = "Field extends past end of packet";
    pub const ERR_INVALID_UTF8: &str = "String field is not valid UTF-8";
    pub const ERR_INVALID_QOS: &str = "QoS 3 is not a valid quality of service level";
    pub const ERR_MISSING_PACKET_ID: &str = "Packet identifier missing for QoS > 0";
    pub const ERR_TOPIC_TOO_LONG: &str = "Topic exceeds the 2-byte length prefix";

    /// Protocol state errors
    pub const ERR_BEFORE_HANDSHAKE: &str = "Packet received before handshake completed";
    pub const ERR_DUPLICATE_CONNECT: &str = "Second CONNECT on an established connection";
    pub const ERR_SERVER_PACKET: &str = "Server-to-client packet received from a client";
}

/// ProtocolError is the primary error type for all gateway protocol operations.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Malformed remaining length (more than 4 length bytes)")]
    MalformedLength,

    #[error("Packet too large: {0} bytes")]
    OversizedPacket(usize),

    #[error("Unsupported packet type: {0}")]
    UnsupportedPacketType(u8),

    #[error("Unsupported protocol level: {0}")]
    UnsupportedProtocolLevel(u8),

    #[error("Malformed packet: {0}")]
    MalformedPacket(&'static str),

    #[error("Protocol violation: {0}")]
    ProtocolViolation(&'static str),

    #[error("Password signature verification failed")]
    SignatureMismatch,

    #[error("Malformed client id (expected three '@@@'-delimited segments)")]
    MalformedClientId,

    #[error("Malformed username (expected base64-encoded JSON)")]
    MalformedUsername,

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ProtocolError {
    /// Whether this is a credential failure (signature or identity format).
    ///
    /// Every sub-case stays distinguishable in logs, but the client-visible
    /// outcome is identical: the handshake is refused and the socket closed.
    pub fn is_credential_failure(&self) -> bool {
        matches!(
            self,
            ProtocolError::SignatureMismatch
                | ProtocolError::MalformedClientId
                | ProtocolError::MalformedUsername
        )
    }
}

/// Type alias for Results using ProtocolError
pub type Result<T> = std::result::Result<T, ProtocolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_failures_grouped() {
        assert!(ProtocolError::SignatureMismatch.is_credential_failure());
        assert!(ProtocolError::MalformedClientId.is_credential_failure());
        assert!(ProtocolError::MalformedUsername.is_credential_failure());

        assert!(!ProtocolError::MalformedLength.is_credential_failure());
        assert!(!ProtocolError::UnsupportedProtocolLevel(3).is_credential_failure());
    }

    #[test]
    fn test_error_messages_name_the_failure() {
        assert!(ProtocolError::OversizedPacket(16_384).to_string().contains("16384"));
        assert!(ProtocolError::UnsupportedPacketType(5).to_string().contains('5'));
    }
}
