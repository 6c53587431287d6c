//! Composite client identifier parsing and credential construction.
//!
//! A device identifies itself as
//! `"{group_id}@@@{mac_with_underscores}@@@{uuid}"` with a username that is
//! a base64-encoded JSON object and a password derived by
//! [`signature::derive_signature`]. [`CredentialValidator`] checks the
//! whole binding at handshake time; [`build_connection_credentials`] is the
//! provisioning-side inverse.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use tracing::warn;

use crate::auth::signature;
use crate::error::{ProtocolError, Result};

/// Delimiter splitting the composite client id into its three segments.
pub const CLIENT_ID_DELIMITER: &str = "@@@";

/// Structured identity extracted from a validated handshake.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedIdentity {
    /// First client-id segment, the device group.
    pub group_id: String,
    /// Middle segment with underscores restored to colons.
    pub mac_address: String,
    /// Final client-id segment.
    pub uuid: String,
    /// JSON object decoded from the base64 username.
    pub user_data: serde_json::Value,
}

/// Credentials for one device connection, as handed to provisioning.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionCredentials {
    pub client_id: String,
    pub username: String,
    pub password: String,
}

/// Split a composite client id into `(group_id, mac_address, uuid)`.
///
/// The identifier must split into exactly three `@@@`-delimited segments;
/// anything else is a fatal format error, not a recoverable one. The middle
/// segment has underscores converted back to colons to reconstruct the
/// MAC-like address.
pub fn parse_client_id(client_id: &str) -> Result<(String, String, String)> {
    if client_id.is_empty() {
        return Err(ProtocolError::MalformedClientId);
    }

    let mut parts = client_id.split(CLIENT_ID_DELIMITER);
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(group_id), Some(address), Some(uuid), None) => Ok((
            group_id.to_string(),
            address.replace('_', ":"),
            uuid.to_string(),
        )),
        _ => Err(ProtocolError::MalformedClientId),
    }
}

/// Decode a username into its JSON payload.
///
/// The username must be non-empty and base64-decode to valid JSON; either
/// failure is a `MalformedUsername`, kept distinct from client-id format
/// errors so the two stay distinguishable in telemetry.
fn decode_user_data(username: &str) -> Result<serde_json::Value> {
    if username.is_empty() {
        return Err(ProtocolError::MalformedUsername);
    }

    let raw = BASE64
        .decode(username)
        .map_err(|_| ProtocolError::MalformedUsername)?;

    serde_json::from_slice(&raw).map_err(|_| ProtocolError::MalformedUsername)
}

/// Validates the identity binding of an incoming handshake.
///
/// The shared secret is injected explicitly rather than read from ambient
/// state; the validator is cheap to clone and safely shared read-only
/// across all connections.
#[derive(Debug, Clone, Default)]
pub struct CredentialValidator {
    secret: Option<Arc<str>>,
}

impl CredentialValidator {
    /// Build a validator with an optional shared secret.
    ///
    /// `None` degrades to skip-validation mode: identity format checks
    /// still run, but password signatures are not verified.
    pub fn new(secret: Option<String>) -> Self {
        Self {
            secret: secret.map(Arc::from),
        }
    }

    /// Whether password signatures are actually verified.
    pub fn verifies_signatures(&self) -> bool {
        self.secret.is_some()
    }

    /// Validate a handshake's credentials and return the structured identity.
    ///
    /// Checks, in order: the password signature over
    /// `client_id + "|" + username` (when a secret is configured), the
    /// three-segment client-id format, and the base64/JSON username payload.
    ///
    /// # Errors
    /// `SignatureMismatch`, `MalformedClientId`, or `MalformedUsername`;
    /// the caller treats any of them as a hard authentication rejection.
    pub fn validate(
        &self,
        client_id: &str,
        username: &str,
        password: &str,
    ) -> Result<ParsedIdentity> {
        match &self.secret {
            Some(secret) => {
                let content = format!("{client_id}|{username}");
                if !signature::verify_signature(&content, secret, password) {
                    return Err(ProtocolError::SignatureMismatch);
                }
            }
            None => {
                warn!(client_id, "no signature key configured, skipping password validation");
            }
        }

        let (group_id, mac_address, uuid) = parse_client_id(client_id)?;
        let user_data = decode_user_data(username)?;

        Ok(ParsedIdentity {
            group_id,
            mac_address,
            uuid,
            user_data,
        })
    }
}

/// Compose the credentials a device must present to connect.
///
/// Inverse of [`CredentialValidator::validate`]: builds the composite
/// client id (colons in `mac_address` become underscores), base64-encodes
/// `user_data` as the username, and signs `client_id + "|" + username` with
/// the same HMAC derivation the validator checks against.
pub fn build_connection_credentials(
    group_id: &str,
    mac_address: &str,
    uuid: &str,
    user_data: &serde_json::Value,
    secret: &str,
) -> ConnectionCredentials {
    let address = mac_address.replace(':', "_");
    let client_id = format!("{group_id}{CLIENT_ID_DELIMITER}{address}{CLIENT_ID_DELIMITER}{uuid}");
    let username = BASE64.encode(user_data.to_string());
    let password = signature::derive_signature(&format!("{client_id}|{username}"), secret);

    ConnectionCredentials {
        client_id,
        username,
        password,
    }
}
