//! # Identity and Signature Validation
//!
//! Binds a device's declared connection parameters to the gateway's shared
//! secret.
//!
//! ## Components
//! - **Signature**: HMAC-SHA256 password derivation and constant-time
//!   verification
//! - **Identity**: composite client-id parsing, username payload decoding,
//!   and the provisioning-side credential generator
//!
//! ## Security
//! - The shared secret is injected explicitly, never read from ambient state
//! - Absence of a secret degrades to skip-validation mode and is logged
//! - Signature, client-id, and username failures are distinct error
//!   variants so telemetry can tell them apart

pub mod identity;
pub mod signature;

pub use identity::{
    build_connection_credentials, parse_client_id, ConnectionCredentials, CredentialValidator,
    ParsedIdentity,
};
pub use signature::{derive_signature, verify_signature};
