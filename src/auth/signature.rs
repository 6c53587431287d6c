//! Password signature derivation and verification.
//!
//! A device's password is `base64(HMAC-SHA256(client_id + "|" + username,
//! shared_secret))`. Both the runtime validation path and the provisioning
//! generator go through [`derive_signature`], keeping the two byte-identical
//! and therefore interoperable.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Derive the base64-encoded HMAC-SHA256 signature of `content` under `secret`.
pub fn derive_signature(content: &str, secret: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC can take a key of any size");
    mac.update(content.as_bytes());
    BASE64.encode(mac.finalize().into_bytes())
}

/// Verify a supplied base64 signature against `content` and `secret`.
///
/// The MAC comparison runs in constant time via `Mac::verify_slice`; a
/// password that is not valid base64 fails outright.
pub fn verify_signature(content: &str, secret: &str, supplied: &str) -> bool {
    let Ok(raw) = BASE64.decode(supplied) else {
        return false;
    };

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC can take a key of any size");
    mac.update(content.as_bytes());
    mac.verify_slice(&raw).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derivation_is_deterministic() {
        let a = derive_signature("client|user", "secret");
        let b = derive_signature("client|user", "secret");
        assert_eq!(a, b);
    }

    #[test]
    fn test_signature_symmetry() {
        let sig = derive_signature("client|user", "secret");
        assert!(verify_signature("client|user", "secret", &sig));
    }

    #[test]
    fn test_different_secret_fails() {
        let sig = derive_signature("client|user", "secret");
        assert!(!verify_signature("client|user", "other-secret", &sig));
    }

    #[test]
    fn test_corrupted_signature_fails() {
        let sig = derive_signature("client|user", "secret");
        let mut raw = BASE64.decode(&sig).expect("own output decodes");
        for i in 0..raw.len() {
            raw[i] ^= 0x01;
            let corrupted = BASE64.encode(&raw);
            assert!(
                !verify_signature("client|user", "secret", &corrupted),
                "byte {i} flip went undetected"
            );
            raw[i] ^= 0x01;
        }
    }

    #[test]
    fn test_non_base64_password_fails() {
        assert!(!verify_signature("client|user", "secret", "not base64 !!!"));
    }
}
