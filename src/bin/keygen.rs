//! Signature key generator.
//!
//! Produces a random shared secret for the `MQTT_SIGNATURE_KEY`
//! environment variable. Devices must sign their passwords with the same
//! key, so generate once and distribute through provisioning.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rand::Rng;

const DEFAULT_KEY_BYTES: usize = 32;

fn generate_key(length: usize) -> Vec<u8> {
    let mut key = vec![0u8; length];
    rand::rng().fill(key.as_mut_slice());
    key
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn main() {
    let length = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse::<usize>().ok())
        .filter(|len| *len > 0)
        .unwrap_or(DEFAULT_KEY_BYTES);

    let key = generate_key(length);
    let base64_key = BASE64.encode(&key);

    println!("Generated {length}-byte signature key\n");
    println!("base64 (recommended):");
    println!("  {base64_key}\n");
    println!("hex:");
    println!("  {}\n", hex(&key));
    println!("Usage:");
    println!("  export MQTT_SIGNATURE_KEY=\"{base64_key}\"\n");
    println!("Notes:");
    println!("  - Keep the key secret; anyone holding it can mint device credentials");
    println!("  - The gateway must be restarted for a new key to take effect");
    println!("  - Clients must sign passwords with the same key");
}
