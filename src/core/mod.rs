//! # Core Protocol Components
//!
//! Low-level framing: the remaining-length varint, fixed header parsing,
//! chunk accumulation, and the tokio codec used by the transport.
//!
//! ## Components
//! - **Varint**: remaining-length encode/decode with the 4-byte cap
//! - **Frame**: fixed header parsing and frame extraction
//! - **Reader**: per-connection buffer accumulation
//! - **Codec**: tokio codec for framing over byte streams
//!
//! ## Wire Format
//! ```text
//! [Type/Flags(1)] [RemainingLength(1-4)] [VariableHeader+Payload(N)]
//! ```
//!
//! ## Security
//! - Declared lengths are validated against a cap before allocation
//! - A malformed length field tears down only the offending connection

pub mod codec;
pub mod frame;
pub mod reader;
pub mod varint;
