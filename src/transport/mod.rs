//! # Transport Boundary
//!
//! Socket lifecycle management, kept apart from the protocol engine. The
//! listener accepts TCP streams, frames them with the core codec, and
//! forwards decoded events to collaborators; everything protocol-shaped
//! lives below in `core` and `protocol`.

pub mod server;

pub use server::{drive_connection, start_server, start_server_with_shutdown};
