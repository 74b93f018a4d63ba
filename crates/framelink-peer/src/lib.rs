//! Embedded-document side of the host/embed RPC protocol.
//!
//! Posts the initial handshake, then serves inbound calls through a
//! [`CallHandler`], replying with callbacks that carry the full current
//! session context.

pub mod handler;
pub mod peer;

pub use handler::{AckHandler, CallHandler};
pub use peer::{EmbeddedPeer, PeerConfig, PeerHandle};
