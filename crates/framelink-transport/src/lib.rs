//! Transport layer for host/embed RPC.
//!
//! Provides:
//! - Wire protocol (tagged JSON envelopes)
//! - In-process channel pair with origin gating
//! - Transport binding (origin triple + inbound listener)

pub mod binding;
pub mod channel;
pub mod protocol;

pub use binding::{Binding, ConfigError, PortConfig};
pub use channel::{ChannelEnd, ChannelSender, pair};
pub use protocol::{Call, Callback, Envelope};
