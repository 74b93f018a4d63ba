//! Core abstractions for the host/embed RPC layer.
//!
//! This crate provides the fundamental building blocks:
//! - `CallId` / `HANDSHAKE_ID` - Call correlation identifiers
//! - `PostTarget` - Fire-and-forget, origin-scoped send capability
//! - `SessionContext` / `ContextCell` - Shared session context snapshots
//! - `RpcEvent` / `EventChannel` - Lifecycle event broadcast

pub mod context;
pub mod events;
pub mod traits;

pub use context::{ContextCell, SessionContext};
pub use events::{EventChannel, RpcEvent};
pub use traits::{CallId, HANDSHAKE_ID, InboundReceiver, PostTarget, Posted};
