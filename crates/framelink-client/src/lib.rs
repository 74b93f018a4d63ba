//! Host-side RPC client for driving an embedded document.
//!
//! Provides:
//! - `RpcClient` - call issuance, lifecycle, and context tracking
//! - `PendingCalls` - correlation of callbacks to outstanding calls
//! - `OutboundQueue` - FIFO transmission order

pub mod client;
pub mod pending;
pub mod queue;

pub use client::{CallError, InitError, Phase, RpcClient};
pub use pending::{CallResult, PendingCalls};
pub use queue::OutboundQueue;
