//! Call handling for the embedded peer.

use async_trait::async_trait;

use framelink_core::SessionContext;
use framelink_transport::protocol::Call;

/// Handler invoked for every inbound call.
///
/// Implement this trait to expose the embedded document's operations; the
/// peer provides the protocol, the handler provides the behavior.
#[async_trait]
pub trait CallHandler: Send + Sync {
    /// Handle one method invocation.
    ///
    /// Returning `Ok(Some(context))` replaces the session context reported
    /// back to the host from now on; `Ok(None)` keeps the current one. An
    /// `Err` is surfaced to the host as that call's error, without affecting
    /// other calls.
    async fn handle(&self, call: &Call) -> Result<Option<SessionContext>, String>;
}

/// Handler that acknowledges every call without touching the context.
#[derive(Debug, Default, Clone)]
pub struct AckHandler;

#[async_trait]
impl CallHandler for AckHandler {
    async fn handle(&self, _call: &Call) -> Result<Option<SessionContext>, String> {
        Ok(None)
    }
}
