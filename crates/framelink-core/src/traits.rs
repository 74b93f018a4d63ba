//! Correlation identifiers and the transport capability seam.

use serde_json::Value;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Correlation id linking an outbound call to its eventual callback.
pub type CallId = Uuid;

/// Reserved correlation id for the out-of-band handshake callback.
///
/// The all-zero form is recognized by both peers to exchange initial session
/// context before any explicit call has been made.
pub const HANDSHAKE_ID: CallId = Uuid::nil();

/// A payload observed on the local endpoint, stamped with the sender's origin.
#[derive(Debug, Clone)]
pub struct Posted {
    /// The structured payload, as delivered.
    pub payload: Value,
    /// Origin of the sending endpoint.
    pub origin: String,
}

/// Fire-and-forget send capability of the platform messaging primitive.
///
/// Implementations deliver `payload` to their peer endpoint only when
/// `target_origin` is `"*"` or matches the peer's origin. Delivery offers no
/// acknowledgement and no retry.
pub trait PostTarget: Send + Sync {
    /// Post `payload` to the peer, restricted to `target_origin`.
    fn post(&self, payload: Value, target_origin: &str);
}

/// Receiving side of the platform messaging primitive.
pub type InboundReceiver = mpsc::UnboundedReceiver<Posted>;
