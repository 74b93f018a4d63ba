//! In-process message channel with origin gating.
//!
//! Stands in for the platform's cross-window primitive: fire-and-forget
//! delivery, scoped to a target origin, with inbound payloads stamped with
//! the sender's origin. Lets the protocol run and be tested without a
//! windowing system.

use serde_json::Value;
use tokio::sync::mpsc;

use framelink_core::{InboundReceiver, PostTarget, Posted};

/// Sending half of one channel endpoint.
#[derive(Debug, Clone)]
pub struct ChannelSender {
    local_origin: String,
    peer_origin: String,
    tx: mpsc::UnboundedSender<Posted>,
}

impl PostTarget for ChannelSender {
    fn post(&self, payload: Value, target_origin: &str) {
        if target_origin != "*" && target_origin != self.peer_origin {
            tracing::warn!(
                target_origin,
                peer_origin = %self.peer_origin,
                "dropping post: target origin does not match peer"
            );
            return;
        }
        // Peer may already be gone; fire-and-forget either way.
        let _ = self.tx.send(Posted {
            payload,
            origin: self.local_origin.clone(),
        });
    }
}

/// One endpoint of an in-process channel pair.
#[derive(Debug)]
pub struct ChannelEnd {
    /// Origin of this endpoint.
    pub origin: String,
    sender: ChannelSender,
    inbox: InboundReceiver,
}

impl ChannelEnd {
    /// Split into the send half and the inbound receiver.
    #[must_use]
    pub fn split(self) -> (ChannelSender, InboundReceiver) {
        (self.sender, self.inbox)
    }
}

/// Create two linked endpoints with the given origins.
#[must_use]
pub fn pair(origin_a: &str, origin_b: &str) -> (ChannelEnd, ChannelEnd) {
    let (a_tx, a_rx) = mpsc::unbounded_channel();
    let (b_tx, b_rx) = mpsc::unbounded_channel();

    let a = ChannelEnd {
        origin: origin_a.to_string(),
        sender: ChannelSender {
            local_origin: origin_a.to_string(),
            peer_origin: origin_b.to_string(),
            tx: b_tx,
        },
        inbox: a_rx,
    };
    let b = ChannelEnd {
        origin: origin_b.to_string(),
        sender: ChannelSender {
            local_origin: origin_b.to_string(),
            peer_origin: origin_a.to_string(),
            tx: a_tx,
        },
        inbox: b_rx,
    };
    (a, b)
}
