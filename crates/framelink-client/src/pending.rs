//! Pending-call registry: correlates outbound calls with their callbacks.

use std::collections::HashMap;

use tokio::sync::oneshot;

use framelink_core::CallId;
use framelink_transport::protocol::Callback;

use crate::client::CallError;

/// Outcome delivered to a call's caller.
pub type CallResult = Result<Callback, CallError>;

/// Registry of in-flight calls keyed by correlation id.
///
/// Callback arrival order is unconstrained; the id keyed lookup is what makes
/// concurrently outstanding calls safe.
#[derive(Debug, Default)]
pub struct PendingCalls {
    entries: HashMap<CallId, oneshot::Sender<CallResult>>,
}

impl PendingCalls {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of calls awaiting resolution.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no calls are awaiting resolution.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `rpcid` has an outstanding entry.
    #[must_use]
    pub fn contains(&self, rpcid: CallId) -> bool {
        self.entries.contains_key(&rpcid)
    }

    /// Allocate an entry for `rpcid`; the caller awaits the returned
    /// receiver.
    pub fn register(&mut self, rpcid: CallId) -> oneshot::Receiver<CallResult> {
        let (tx, rx) = oneshot::channel();
        self.entries.insert(rpcid, tx);
        rx
    }

    /// Complete the entry for `rpcid` with `result`, removing it.
    ///
    /// Unknown or already-completed ids are logged and ignored; the remote
    /// peer is untrusted and may deliver duplicates.
    pub fn complete(&mut self, rpcid: CallId, result: CallResult) -> bool {
        match self.entries.remove(&rpcid) {
            Some(tx) => {
                if tx.send(result).is_err() {
                    tracing::debug!(%rpcid, "caller gone before completion");
                }
                true
            }
            None => {
                tracing::warn!(%rpcid, "callback for unknown or completed call, ignoring");
                false
            }
        }
    }

    /// Reject every outstanding entry with a disposal error, then clear.
    pub fn drain(&mut self, reason: &str) {
        for (rpcid, tx) in self.entries.drain() {
            tracing::debug!(%rpcid, "rejecting pending call on disposal");
            let _ = tx.send(Err(CallError::Disposed(reason.to_string())));
        }
    }
}
