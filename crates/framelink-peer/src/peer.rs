//! The embedded protocol peer: handshake plus serve loop.

use std::sync::Arc;

use tokio::task::JoinHandle;

use framelink_core::{InboundReceiver, PostTarget, SessionContext};
use framelink_transport::protocol::{Callback, Envelope};

use crate::handler::CallHandler;

/// Configuration for an embedded peer.
#[derive(Debug, Clone)]
pub struct PeerConfig {
    /// Origin of the host the peer posts back to.
    pub host_origin: String,
    /// Initial session context announced in the handshake.
    pub context: SessionContext,
}

/// Handle to a running embedded peer.
#[derive(Debug)]
pub struct PeerHandle {
    task: Option<JoinHandle<()>>,
}

impl PeerHandle {
    /// Stop serving. Idempotent; also happens on drop.
    pub fn shutdown(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for PeerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// The embedded-document protocol peer.
pub struct EmbeddedPeer;

impl EmbeddedPeer {
    /// Post the handshake and start serving calls from `source`.
    ///
    /// The handshake goes out before the serve loop starts, so the host
    /// observes the initial context before any reply. Must be called within
    /// a tokio runtime.
    pub fn spawn(
        target: Arc<dyn PostTarget>,
        mut source: InboundReceiver,
        config: PeerConfig,
        handler: Arc<dyn CallHandler>,
    ) -> PeerHandle {
        let PeerConfig {
            host_origin,
            context,
        } = config;

        send_callback(&*target, &host_origin, Callback::handshake(context.clone()));

        let task = tokio::spawn(async move {
            let mut context = context;
            while let Some(posted) = source.recv().await {
                let envelope: Envelope = match serde_json::from_value(posted.payload) {
                    Ok(envelope) => envelope,
                    Err(_) => {
                        // Other message kinds share this transport.
                        tracing::debug!("ignoring non-protocol message");
                        continue;
                    }
                };
                match envelope {
                    Envelope::Call(call) => {
                        let callback = match handler.handle(&call).await {
                            Ok(updated) => {
                                if let Some(updated) = updated {
                                    context = updated;
                                }
                                Callback::success(call.rpcid, Some(context.clone()))
                            }
                            Err(message) => {
                                tracing::debug!(
                                    method = %call.method,
                                    "call handler failed: {message}"
                                );
                                Callback::failure(call.rpcid, message, Some(context.clone()))
                            }
                        };
                        send_callback(&*target, &host_origin, callback);
                    }
                    Envelope::Callback(_) => {
                        tracing::debug!("peer does not await callbacks, ignoring");
                    }
                }
            }
        });

        PeerHandle { task: Some(task) }
    }
}

fn send_callback(target: &dyn PostTarget, host_origin: &str, callback: Callback) {
    match serde_json::to_value(Envelope::Callback(callback)) {
        Ok(payload) => target.post(payload, host_origin),
        Err(e) => tracing::error!("failed to serialize callback: {e}"),
    }
}
