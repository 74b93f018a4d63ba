//! Lifecycle event broadcast.

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use crate::context::SessionContext;
use crate::traits::CallId;

/// Broadcast capacity; subscribers lagging past this many events skip ahead.
const EVENT_CAPACITY: usize = 256;

/// Protocol lifecycle notifications.
///
/// A closed set: consumers match on variants rather than subscribing to
/// stringly-named events.
#[derive(Debug, Clone)]
pub enum RpcEvent {
    /// A call envelope is about to be handed to the transport.
    BeforeDispatch {
        /// Correlation id of the call.
        rpcid: CallId,
        /// Remote method name.
        method: String,
    },
    /// The transport accepted a call envelope.
    AfterDispatch { rpcid: CallId, method: String },
    /// A callback matching a pending call was received.
    CallbackReceived { rpcid: CallId },
    /// The context snapshot was replaced.
    ContextChanged {
        /// Snapshot before the change (`None` on the first handshake).
        previous: Option<Arc<SessionContext>>,
        /// Snapshot after the change.
        current: Arc<SessionContext>,
    },
    /// The handshake was observed; the client is ready.
    Ready,
    /// The client was disposed.
    Disposed,
}

/// Publish/subscribe channel for [`RpcEvent`]s.
///
/// Lets consumers observe protocol lifecycle without polling. Events are not
/// replayed: subscribe before driving the protocol.
#[derive(Debug)]
pub struct EventChannel {
    sender: broadcast::Sender<RpcEvent>,
}

impl Default for EventChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl EventChannel {
    /// Create a new event channel.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    /// Emit an event to all current subscribers.
    pub fn emit(&self, event: RpcEvent) {
        let _ = self.sender.send(event); // no subscribers is fine
    }

    /// Get a receiver for subsequent events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<RpcEvent> {
        self.sender.subscribe()
    }

    /// Stream view of subsequent events; lagged gaps are skipped.
    #[must_use]
    pub fn stream(&self) -> futures::stream::BoxStream<'static, RpcEvent> {
        BroadcastStream::new(self.subscribe())
            .filter_map(|res| async move { res.ok() })
            .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_observe_events_in_order() {
        let channel = EventChannel::new();
        let mut rx = channel.subscribe();

        channel.emit(RpcEvent::Ready);
        channel.emit(RpcEvent::Disposed);

        assert!(matches!(rx.recv().await.unwrap(), RpcEvent::Ready));
        assert!(matches!(rx.recv().await.unwrap(), RpcEvent::Disposed));
    }

    #[tokio::test]
    async fn test_stream_view_yields_events() {
        let channel = EventChannel::new();
        let mut stream = channel.stream();

        channel.emit(RpcEvent::CallbackReceived {
            rpcid: CallId::new_v4(),
        });

        assert!(matches!(
            stream.next().await.unwrap(),
            RpcEvent::CallbackReceived { .. }
        ));
    }

    #[test]
    fn test_emit_without_subscribers_is_harmless() {
        EventChannel::new().emit(RpcEvent::Ready);
    }
}
