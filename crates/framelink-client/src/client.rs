//! Host-side RPC client.
//!
//! Drives the embedded peer: issues calls in a strict transmission order,
//! correlates callbacks to pending calls, tracks the shared session context,
//! and broadcasts lifecycle events.

use std::sync::{Arc, Mutex, MutexGuard};

use thiserror::Error;
use tokio::sync::{broadcast, oneshot};
use uuid::Uuid;

use framelink_core::{ContextCell, EventChannel, Posted, RpcEvent, SessionContext};
use framelink_transport::binding::{Binding, ConfigError, PortConfig};
use framelink_transport::protocol::{Call, Callback, Envelope};

use crate::pending::{CallResult, PendingCalls};
use crate::queue::OutboundQueue;

/// Protocol phase of the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Constructed; calls queue but nothing is sent.
    Uninitialized,
    /// Transport bound; calls flow.
    Initialized,
    /// Handshake observed; shared context available.
    Ready,
    /// Torn down. Terminal.
    Disposed,
}

/// Error surfaced to a single call's caller.
///
/// Never fatal to the client: other in-flight calls are unaffected.
#[derive(Debug, Clone, Error)]
pub enum CallError {
    /// Dispatch was attempted before the transport binding existed.
    #[error("client is not initialized")]
    NotInitialized,
    /// The remote peer answered this call with an error.
    #[error("remote call failed: {0}")]
    Remote(String),
    /// The client was disposed while the call was outstanding.
    #[error("client disposed: {0}")]
    Disposed(String),
}

/// Error surfaced by [`RpcClient::initialize`].
#[derive(Debug, Error)]
pub enum InitError {
    /// A required transport field was still missing after the merge.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The client is already initialized.
    #[error("client is already initialized")]
    AlreadyInitialized,
    /// The client was disposed.
    #[error("client is disposed")]
    Disposed,
}

struct State {
    phase: Phase,
    base_config: PortConfig,
    binding: Option<Binding>,
    queue: OutboundQueue,
    pending: PendingCalls,
    handshakes_seen: u32,
    dispose_reason: Option<String>,
}

struct Inner {
    state: Mutex<State>,
    events: EventChannel,
    context: ContextCell,
}

/// Host-side RPC client over a cross-document message channel.
///
/// All internal state lives behind one mutex that is never held across an
/// await; the only suspension point is a caller awaiting its callback.
pub struct RpcClient {
    inner: Arc<Inner>,
}

impl RpcClient {
    /// Create a client holding `base_config`, completed later by
    /// [`initialize`](Self::initialize).
    #[must_use]
    pub fn new(base_config: PortConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    phase: Phase::Uninitialized,
                    base_config,
                    binding: None,
                    queue: OutboundQueue::new(),
                    pending: PendingCalls::new(),
                    handshakes_seen: 0,
                    dispose_reason: None,
                }),
                events: EventChannel::new(),
                context: ContextCell::new(),
            }),
        }
    }

    /// Complete the configuration, attach the inbound listener, and flush
    /// any calls queued before initialization.
    ///
    /// Must be called within a tokio runtime (the listener is a spawned
    /// task). On a configuration error the merged partial configuration is
    /// retained, so a later attempt may supply just the missing fields.
    ///
    /// # Errors
    /// [`InitError::Config`] when a transport field is missing after the
    /// merge; [`InitError::AlreadyInitialized`] on a second initialization;
    /// [`InitError::Disposed`] after disposal.
    pub fn initialize(&self, config: PortConfig) -> Result<(), InitError> {
        let mut state = self.inner.lock_state();
        match state.phase {
            Phase::Uninitialized => {}
            Phase::Initialized | Phase::Ready => return Err(InitError::AlreadyInitialized),
            Phase::Disposed => return Err(InitError::Disposed),
        }

        let base = std::mem::take(&mut state.base_config);
        let merged = base.merge(config);
        if let Some(field) = merged.missing_field() {
            state.base_config = merged;
            return Err(ConfigError::Missing(field).into());
        }

        let inner = Arc::clone(&self.inner);
        let binding = Binding::initialize(merged, move |posted| inner.on_posted(posted))?;

        state.binding = Some(binding);
        state.phase = Phase::Initialized;
        tracing::debug!(queued = state.queue.len(), "transport bound");
        Inner::pump(&self.inner.events, &mut state);
        Ok(())
    }

    /// Issue a call: register it, queue its envelope, and run the
    /// dispatcher. Returns the receiver the caller awaits.
    ///
    /// Calls issued before initialization stay queued and are sent once the
    /// transport is bound. There is no automatic timeout; disposal is the
    /// only cancellation path.
    ///
    /// # Errors
    /// [`CallError::Disposed`] when the client is already disposed.
    pub fn issue(
        &self,
        method: impl Into<String>,
        args: Vec<serde_json::Value>,
    ) -> Result<oneshot::Receiver<CallResult>, CallError> {
        let mut state = self.inner.lock_state();
        if state.phase == Phase::Disposed {
            return Err(CallError::Disposed(state.dispose_reason_or_default()));
        }

        let rpcid = Uuid::new_v4();
        let rx = state.pending.register(rpcid);
        state.queue.enqueue(Call::new(rpcid, method, args));
        Inner::pump(&self.inner.events, &mut state);
        Ok(rx)
    }

    /// Invoke `method` on the remote peer and await its callback.
    ///
    /// # Errors
    /// [`CallError::Remote`] when the callback carries an error;
    /// [`CallError::Disposed`] when the client is disposed before the
    /// callback arrives.
    pub async fn rpc(
        &self,
        method: impl Into<String>,
        args: Vec<serde_json::Value>,
    ) -> Result<Callback, CallError> {
        let rx = self.issue(method, args)?;
        match rx.await {
            Ok(result) => result,
            // Sender dropped without completing: the client went away
            // without running disposal.
            Err(_) => Err(CallError::Disposed("client dropped".to_string())),
        }
    }

    /// Pop and transmit the head of the outbound queue.
    ///
    /// Returns `Ok(true)` when an envelope was sent, `Ok(false)` when the
    /// queue was empty.
    ///
    /// # Errors
    /// [`CallError::NotInitialized`] when no transport binding exists yet
    /// (fatal to that dispatch, not to the client);
    /// [`CallError::Disposed`] after disposal.
    pub fn dispatch_next(&self) -> Result<bool, CallError> {
        let mut state = self.inner.lock_state();
        Inner::dispatch_next(&self.inner.events, &mut state)
    }

    /// Latest context snapshot, or `None` before the first handshake.
    #[must_use]
    pub fn context(&self) -> Option<Arc<SessionContext>> {
        self.inner.context.current()
    }

    /// Current protocol phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.inner.lock_state().phase
    }

    /// Number of calls transmitted (or queued) but not yet answered.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.inner.lock_state().pending.len()
    }

    /// Number of calls queued but not yet handed to the transport.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.inner.lock_state().queue.len()
    }

    /// Subscribe to lifecycle events.
    ///
    /// Events are not replayed: subscribe before initializing to observe the
    /// handshake.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<RpcEvent> {
        self.inner.events.subscribe()
    }

    /// Tear down the client: clear the queue, reject every pending call,
    /// detach the listener, and emit `Disposed`.
    ///
    /// Redundant disposal is a no-op.
    pub fn dispose(&self, reason: &str) {
        self.inner.dispose(reason);
    }
}

impl Drop for RpcClient {
    fn drop(&mut self) {
        self.inner.dispose("client dropped");
    }
}

impl State {
    fn dispose_reason_or_default(&self) -> String {
        self.dispose_reason
            .clone()
            .unwrap_or_else(|| "disposed".to_string())
    }
}

impl Inner {
    fn lock_state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    fn dispatch_next(events: &EventChannel, state: &mut State) -> Result<bool, CallError> {
        if state.phase == Phase::Disposed {
            return Err(CallError::Disposed(state.dispose_reason_or_default()));
        }
        if state.binding.is_none() {
            return Err(CallError::NotInitialized);
        }
        let Some(call) = state.queue.pop() else {
            return Ok(false);
        };

        events.emit(RpcEvent::BeforeDispatch {
            rpcid: call.rpcid,
            method: call.method.clone(),
        });
        if let Some(binding) = state.binding.as_ref() {
            binding.send(&Envelope::Call(call.clone()));
        }
        events.emit(RpcEvent::AfterDispatch {
            rpcid: call.rpcid,
            method: call.method,
        });
        Ok(true)
    }

    /// Run the dispatcher until the queue is empty. Quietly leaves calls
    /// queued when the transport is not bound yet.
    fn pump(events: &EventChannel, state: &mut State) {
        if state.binding.is_none() {
            return;
        }
        while let Ok(true) = Self::dispatch_next(events, state) {}
    }

    /// Inbound listener: classify and process one delivered payload.
    fn on_posted(&self, posted: Posted) {
        let mut state = self.lock_state();
        if state.phase == Phase::Disposed {
            return;
        }

        // Origin discipline: the configured origin gates inbound traffic
        // too (the two coincide in the host/embed topology).
        if let Some(binding) = state.binding.as_ref() {
            let expected = binding.origin();
            if expected != "*" && posted.origin != expected {
                tracing::warn!(
                    origin = %posted.origin,
                    expected,
                    "discarding message from unexpected origin"
                );
                return;
            }
        }

        let envelope: Envelope = match serde_json::from_value(posted.payload) {
            Ok(envelope) => envelope,
            Err(_) => {
                // Other message kinds share this transport.
                tracing::debug!("ignoring non-protocol message");
                return;
            }
        };

        match envelope {
            Envelope::Call(call) => {
                tracing::debug!(method = %call.method, "host does not serve calls, ignoring");
            }
            Envelope::Callback(callback) if callback.is_handshake() => {
                self.on_handshake(&mut state, callback);
            }
            Envelope::Callback(callback) => {
                self.on_callback(&mut state, callback);
            }
        }
    }

    fn on_handshake(&self, state: &mut State, callback: Callback) {
        state.handshakes_seen += 1;
        if state.handshakes_seen > 1 {
            // Not rejected: a repeat handshake is an ordinary context
            // refresh. Logged since a chatty peer may indicate a bug on the
            // embedded side.
            tracing::warn!(count = state.handshakes_seen, "repeated handshake from peer");
        }
        if let Some(context) = callback.context {
            self.replace_context(context);
        }
        if state.phase == Phase::Initialized {
            state.phase = Phase::Ready;
            self.events.emit(RpcEvent::Ready);
        }
    }

    fn on_callback(&self, state: &mut State, callback: Callback) {
        if !state.pending.contains(callback.rpcid) {
            tracing::warn!(
                rpcid = %callback.rpcid,
                "callback for unknown or completed call, ignoring"
            );
            return;
        }

        if let Some(context) = callback.context.clone() {
            self.replace_context(context);
        }
        self.events.emit(RpcEvent::CallbackReceived {
            rpcid: callback.rpcid,
        });

        let result: CallResult = if let Some(message) = callback.error.clone() {
            Err(CallError::Remote(message))
        } else {
            Ok(callback.clone())
        };
        state.pending.complete(callback.rpcid, result);
        Self::pump(&self.events, state);
    }

    fn replace_context(&self, context: SessionContext) {
        let (previous, current) = self.context.replace(context);
        self.events.emit(RpcEvent::ContextChanged { previous, current });
    }

    fn dispose(&self, reason: &str) {
        let mut state = self.lock_state();
        if state.phase == Phase::Disposed {
            return;
        }
        state.phase = Phase::Disposed;
        state.dispose_reason = Some(reason.to_string());

        let dropped = state.queue.clear();
        if dropped > 0 {
            tracing::debug!(dropped, "cleared outbound queue on disposal");
        }
        state.pending.drain(reason);
        if let Some(mut binding) = state.binding.take() {
            binding.teardown();
        }
        self.events.emit(RpcEvent::Disposed);
    }
}
