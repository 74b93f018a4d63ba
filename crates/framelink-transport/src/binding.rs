//! Transport binding: the origin triple and its inbound listener.

use std::sync::Arc;

use thiserror::Error;
use tokio::task::JoinHandle;

use framelink_core::{InboundReceiver, PostTarget, Posted};

use crate::protocol::Envelope;

/// A required transport field was missing at initialization.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("transport configuration incomplete: missing `{0}`")]
    Missing(&'static str),
}

/// Partial transport configuration.
///
/// Collected at construction time and completed at initialization; all three
/// fields must be present after the merge before anything may be dispatched.
#[derive(Default)]
pub struct PortConfig {
    /// Enforced origin for outbound posts.
    pub origin: Option<String>,
    /// Local endpoint whose inbound messages are observed.
    pub source: Option<InboundReceiver>,
    /// Remote endpoint envelopes are posted to.
    pub target: Option<Arc<dyn PostTarget>>,
}

impl PortConfig {
    /// Overlay `other` onto `self`; fields present in `other` win.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self {
            origin: other.origin.or(self.origin),
            source: other.source.or(self.source),
            target: other.target.or(self.target),
        }
    }

    /// Name of the first still-missing field, if any.
    #[must_use]
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.origin.is_none() {
            Some("origin")
        } else if self.source.is_none() {
            Some("source")
        } else if self.target.is_none() {
            Some("target")
        } else {
            None
        }
    }
}

impl std::fmt::Debug for PortConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortConfig")
            .field("origin", &self.origin)
            .field("source", &self.source.is_some())
            .field("target", &self.target.is_some())
            .finish()
    }
}

/// An initialized transport binding.
///
/// Owns the configured origin triple and the attached listener task.
/// Dropping the binding detaches the listener.
pub struct Binding {
    target: Arc<dyn PostTarget>,
    origin: String,
    listener: Option<JoinHandle<()>>,
}

impl Binding {
    /// Validate `config` and attach `on_message` as the inbound listener.
    ///
    /// Must be called within a tokio runtime: the listener runs as a spawned
    /// task over the configured source.
    ///
    /// # Errors
    /// Returns [`ConfigError::Missing`] when `origin`, `source`, or `target`
    /// is still absent after the construction/initialization merge.
    pub fn initialize<F>(config: PortConfig, mut on_message: F) -> Result<Self, ConfigError>
    where
        F: FnMut(Posted) + Send + 'static,
    {
        let origin = config.origin.ok_or(ConfigError::Missing("origin"))?;
        let mut source = config.source.ok_or(ConfigError::Missing("source"))?;
        let target = config.target.ok_or(ConfigError::Missing("target"))?;

        let listener = tokio::spawn(async move {
            while let Some(posted) = source.recv().await {
                on_message(posted);
            }
        });

        Ok(Self {
            target,
            origin,
            listener: Some(listener),
        })
    }

    /// Origin outbound posts are restricted to.
    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Post `envelope` to the target, restricted to the configured origin.
    ///
    /// Delivery is fire-and-forget by platform design; there is no retry.
    pub fn send(&self, envelope: &Envelope) {
        match serde_json::to_value(envelope) {
            Ok(payload) => self.target.post(payload, &self.origin),
            Err(e) => tracing::error!("failed to serialize envelope: {e}"),
        }
    }

    /// Detach the listener. Idempotent.
    pub fn teardown(&mut self) {
        if let Some(handle) = self.listener.take() {
            handle.abort();
        }
    }
}

impl Drop for Binding {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    use framelink_core::SessionContext;

    use crate::channel::pair;
    use crate::protocol::{Call, Callback};

    use super::*;

    fn full_config() -> (PortConfig, InboundReceiver) {
        let (host, embed) = pair("https://host.example", "https://embed.example");
        let (host_tx, host_rx) = host.split();
        let (_embed_tx, embed_rx) = embed.split();
        (
            PortConfig {
                origin: Some("https://embed.example".to_string()),
                source: Some(host_rx),
                target: Some(Arc::new(host_tx)),
            },
            embed_rx,
        )
    }

    #[tokio::test]
    async fn test_initialize_requires_all_fields() {
        for field in ["origin", "source", "target"] {
            let (mut config, _embed_rx) = full_config();
            match field {
                "origin" => config.origin = None,
                "source" => config.source = None,
                _ => config.target = None,
            }
            let result = Binding::initialize(config, |_| {});
            match result {
                Err(ConfigError::Missing(missing)) => assert_eq!(missing, field),
                Ok(_) => panic!("initialize succeeded with `{field}` missing"),
            }
        }
    }

    #[test]
    fn test_merge_prefers_later_fields() {
        let base = PortConfig {
            origin: Some("https://a.example".to_string()),
            ..PortConfig::default()
        };
        let merged = base.merge(PortConfig {
            origin: Some("https://b.example".to_string()),
            ..PortConfig::default()
        });
        assert_eq!(merged.origin.as_deref(), Some("https://b.example"));
        assert_eq!(merged.missing_field(), Some("source"));
    }

    #[tokio::test]
    async fn test_send_posts_serialized_envelope() {
        let (config, mut embed_rx) = full_config();
        let binding = Binding::initialize(config, |_| {}).unwrap();

        let rpcid = Uuid::new_v4();
        binding.send(&Envelope::Call(Call::new(rpcid, "ping", vec![json!(1)])));

        let posted = embed_rx.recv().await.unwrap();
        assert_eq!(posted.payload["type"], json!("call"));
        assert_eq!(posted.payload["rpcid"], json!(rpcid.to_string()));
        assert_eq!(posted.payload["method"], json!("ping"));
        assert_eq!(posted.origin, "https://host.example");
    }

    #[tokio::test]
    async fn test_listener_observes_inbound_messages() {
        let (host, embed) = pair("https://host.example", "https://embed.example");
        let (host_tx, host_rx) = host.split();
        let (embed_tx, _embed_rx) = embed.split();

        let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
        let _binding = Binding::initialize(
            PortConfig {
                origin: Some("https://embed.example".to_string()),
                source: Some(host_rx),
                target: Some(Arc::new(host_tx)),
            },
            move |posted| {
                let _ = seen_tx.send(posted);
            },
        )
        .unwrap();

        let callback = Callback::handshake(SessionContext::default());
        embed_tx.post(
            serde_json::to_value(Envelope::Callback(callback)).unwrap(),
            "https://host.example",
        );

        let posted = seen_rx.recv().await.unwrap();
        assert_eq!(posted.payload["type"], json!("callback"));
        assert_eq!(posted.origin, "https://embed.example");
    }

    #[tokio::test]
    async fn test_teardown_is_idempotent() {
        let (config, _embed_rx) = full_config();
        let mut binding = Binding::initialize(config, |_| {}).unwrap();
        binding.teardown();
        binding.teardown();
    }
}
