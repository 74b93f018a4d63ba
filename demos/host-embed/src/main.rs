//! Host/embed RPC demo over an in-process channel pair.
//!
//! Run with: cargo run -p host-embed-demo
//!
//! Wires an embedded peer serving a small roster API to a host-side client,
//! then drives a few calls and tears everything down.

use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use framelink_client::RpcClient;
use framelink_core::{RpcEvent, SessionContext};
use framelink_peer::{CallHandler, EmbeddedPeer, PeerConfig};
use framelink_transport::binding::PortConfig;
use framelink_transport::channel::pair;
use framelink_transport::protocol::Call;

const HOST_ORIGIN: &str = "https://host.example";
const EMBED_ORIGIN: &str = "https://embed.example";

/// Embedded-side handler maintaining the session roster.
struct RosterHandler {
    roster: Mutex<SessionContext>,
}

#[async_trait]
impl CallHandler for RosterHandler {
    async fn handle(&self, call: &Call) -> Result<Option<SessionContext>, String> {
        match call.method.as_str() {
            "ping" => Ok(None),
            "roster.add" => {
                let participant = call
                    .args
                    .first()
                    .cloned()
                    .ok_or_else(|| "roster.add requires a participant".to_string())?;
                let mut roster = self.roster.lock().unwrap();
                roster.participants.push(participant);
                Ok(Some(roster.clone()))
            }
            other => Err(format!("unknown method: {other}")),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let (host, embed) = pair(HOST_ORIGIN, EMBED_ORIGIN);
    let (host_tx, host_rx) = host.split();
    let (embed_tx, embed_rx) = embed.split();

    let initial = SessionContext {
        user: Some(json!({"name": "avery"})),
        participants: vec![],
        facilitators: vec![json!({"name": "drew"})],
    };
    let _peer = EmbeddedPeer::spawn(
        Arc::new(embed_tx),
        embed_rx,
        PeerConfig {
            host_origin: HOST_ORIGIN.to_string(),
            context: initial.clone(),
        },
        Arc::new(RosterHandler {
            roster: Mutex::new(initial),
        }),
    );

    let client = RpcClient::new(PortConfig::default());
    let mut events = client.subscribe();
    client.initialize(PortConfig {
        origin: Some(EMBED_ORIGIN.to_string()),
        source: Some(host_rx),
        target: Some(Arc::new(host_tx)),
    })?;

    // Wait for the peer's handshake.
    while !matches!(events.recv().await?, RpcEvent::Ready) {}
    tracing::info!(context = ?client.context(), "ready");

    client.rpc("ping", vec![]).await?;
    tracing::info!("ping acknowledged");

    let callback = client.rpc("roster.add", vec![json!({"name": "sam"})]).await?;
    let participants = callback
        .context
        .map(|context| context.participants.len())
        .unwrap_or_default();
    tracing::info!(participants, "roster updated");

    if let Err(error) = client.rpc("bogus", vec![]).await {
        tracing::info!("rejected as expected: {error}");
    }

    client.dispose("demo finished");
    Ok(())
}
