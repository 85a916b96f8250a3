//! `aigent serve` — expose the relay hub over WebSocket.
//!
//! Each incoming text frame is one relay request; each outgoing text frame
//! is one relay event. Within a connection, requests for the same agent are
//! handled in arrival order and requests for different agents run
//! concurrently.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use colored::Colorize;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, error, info, warn};

use aigent_agent::{RelayEvent, RelayHub, RelaySession};
use aigent_core::config::Config;

/// Outgoing events buffered per connection.
const CONNECTION_BUFFER: usize = 64;

/// Run the relay server until Ctrl+C.
pub async fn run(config: &Config, host: Option<String>, port: Option<u16>) -> Result<()> {
    let mut relay = config.relay.clone();
    if let Some(host) = host {
        relay.host = host;
    }
    if let Some(port) = port {
        relay.port = port;
    }

    let addr = format!("{}:{}", relay.host, relay.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    let hub = Arc::new(RelayHub::new());

    println!();
    println!("{}  ws://{addr}", "◆ Aigent relay".cyan().bold());
    println!("{}", "Press Ctrl+C to stop.".dimmed());
    println!();
    info!(addr = %addr, "Relay listening");

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    let hub = hub.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(hub, stream, peer).await {
                            warn!(peer = %peer, error = %e, "Connection ended with error");
                        }
                    });
                }
                Err(e) => error!(error = %e, "Accept failed"),
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down relay");
                break;
            }
        }
    }

    Ok(())
}

async fn handle_connection(hub: Arc<RelayHub>, stream: TcpStream, peer: SocketAddr) -> Result<()> {
    let ws = tokio_tungstenite::accept_async(stream)
        .await
        .context("WebSocket handshake failed")?;
    info!(peer = %peer, "Client connected");

    let (mut write, mut read) = ws.split();
    let (tx, mut rx) = mpsc::channel::<RelayEvent>(CONNECTION_BUFFER);

    let writer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let Some(frame) = event_frame(&event) else {
                continue;
            };
            if write.send(WsMessage::text(frame)).await.is_err() {
                break;
            }
        }
        let _ = write.send(WsMessage::Close(None)).await;
    });

    let mut session = RelaySession::new(hub, tx);
    while let Some(frame) = read.next().await {
        match frame {
            Ok(WsMessage::Text(text)) => session.submit(text.as_str()).await,
            Ok(WsMessage::Close(_)) => break,
            Ok(other) => debug!(peer = %peer, kind = ?other, "Ignoring non-text frame"),
            Err(e) => {
                warn!(peer = %peer, error = %e, "WebSocket read failed");
                break;
            }
        }
    }

    // Queued requests still run; the writer closes once they are done.
    session.finish().await;
    let _ = writer.await;
    info!(peer = %peer, "Client disconnected");
    Ok(())
}

/// Serialize an event into a text frame.
fn event_frame(event: &RelayEvent) -> Option<String> {
    match serde_json::to_string(event) {
        Ok(frame) => Some(frame),
        Err(e) => {
            error!(error = %e, "Failed to serialize relay event");
            None
        }
    }
}
