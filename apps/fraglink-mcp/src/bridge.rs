//! # Viewer Bridge
//!
//! WebSocket endpoint the viewer connects to, plus the correlator that
//! pairs tool requests with viewer results. Commands are broadcast to every
//! connected viewer; results settle the single pending request.

use fraglink_core::protocol::{Command, Envelope, WireFrame};
use fraglink_core::{Correlator, FraglinkError};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, mpsc};
use tokio_tungstenite::tungstenite::Message;

/// Shared bridge state: connected viewer channels and the request slot.
pub struct ViewerBridge {
    clients: Mutex<Vec<mpsc::Sender<WireFrame>>>,
    correlator: Correlator,
}

impl ViewerBridge {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            clients: Mutex::new(Vec::new()),
            correlator: Correlator::new(),
        })
    }

    /// Bind the WebSocket endpoint and spawn the accept loop.
    pub async fn listen(self: &Arc<Self>, addr: &str) -> std::io::Result<()> {
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(addr = %addr, "viewer endpoint listening");

        let bridge = self.clone();
        tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, peer)) => {
                        tracing::info!(peer = %peer, "viewer connecting");
                        let bridge = bridge.clone();
                        tokio::spawn(async move {
                            if let Err(e) = bridge.handle_connection(stream).await {
                                tracing::warn!(peer = %peer, error = %e, "viewer connection ended");
                            }
                        });
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "accept failed");
                    }
                }
            }
        });
        Ok(())
    }

    async fn handle_connection(
        self: Arc<Self>,
        stream: TcpStream,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let ws = tokio_tungstenite::accept_async(stream).await?;
        let (mut sink, mut source) = ws.split();

        let (tx, mut rx) = mpsc::channel::<WireFrame>(64);
        self.clients.lock().await.push(tx);

        // Writer half: forward broadcast frames to this socket.
        let writer = tokio::spawn(async move {
            while let Some(frame) = rx.recv().await {
                let message = match frame {
                    WireFrame::Text(text) => Message::Text(text),
                    WireFrame::Binary(bytes) => Message::Binary(bytes),
                };
                if sink.send(message).await.is_err() {
                    break;
                }
            }
        });

        // Reader half: offer inbound text to the correlator.
        while let Some(message) = source.next().await {
            match message? {
                Message::Text(text) => self.handle_text(&text),
                Message::Close(_) => break,
                Message::Binary(_) | Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
            }
        }

        writer.abort();
        Ok(())
    }

    /// Route one inbound text frame. Malformed frames are logged and
    /// dropped; the connection stays up.
    pub fn handle_text(&self, text: &str) {
        match Envelope::parse(text) {
            Ok(envelope) => {
                if !self.correlator.resolve(&envelope) {
                    tracing::debug!(command = %envelope.command, "viewer notification");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "dropping malformed viewer message");
            }
        }
    }

    /// Register an in-process client channel. Used by tests; the accept
    /// loop registers real sockets the same way.
    pub async fn register_client(&self, tx: mpsc::Sender<WireFrame>) {
        self.clients.lock().await.push(tx);
    }

    /// Broadcast a frame to every connected viewer, pruning dead channels.
    pub async fn broadcast(&self, frame: WireFrame) -> Result<(), FraglinkError> {
        let mut clients = self.clients.lock().await;
        clients.retain(|tx| !tx.is_closed());
        if clients.is_empty() {
            return Err(FraglinkError::NoPeerConnected);
        }
        for tx in clients.iter() {
            if tx.send(frame.clone()).await.is_err() {
                tracing::warn!("viewer channel closed mid-send");
            }
        }
        Ok(())
    }

    /// Fire-and-forget command.
    pub async fn send(&self, command: &Command) -> Result<(), FraglinkError> {
        self.broadcast(WireFrame::Text(command.to_text()?)).await
    }

    /// Send a command and await its correlated result.
    pub async fn request(
        &self,
        command: &Command,
        timeout: Duration,
    ) -> Result<serde_json::Value, FraglinkError> {
        let rx = self.correlator.begin()?;
        if let Err(e) = self.send(command).await {
            self.correlator.cancel();
            return Err(e);
        }
        self.correlator.wait(rx, timeout).await
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use fraglink_core::types::ModelIdMap;

    #[tokio::test]
    async fn broadcast_without_viewer_fails() {
        let bridge = ViewerBridge::new();
        let err = bridge
            .send(&Command::ListQueries {})
            .await;
        assert!(matches!(err, Err(FraglinkError::NoPeerConnected)));
    }

    #[tokio::test]
    async fn request_roundtrip_over_in_process_channel() {
        let bridge = ViewerBridge::new();
        let (tx, mut rx) = mpsc::channel(8);
        bridge.register_client(tx).await;

        // Fake viewer: answer the first command with a selection result.
        let viewer = bridge.clone();
        let echo = tokio::spawn(async move {
            let frame = rx.recv().await.unwrap();
            match frame {
                WireFrame::Text(text) => {
                    let envelope = Envelope::parse(&text).unwrap();
                    assert_eq!(envelope.command, "getSelectedElements");
                }
                WireFrame::Binary(_) => panic!("expected a text frame"),
            }
            viewer.handle_text(
                r#"{"command":"selectedElementsResult","payload":{"modelIdMap":{"mcp":[7]},"totalElements":1}}"#,
            );
        });

        let result = bridge
            .request(&Command::GetSelectedElements {}, Duration::from_secs(5))
            .await
            .unwrap();
        echo.await.unwrap();
        assert_eq!(result["totalElements"], 1);
    }

    #[tokio::test(start_paused = true)]
    async fn request_times_out_and_recovers() {
        let bridge = ViewerBridge::new();
        let (tx, _rx) = mpsc::channel(8);
        bridge.register_client(tx).await;

        let err = bridge
            .request(
                &Command::Highlight {
                    model_id_map: ModelIdMap::new(),
                },
                Duration::from_secs(1),
            )
            .await;
        assert!(matches!(err, Err(FraglinkError::Timeout)));

        // The slot is free again.
        assert!(bridge.correlator.begin().is_ok());
    }

    #[tokio::test]
    async fn malformed_viewer_text_is_dropped() {
        let bridge = ViewerBridge::new();
        // Must not panic or poison anything.
        bridge.handle_text("not json at all");
        bridge.handle_text(r#"{"payload":1}"#);
    }
}
