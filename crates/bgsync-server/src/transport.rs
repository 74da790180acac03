//! WebSocket Transport
//!
//! Accepts WebSocket connections and bridges them to the sync engine: one
//! JSON text frame per message in either direction. Each connection gets a
//! reader loop feeding the engine and a writer task draining the client's
//! ordered outbound queue.

use std::net::SocketAddr;

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, info, warn};

use bgsync_core::ClientId;
use bgsync_runtime::EngineHandle;

use crate::error::Result;

// ----------------------------------------------------------------------------
// WebSocket Server
// ----------------------------------------------------------------------------

pub struct WebSocketServer {
    listener: TcpListener,
    engine: EngineHandle,
}

impl WebSocketServer {
    pub async fn bind(address: &str, engine: EngineHandle) -> Result<Self> {
        let listener = TcpListener::bind(address).await?;
        Ok(Self { listener, engine })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until the listener fails
    pub async fn run(self) -> Result<()> {
        loop {
            let (stream, peer) = self.listener.accept().await?;
            let engine = self.engine.clone();
            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, peer, engine).await {
                    warn!("Connection from {} ended with error: {}", peer, e);
                }
            });
        }
    }
}

// ----------------------------------------------------------------------------
// Connection Handling
// ----------------------------------------------------------------------------

async fn handle_connection(stream: TcpStream, peer: SocketAddr, engine: EngineHandle) -> Result<()> {
    let websocket = accept_async(stream).await?;
    let (mut sink, mut source) = websocket.split();

    let client = ClientId::new();
    let mut outbound = engine.connect(client).await?;
    info!("Client {} connected from {}", client, peer);

    let writer = tokio::spawn(async move {
        while let Some(message) = outbound.recv().await {
            let text = match message.to_json() {
                Ok(text) => text,
                Err(e) => {
                    warn!("Failed to encode message for {}: {}", client, e);
                    continue;
                }
            };
            if let Err(e) = sink.send(Message::Text(text)).await {
                debug!("Write to {} failed: {}", client, e);
                break;
            }
        }
        let _ = sink.close().await;
    });

    while let Some(frame) = source.next().await {
        match frame {
            Ok(Message::Text(text)) => engine.submit_text(client, text).await?,
            Ok(Message::Close(_)) => break,
            // Control frames are answered by tungstenite; binary is not part of the protocol
            Ok(_) => {}
            Err(e) => {
                debug!("Read from {} failed: {}", client, e);
                break;
            }
        }
    }

    info!("Client {} disconnected", client);
    // Unregistering closes the outbound queue, which ends the writer
    if let Err(e) = engine.disconnect(client).await {
        debug!("Engine already stopped: {}", e);
        writer.abort();
    }
    let _ = writer.await;
    Ok(())
}
