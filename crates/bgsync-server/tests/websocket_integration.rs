//! End-to-end tests over real WebSocket connections
//!
//! Binds the server on an ephemeral local port and talks to it with
//! `tokio-tungstenite` clients, the way browser clients do.

use std::time::Duration;

use bgsync_core::SyncConfig;
use bgsync_runtime::{ClientId, SyncEngine};
use bgsync_server::{Result, WebSocketServer};
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ----------------------------------------------------------------------------
// Test Utilities
// ----------------------------------------------------------------------------

async fn start_server() -> Result<String> {
    let data_file = std::env::temp_dir()
        .join(format!("bgsync-ws-{}", ClientId::new()))
        .join("ledger.json");
    let (engine, _task) = SyncEngine::spawn(SyncConfig::testing(data_file))?;

    let server = WebSocketServer::bind("127.0.0.1:0", engine).await?;
    let url = format!("ws://{}", server.local_addr()?);
    tokio::spawn(server.run());
    Ok(url)
}

async fn connect(url: &str) -> Client {
    let (client, _response) = connect_async(url).await.expect("server accepts");
    client
}

async fn next_json(client: &mut Client) -> Value {
    loop {
        let frame = timeout(Duration::from_secs(2), client.next())
            .await
            .expect("frame within timeout")
            .expect("stream open")
            .expect("valid frame");
        if let Message::Text(text) = frame {
            return serde_json::from_str(&text).expect("server sends JSON");
        }
    }
}

async fn send_json(client: &mut Client, value: Value) {
    client
        .send(Message::Text(value.to_string()))
        .await
        .expect("send frame");
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[tokio::test]
async fn test_state_is_shared_between_connections() -> Result<()> {
    let url = start_server().await?;
    let mut alice = connect(&url).await;
    let mut bob = connect(&url).await;

    let initial = next_json(&mut alice).await;
    assert_eq!(initial["src"], "server");
    assert_eq!(initial["type"], "gameinfo");
    assert_eq!(initial["data"]["hist_i"], 1);
    assert_ne!(initial["dst"], "all");
    next_json(&mut bob).await;

    send_json(
        &mut alice,
        json!({ "type": "put_checker", "data": { "ch": 0, "p": 1, "idx": 0 }, "history": true }),
    )
    .await;

    for client in [&mut alice, &mut bob] {
        let update = next_json(client).await;
        assert_eq!(update["dst"], "all");
        assert_eq!(update["data"]["gameinfo"]["board"]["checker"][0][0], json!([1, 0]));
        assert_eq!(update["data"]["gameinfo"]["sn"], 2);
        assert_eq!(update["data"]["hist_n"], 2);
    }

    send_json(&mut bob, json!({ "type": "back" })).await;
    let back = next_json(&mut alice).await;
    assert_eq!(back["data"]["gameinfo"]["board"]["checker"][0][0], json!([6, 0]));
    assert_eq!(back["data"]["hist_i"], 1);
    Ok(())
}

#[tokio::test]
async fn test_bad_message_gets_error_frame() -> Result<()> {
    let url = start_server().await?;
    let mut client = connect(&url).await;
    let initial = next_json(&mut client).await;

    send_json(&mut client, json!({ "type": "shuffle", "data": {} })).await;
    let reply = next_json(&mut client).await;
    assert_eq!(reply["type"], "error");
    assert_eq!(reply["dst"], initial["dst"]);
    assert_eq!(reply["data"]["kind"], "unknown_type");
    Ok(())
}

#[tokio::test]
async fn test_closed_connection_does_not_affect_others() -> Result<()> {
    let url = start_server().await?;
    let mut stays = connect(&url).await;
    let mut leaves = connect(&url).await;
    next_json(&mut stays).await;
    next_json(&mut leaves).await;

    leaves.close(None).await.expect("close handshake");
    drop(leaves);

    send_json(
        &mut stays,
        json!({ "type": "set_banner", "data": { "player": 0, "text": "hello" } }),
    )
    .await;
    let update = next_json(&mut stays).await;
    assert_eq!(update["data"]["gameinfo"]["text"][0], "hello");
    Ok(())
}
