//! Broadcast Hub
//!
//! Registry of connected clients. Every client owns an unbounded queue
//! drained by its transport writer, so one slow client never holds up the
//! engine or the others, and messages to a single client keep the order in
//! which the engine produced them.

use std::collections::HashMap;

use bgsync_core::{ClientId, ServerMessage};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Sending half of a client's outbound queue
pub type ClientSender = mpsc::UnboundedSender<ServerMessage>;

/// Receiving half of a client's outbound queue, owned by the transport
pub type ClientReceiver = mpsc::UnboundedReceiver<ServerMessage>;

/// Create the outbound queue for a new connection
pub fn client_channel() -> (ClientSender, ClientReceiver) {
    mpsc::unbounded_channel()
}

#[derive(Debug, Default)]
pub struct BroadcastHub {
    clients: HashMap<ClientId, ClientSender>,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a client. Re-registering an id replaces its queue.
    pub fn register(&mut self, client: ClientId, sender: ClientSender) {
        if self.clients.insert(client, sender).is_some() {
            debug!("Client {} re-registered, previous queue dropped", client);
        }
        info!("Client {} registered ({} connected)", client, self.clients.len());
    }

    /// Remove a client. Unknown ids are ignored.
    pub fn unregister(&mut self, client: ClientId) -> bool {
        let removed = self.clients.remove(&client).is_some();
        if removed {
            info!("Client {} unregistered ({} connected)", client, self.clients.len());
        }
        removed
    }

    /// Queue a message for every client, dropping clients whose queue is
    /// closed. Returns the number of clients reached.
    pub fn notify_all(&mut self, message: &ServerMessage) -> usize {
        let mut closed = Vec::new();
        for (client, sender) in &self.clients {
            if sender.send(message.clone()).is_err() {
                closed.push(*client);
            }
        }

        for client in &closed {
            debug!("Dropping client {} with closed queue", client);
            self.clients.remove(client);
        }

        self.clients.len()
    }

    /// Queue a message for one client. Returns false when the client is
    /// unknown or its queue is closed; a closed client is dropped.
    pub fn notify_one(&mut self, client: ClientId, message: ServerMessage) -> bool {
        let Some(sender) = self.clients.get(&client) else {
            return false;
        };
        if sender.send(message).is_ok() {
            return true;
        }
        debug!("Dropping client {} with closed queue", client);
        self.clients.remove(&client);
        false
    }

    pub fn contains(&self, client: ClientId) -> bool {
        self.clients.contains_key(&client)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
