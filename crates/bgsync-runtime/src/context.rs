//! Server Context
//!
//! Everything the single writer owns: the live game state, the history
//! ledger, the client registry and the persistence store. Only the engine
//! task holds a `ServerContext`, which is what serializes all access.

use bgsync_core::{
    ClientId, Direction, GameState, HistoryLedger, PersistenceStore, ServerMessage, SyncConfig,
    SyncError, SyncResult,
};
use tracing::{debug, error, info, warn};

use crate::dispatcher::Mutation;
use crate::hub::{BroadcastHub, ClientSender};

pub struct ServerContext {
    state: GameState,
    ledger: HistoryLedger,
    hub: BroadcastHub,
    store: PersistenceStore,
}

impl ServerContext {
    /// Restore the ledger from the data file, or start from a fresh game
    pub fn open(config: &SyncConfig) -> Self {
        let store = PersistenceStore::new(config.data_file.clone(), config.server_id.clone());
        info!(
            "Persisting ledger '{}' to {}",
            store.server_id(),
            store.path().display()
        );
        let loaded = store.load();

        let ledger = match HistoryLedger::from_parts(loaded.history, loaded.redo) {
            Some(ledger) => {
                info!(
                    "Restored {} history entries ({} redo) for '{}'",
                    ledger.history().len(),
                    ledger.redo().len(),
                    config.server_id
                );
                ledger
            }
            None => {
                info!("Starting fresh history for '{}'", config.server_id);
                HistoryLedger::new(GameState::new(config.server_version.clone()))
            }
        };

        Self {
            state: ledger.current().clone(),
            ledger,
            hub: BroadcastHub::new(),
            store,
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn ledger(&self) -> &HistoryLedger {
        &self.ledger
    }

    pub fn hub(&self) -> &BroadcastHub {
        &self.hub
    }

    /// `(hist_i, hist_n)` sent with every state push
    pub fn indices(&self) -> (usize, usize) {
        (self.ledger.position(), self.ledger.total())
    }

    // ------------------------------------------------------------------------
    // Clients
    // ------------------------------------------------------------------------

    /// Register a client and push the current state to it alone
    pub fn connect(&mut self, client: ClientId, sender: ClientSender) {
        self.hub.register(client, sender);
        let (hist_i, hist_n) = self.indices();
        let message = ServerMessage::gameinfo_to(client, self.state.clone(), 0.0, hist_i, hist_n);
        if !self.hub.notify_one(client, message) {
            debug!("Client {} left before the initial push", client);
        }
    }

    pub fn disconnect(&mut self, client: ClientId) {
        self.hub.unregister(client);
    }

    /// Answer a rejected message to its sender only
    pub fn reject(&mut self, client: ClientId, err: &SyncError) {
        if err.is_client_error() {
            warn!("Rejected message from {}: {}", client, err);
        } else {
            error!("Failed to handle message from {}: {}", client, err);
        }
        self.hub.notify_one(client, ServerMessage::error_to(client, err));
    }

    // ------------------------------------------------------------------------
    // State Changes
    // ------------------------------------------------------------------------

    /// Run a mutation against a scratch copy of the live state. Nothing
    /// shared is touched until the result is passed to `install`.
    pub fn prepare(&self, mutation: Mutation) -> SyncResult<GameState> {
        let mut scratch = self.state.clone();
        mutation.apply(&mut scratch)
    }

    /// Make a prepared snapshot live, optionally commit it, and broadcast it
    pub fn install(&mut self, next: GameState, commit: bool, animation_secs: f64) {
        self.state = next;

        if commit {
            if let Some(sn) = self.ledger.commit(self.state.clone()) {
                self.state.sn = sn;
                debug!("Committed sn={}", sn);
            }
            self.save();
        }

        self.broadcast(animation_secs);
    }

    /// Move one entry in `direction` and broadcast it. Returns false, with
    /// nothing broadcast, when that stack is exhausted.
    pub fn step(&mut self, direction: Direction, animation_secs: f64) -> bool {
        let Some(current) = self.ledger.step(direction) else {
            return false;
        };
        self.state = current.clone();
        self.broadcast(animation_secs);
        true
    }

    pub fn can_step(&self, direction: Direction) -> bool {
        self.ledger.can_step(direction)
    }

    /// Best-effort write of both ledger stacks
    pub fn save(&self) {
        self.store.save(self.ledger.history(), self.ledger.redo());
    }

    fn broadcast(&mut self, animation_secs: f64) {
        let (hist_i, hist_n) = self.indices();
        let message =
            ServerMessage::broadcast_gameinfo(self.state.clone(), animation_secs, hist_i, hist_n);
        let reached = self.hub.notify_all(&message);
        debug!(
            "Broadcast sn={} hist={}/{} to {} clients",
            self.state.sn, hist_i, hist_n, reached
        );
    }
}
