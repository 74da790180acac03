//! Shared Board Sync Runtime
//!
//! The async half of the board server:
//! - `SyncEngine`: the single-writer task that owns the game state and ledger
//! - `Dispatcher`: maps typed inbound messages to mutations or traversals
//! - `BroadcastHub`: per-client ordered outbound queues
//! - `Navigator`: cancellable, paced history traversal
//!
//! Transports only ever hold an `EngineHandle`.

pub mod context;
pub mod dispatcher;
pub mod engine;
pub mod hub;
pub mod navigation;

pub use context::ServerContext;
pub use dispatcher::{Dispatcher, Mutation, Route};
pub use engine::{EngineCommand, EngineHandle, LedgerSnapshot, SyncEngine};
pub use hub::{client_channel, BroadcastHub, ClientReceiver, ClientSender};
pub use navigation::{Navigator, StepOutcome, TraversalId, TraversalPlan, TraversalState};

// Re-export core types for convenience
pub use bgsync_core::{
    ClientId, GameState, InboundMessage, ServerMessage, SyncConfig, SyncError, SyncResult,
};
