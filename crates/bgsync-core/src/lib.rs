//! Shared Backgammon Board Core
//!
//! Foundational types for a server that keeps one backgammon board in sync
//! across every connected client: the game state and its validated
//! mutations, the undo/redo history ledger, best-effort persistence of that
//! ledger, and the JSON wire protocol. Everything here is synchronous; the
//! async engine lives in `bgsync-runtime`.

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod config;
pub mod errors;
pub mod game;
pub mod history;
pub mod persistence;
pub mod protocol;
pub mod types;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use config::{ChannelConfig, NavigationConfig, SyncConfig};
pub use errors::{SyncError, SyncResult};
pub use game::{Board, CheckerPos, Cube, GameState, NO_RESIGN, TURN_ALL_DISABLED, TURN_ALL_ENABLED};
pub use history::{Direction, HistoryLedger};
pub use persistence::{LoadedHistory, PersistedLedger, PersistenceStore};
pub use protocol::{
    ClientMessage, Envelope, ErrorInfo, GameInfo, InboundMessage, NavigationRequest,
    ServerMessage, ServerPayload,
};
pub use types::{
    CheckerId, ClientId, Player, CHECKERS_PER_PLAYER, MAX_DIE_FACE, MAX_POINT, MAX_SLOT,
};
