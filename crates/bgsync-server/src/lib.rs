//! Board server library
//!
//! Command line parsing, configuration loading and the WebSocket transport
//! around the sync engine of `bgsync-runtime`.

pub mod cli;
pub mod config;
pub mod error;
pub mod transport;

pub use cli::Cli;
pub use config::{AppConfig, ListenConfig};
pub use error::{Result, ServerError};
pub use transport::WebSocketServer;
