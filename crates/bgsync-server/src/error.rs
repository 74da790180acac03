//! Error handling for the board server

use thiserror::Error;

/// Server-specific error types
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Sync engine error: {0}")]
    Sync(#[from] bgsync_core::SyncError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration loading error: {0}")]
    ConfigLoading(#[from] figment::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialization(#[from] toml::ser::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

/// Result type for server operations
pub type Result<T> = std::result::Result<T, ServerError>;
