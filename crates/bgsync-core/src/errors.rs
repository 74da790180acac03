//! Error types for the board synchronization core
//!
//! `SyncError` unifies everything that can go wrong while validating an
//! inbound message, mutating the board, or touching the persisted ledger.
//! Errors caused by a single client are answered to that client and never
//! stop the engine.

// ----------------------------------------------------------------------------
// Main Error Type
// ----------------------------------------------------------------------------

/// Core error type for board synchronization
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// A field carried a value outside its valid range
    #[error("Invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    /// The envelope `type` tag is not one we route
    #[error("Unknown message type: {message_type}")]
    UnknownMessageType { message_type: String },

    /// The message could not be parsed into the expected shape
    #[error("Malformed message: {reason}")]
    MalformedMessage { reason: String },

    /// Reading or writing the persisted ledger failed
    #[error("Persistence error: {reason}")]
    Persistence { reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Engine or client channel closed
    #[error("Channel error: {message}")]
    Channel { message: String },

    #[error("Configuration error: {reason}")]
    Configuration { reason: String },
}

// ----------------------------------------------------------------------------
// Convenience Error Constructors
// ----------------------------------------------------------------------------

impl SyncError {
    /// Create a validation error for a named field
    pub fn validation<F: Into<String>, R: Into<String>>(field: F, reason: R) -> Self {
        SyncError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a malformed message error
    pub fn malformed<T: Into<String>>(reason: T) -> Self {
        SyncError::MalformedMessage {
            reason: reason.into(),
        }
    }

    /// Create a persistence error
    pub fn persistence<T: Into<String>>(reason: T) -> Self {
        SyncError::Persistence {
            reason: reason.into(),
        }
    }

    /// Create a channel error with a message
    pub fn channel_error<T: Into<String>>(message: T) -> Self {
        SyncError::Channel {
            message: message.into(),
        }
    }

    /// Create a configuration error with a reason
    pub fn config_error<T: Into<String>>(reason: T) -> Self {
        SyncError::Configuration {
            reason: reason.into(),
        }
    }

    /// Short stable identifier sent to clients in error responses
    pub fn kind(&self) -> &'static str {
        match self {
            SyncError::Validation { .. } => "validation",
            SyncError::UnknownMessageType { .. } => "unknown_type",
            SyncError::MalformedMessage { .. } => "malformed",
            SyncError::Persistence { .. } => "persistence",
            SyncError::Serialization(_) => "serialization",
            SyncError::Io(_) => "io",
            SyncError::Channel { .. } => "channel",
            SyncError::Configuration { .. } => "configuration",
        }
    }

    /// Whether the error was caused by the content of a client message
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            SyncError::Validation { .. }
                | SyncError::UnknownMessageType { .. }
                | SyncError::MalformedMessage { .. }
        )
    }
}

// ----------------------------------------------------------------------------
// Type Aliases
// ----------------------------------------------------------------------------

pub type SyncResult<T> = core::result::Result<T, SyncError>;
