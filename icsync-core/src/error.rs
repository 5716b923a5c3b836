//! Error types for the icsync ecosystem.

use thiserror::Error;

/// Errors that can occur while preparing or applying a sync.
#[derive(Error, Debug)]
pub enum SyncError {
    /// An event on one side of a comparison has no iCalUID.
    #[error("event has no iCalUID")]
    MissingUid,

    /// Two events on the same side of a comparison share an iCalUID.
    #[error("duplicate iCalUID on one side of a comparison: {0}")]
    DuplicateUid(String),

    #[error("event '{uid}' is missing required field '{field}'")]
    MissingField { uid: String, field: &'static str },

    #[error("ICS parse error: {0}")]
    IcsParse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Session/token problem talking to the remote service.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Remote calendar API failure (whole call or a single batch item).
    #[error("Remote calendar error: {0}")]
    Remote(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for icsync operations.
pub type SyncResult<T> = Result<T, SyncError>;
