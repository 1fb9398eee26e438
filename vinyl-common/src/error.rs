//! Common error types for Vinyl Stack

use thiserror::Error;

/// Common result type for Vinyl Stack operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared across the Vinyl Stack crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON encoding/decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Inbound message could not be turned into a command
    #[error("Malformed command: {0}")]
    MalformedCommand(String),
}
