//! Error types for vinyl-player
//!
//! Service-level errors live in [`Error`]. Playback backends report through
//! the narrower [`crate::backend::BackendError`] taxonomy, which never
//! escapes the coordinator.

use thiserror::Error;

/// Main error type for vinyl-player
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP server errors
    #[error("HTTP server error: {0}")]
    Http(String),

    /// Audio decoding errors
    #[error("Audio decode error: {0}")]
    Decode(String),

    /// Audio output device errors
    #[error("Audio output error: {0}")]
    AudioOutput(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors surfaced from the shared crate (config, protocol)
    #[error(transparent)]
    Common(#[from] vinyl_common::Error),
}

/// Convenience Result type using vinyl-player Error
pub type Result<T> = std::result::Result<T, Error>;
