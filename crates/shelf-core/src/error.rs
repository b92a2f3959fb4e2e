//! Error types for shelf-core

use thiserror::Error;

/// Result type alias using shelf-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in shelf-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Local cache error
    #[error("Cache error: {0}")]
    Cache(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Transport error
    #[error("Transport error: {0}")]
    Transport(#[from] crate::transport::TransportError),

    /// Book not found
    #[error("Book not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
