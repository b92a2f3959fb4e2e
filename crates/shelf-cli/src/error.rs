use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] shelf_core::Error),
    #[error(transparent)]
    Transport(#[from] shelf_core::transport::TransportError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Book not found: {0}")]
    BookNotFound(String),
    #[error("No conflict recorded for id: {0}. Run `shelf sync` first to surface conflicts.")]
    ConflictNotFound(String),
    #[error("Book name cannot be empty")]
    EmptyName,
    #[error("Invalid date '{0}'; expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("Configuration error: {0}")]
    Config(String),
}
