// src/error.rs

use thiserror::Error;

/// Core error types for Repose
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The database path could not be interpreted
    #[error("Invalid repository path: {0}")]
    InvalidRepoPath(String),

    /// Database extension names a compression we cannot produce
    #[error("Unsupported compression: {0}")]
    UnsupportedCompression(String),

    /// Repository root or pool directory is unusable
    #[error("Pool error: {0}")]
    PoolError(String),

    /// Package metadata could not be parsed
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Repository database could not be read or written
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Signature could not be read, created or checked
    #[error("Signature error: {0}")]
    SignatureError(String),

    /// An explicitly named file does not exist
    #[error("Not found: {0}")]
    NotFound(String),
}

/// Result type alias using Repose's Error type
pub type Result<T> = std::result::Result<T, Error>;
