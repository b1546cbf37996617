//! Error types for meshtrim

use thiserror::Error;

/// Main error type for meshtrim operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Malformed face {face} in mesh {mesh}: {reason}")]
    MalformedFace {
        mesh: usize,
        face: usize,
        reason: String,
    },

    #[error("Invalid topology: {0}")]
    InvalidTopology(String),

    #[error("Illegal collapse: {0}")]
    IllegalCollapse(String),

    #[error("Stale handle: {0}")]
    StaleHandle(String),

    #[error("Algorithm error: {0}")]
    Algorithm(String),
}

/// Result type alias for meshtrim operations
pub type Result<T> = std::result::Result<T, Error>;
