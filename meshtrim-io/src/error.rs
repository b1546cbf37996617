//! Error types for I/O operations

use thiserror::Error;

/// Errors that can occur during I/O operations
#[derive(Error, Debug)]
pub enum IoError {
    #[error("Unknown input format: '{extension}'")]
    UnknownInputFormat { extension: String },

    #[error("Unknown output format: '{extension}'")]
    UnknownOutputFormat { extension: String },

    #[error("Failed to parse {format} data: {message}")]
    ParseError { format: String, message: String },

    #[error("Write error: {message}")]
    WriteError { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for I/O operations
pub type IoResult<T> = std::result::Result<T, IoError>;

impl IoError {
    pub(crate) fn parse(format: &str, message: impl Into<String>) -> Self {
        IoError::ParseError {
            format: format.to_string(),
            message: message.into(),
        }
    }
}
