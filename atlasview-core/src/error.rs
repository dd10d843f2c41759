//! Error types for atlasview

use thiserror::Error;

/// Main error type for atlasview operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Algorithm error: {0}")]
    Algorithm(String),

    /// Requested orientation code is not part of the fixed orientation table
    #[error("Unrecognized orientation: \"{0}\"")]
    UnknownOrientation(String),

    /// A volume source was asked for data before it produced any
    #[error("No volume data: {0}")]
    NoVolumeData(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Result type alias for atlasview operations
pub type Result<T> = std::result::Result<T, Error>;
