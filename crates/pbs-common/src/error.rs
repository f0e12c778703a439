//! Error types shared across the PBS import crates

use thiserror::Error;

/// Result type alias for common operations
pub type Result<T> = std::result::Result<T, PbsError>;

/// Error type for the shared utilities
#[derive(Error, Debug)]
pub enum PbsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Decompression error: {0}")]
    Decompression(String),

    #[error("Unsupported charset: {0}")]
    UnsupportedCharset(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl PbsError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
