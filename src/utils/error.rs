// src/utils/error.rs
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Template dimension mismatch: stored {stored}, presented {presented}")]
    DimensionMismatch { stored: usize, presented: usize },

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Decoding error: {0}")]
    Decoding(String),

    #[error("Second-factor session expired")]
    SessionExpired,

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Storage error: {0}")]
    Store(String),

    #[error("Device error: {0}")]
    Device(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
