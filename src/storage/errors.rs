// src/storage/errors.rs
use thiserror::Error;

use crate::utils::error::CoreError;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("Decryption error: {0}")]
    Decryption(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;

impl From<StorageError> for CoreError {
    fn from(error: StorageError) -> Self {
        CoreError::Store(error.to_string())
    }
}
