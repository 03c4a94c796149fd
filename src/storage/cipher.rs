// src/storage/cipher.rs
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use rand::{rngs::OsRng, RngCore};
use sha3::{Digest, Sha3_256};

use super::errors::{Result, StorageError};

/// At-rest cipher for persisted template records. The configured secret is
/// stretched to a 256-bit key with SHA3; each value gets a fresh 96-bit
/// nonce, stored as a prefix of the ciphertext.
pub struct StorageCipher {
    cipher: Aes256Gcm,
}

impl StorageCipher {
    pub fn new(secret: &str) -> Self {
        let hash = Sha3_256::digest(secret.as_bytes());
        let key = Key::<Aes256Gcm>::from_slice(hash.as_slice());

        Self {
            cipher: Aes256Gcm::new(key),
        }
    }

    pub fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut nonce_bytes = [0u8; 12];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, data)
            .map_err(|e| StorageError::Encryption(e.to_string()))?;

        let mut result = Vec::with_capacity(nonce_bytes.len() + ciphertext.len());
        result.extend_from_slice(&nonce_bytes);
        result.extend_from_slice(&ciphertext);

        Ok(result)
    }

    pub fn decrypt(&self, encrypted_data: &[u8]) -> Result<Vec<u8>> {
        if encrypted_data.len() < 12 {
            return Err(StorageError::Decryption(
                "Invalid encrypted data length".to_string(),
            ));
        }

        let (nonce_bytes, ciphertext) = encrypted_data.split_at(12);
        let nonce = Nonce::from_slice(nonce_bytes);

        self.cipher
            .decrypt(nonce, ciphertext)
            .map_err(|e| StorageError::Decryption(e.to_string()))
    }
}
