// src/storage/template_store.rs
use chrono::Utc;
use rocksdb::{Options, DB};
use tokio::sync::Mutex;

use super::cipher::StorageCipher;
use super::errors::StorageError;
use crate::core::template::{codec, EnrolledFactors, Modality, TemplateRecord};
use crate::utils::config::StorageConfig;
use crate::utils::error::Result;

/// Keyed storage of one fingerprint template and one face template per
/// enrolled identity. Templates are encoded through the codec and encrypted
/// at rest; a record is written with a single atomic put, so readers never
/// observe it mid-update.
pub struct TemplateStore {
    db: DB,
    cipher: StorageCipher,
    // Serializes read-modify-write cycles for upserts. Last writer wins.
    write_lock: Mutex<()>,
}

impl TemplateStore {
    pub fn new(config: &StorageConfig) -> std::result::Result<Self, StorageError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);

        let db = DB::open(&opts, &config.path)
            .map_err(|e| StorageError::Database(e.to_string()))?;

        Ok(Self {
            db,
            cipher: StorageCipher::new(&config.encryption_key),
            write_lock: Mutex::new(()),
        })
    }

    pub async fn upsert_fingerprint(&self, identity: &str, template: &[f32]) -> Result<()> {
        let blob = codec::encode(template)?;
        self.upsert(identity, Modality::Fingerprint, blob).await
    }

    pub async fn upsert_face(&self, identity: &str, template: &[f32]) -> Result<()> {
        let blob = codec::encode(template)?;
        self.upsert(identity, Modality::Face, blob).await
    }

    async fn upsert(&self, identity: &str, modality: Modality, blob: Vec<u8>) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut record = self
            .load_record(identity)?
            .unwrap_or_else(|| TemplateRecord::new(identity));

        match modality {
            Modality::Fingerprint => record.fingerprint = Some(blob),
            Modality::Face => record.face = Some(blob),
        }
        record.updated_at = Utc::now();

        self.put_record(&record)
    }

    /// Absent identity or modality is a valid state, not an error.
    pub async fn get_fingerprint(&self, identity: &str) -> Result<Option<Vec<f32>>> {
        match self.load_record(identity)? {
            Some(record) => match record.fingerprint {
                Some(blob) => Ok(Some(codec::decode(&blob)?)),
                None => Ok(None),
            },
            None => Ok(None),
        }
    }

    pub async fn get_face(&self, identity: &str) -> Result<Option<Vec<f32>>> {
        match self.load_record(identity)? {
            Some(record) => match record.face {
                Some(blob) => Ok(Some(codec::decode(&blob)?)),
                None => Ok(None),
            },
            None => Ok(None),
        }
    }

    pub async fn enrolled_factors(&self, identity: &str) -> Result<EnrolledFactors> {
        Ok(self
            .load_record(identity)?
            .map(|record| record.enrolled_factors())
            .unwrap_or_default())
    }

    pub async fn delete_record(&self, identity: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.db
            .delete(identity.as_bytes())
            .map_err(|e| StorageError::Database(e.to_string()))?;
        Ok(())
    }

    fn load_record(&self, identity: &str) -> Result<Option<TemplateRecord>> {
        let encrypted = match self
            .db
            .get(identity.as_bytes())
            .map_err(|e| StorageError::Database(e.to_string()))?
        {
            Some(data) => data,
            None => return Ok(None),
        };

        let decrypted = self.cipher.decrypt(&encrypted)?;
        let record = serde_json::from_slice(&decrypted)
            .map_err(|e| StorageError::InvalidFormat(e.to_string()))?;

        Ok(Some(record))
    }

    fn put_record(&self, record: &TemplateRecord) -> Result<()> {
        let serialized = serde_json::to_vec(record)
            .map_err(|e| StorageError::InvalidFormat(e.to_string()))?;
        let encrypted = self.cipher.encrypt(&serialized)?;

        self.db
            .put(record.identity.as_bytes(), encrypted)
            .map_err(|e| StorageError::Database(e.to_string()))?;

        Ok(())
    }
}
