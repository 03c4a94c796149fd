// src/core/template/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Persisted per-identity credential record: at most one template per
/// modality, stored as encoded blobs. Writes replace the prior value
/// entirely; there is no history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateRecord {
    pub identity: String,
    pub fingerprint: Option<Vec<u8>>,
    pub face: Option<Vec<u8>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TemplateRecord {
    pub fn new(identity: &str) -> Self {
        let now = Utc::now();
        Self {
            identity: identity.to_string(),
            fingerprint: None,
            face: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn enrolled_factors(&self) -> EnrolledFactors {
        EnrolledFactors {
            fingerprint: self.fingerprint.is_some(),
            face: self.face.is_some(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Fingerprint,
    Face,
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Modality::Fingerprint => write!(f, "fingerprint"),
            Modality::Face => write!(f, "face"),
        }
    }
}

/// Which second factors an identity has templates for.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct EnrolledFactors {
    pub fingerprint: bool,
    pub face: bool,
}

impl EnrolledFactors {
    pub fn none(&self) -> bool {
        !self.fingerprint && !self.face
    }
}
