// tests/common/mod.rs
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::path::Path;

use async_trait::async_trait;
use parking_lot::Mutex;

use biofactor::core::auth::CredentialVerifier;
use biofactor::core::enrollment::device::FingerprintScanner;
use biofactor::utils::config::{AuthConfig, Config, DeviceConfig, NodeConfig, StorageConfig};
use biofactor::utils::error::Result;

pub fn test_config(path: &Path, window_secs: u64, face_dim: usize) -> Config {
    Config {
        node: NodeConfig {
            host: "127.0.0.1".into(),
            port: 8765,
            log_level: "info".into(),
        },
        storage: StorageConfig {
            path: path.to_str().unwrap().to_string(),
            encryption_key: "integration-test-key".into(),
        },
        auth: AuthConfig {
            second_factor_window_secs: window_secs,
            face_login_threshold: 0.4,
            face_reverify_threshold: 0.6,
            liveness_min_stddev: 0.1,
            face_embedding_dim: face_dim,
            allow_unenrolled_login: true,
            lockout_enabled: false,
            lockout_max_failures: 5,
            lockout_window_secs: 900,
        },
        device: DeviceConfig {
            poll_interval_ms: 1,
            acquire_timeout_secs: 2,
        },
    }
}

/// Credential collaborator backed by a fixed identity/secret table.
pub struct StaticCredentials {
    users: HashMap<String, String>,
}

impl StaticCredentials {
    pub fn with_user(identity: &str, secret: &str) -> Self {
        let mut users = HashMap::new();
        users.insert(identity.to_string(), secret.to_string());
        Self { users }
    }
}

#[async_trait]
impl CredentialVerifier for StaticCredentials {
    async fn verify_credential(&self, identity: &str, secret: &str) -> Result<bool> {
        Ok(self.users.get(identity).map(String::as_str) == Some(secret))
    }

    async fn identity_exists(&self, identity: &str) -> Result<bool> {
        Ok(self.users.contains_key(identity))
    }
}

/// Scanner that plays back a scripted readiness sequence and sample queue.
pub struct ScriptedScanner {
    readiness: Mutex<VecDeque<bool>>,
    samples: Mutex<VecDeque<Vec<f32>>>,
}

impl ScriptedScanner {
    pub fn new(readiness: Vec<bool>, samples: Vec<Vec<f32>>) -> Self {
        Self {
            readiness: Mutex::new(readiness.into()),
            samples: Mutex::new(samples.into()),
        }
    }

    /// Two-sample enrollment script: first touch, removal, second touch.
    pub fn for_enrollment(first: Vec<f32>, second: Vec<f32>) -> Self {
        Self::new(vec![true, false, true], vec![first, second])
    }
}

#[async_trait]
impl FingerprintScanner for ScriptedScanner {
    async fn sample_ready(&self) -> Result<bool> {
        Ok(self.readiness.lock().pop_front().unwrap_or(false))
    }

    async fn read_sample(&self) -> Result<Vec<f32>> {
        Ok(self.samples.lock().pop_front().unwrap_or_default())
    }
}
