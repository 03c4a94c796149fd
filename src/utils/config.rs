use config::{Config as ConfigLib, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;

use crate::utils::error::{CoreError, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub node: NodeConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub device: DeviceConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub path: String,
    pub encryption_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub second_factor_window_secs: u64,
    /// Distance operating point for login-path face comparisons. Empirical,
    /// not derived; tune against the deployed embedding model.
    pub face_login_threshold: f32,
    /// Looser operating point for re-confirming an already-authenticated user.
    pub face_reverify_threshold: f32,
    pub liveness_min_stddev: f32,
    pub face_embedding_dim: usize,
    /// Users with no enrolled second factor are waved through after the
    /// password check. Security-relevant; kept as an explicit switch.
    pub allow_unenrolled_login: bool,
    pub lockout_enabled: bool,
    pub lockout_max_failures: u32,
    pub lockout_window_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    pub poll_interval_ms: u64,
    pub acquire_timeout_secs: u64,
}

impl Config {
    pub fn new() -> Result<Self> {
        let config = ConfigLib::builder()
            // Start with default values
            .set_default("node.host", "127.0.0.1")?
            .set_default("node.port", 8765)?
            .set_default("node.log_level", "info")?
            .set_default("storage.path", "data/templates")?
            .set_default("storage.encryption_key", "")?
            .set_default("auth.second_factor_window_secs", 300)?
            .set_default("auth.face_login_threshold", 0.4)?
            .set_default("auth.face_reverify_threshold", 0.6)?
            .set_default("auth.liveness_min_stddev", 0.1)?
            .set_default("auth.face_embedding_dim", 128)?
            .set_default("auth.allow_unenrolled_login", true)?
            .set_default("auth.lockout_enabled", false)?
            .set_default("auth.lockout_max_failures", 5)?
            .set_default("auth.lockout_window_secs", 900)?
            .set_default("device.poll_interval_ms", 100)?
            .set_default("device.acquire_timeout_secs", 30)?
            // Load from config file
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // Override with environment variables (e.g., APP_NODE__HOST)
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?;

        let config: Self = config.try_deserialize()?;
        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.node.port == 0 {
            return Err(CoreError::Config("Invalid port number".into()));
        }

        if self.storage.encryption_key.is_empty() {
            return Err(CoreError::Config("encryption_key must be set".into()));
        }

        if self.auth.second_factor_window_secs == 0 {
            return Err(CoreError::Config(
                "second_factor_window_secs must be greater than 0".into(),
            ));
        }
        if self.auth.face_login_threshold <= 0.0 || self.auth.face_reverify_threshold <= 0.0 {
            return Err(CoreError::Config(
                "face match thresholds must be greater than 0".into(),
            ));
        }
        if self.auth.face_embedding_dim == 0 {
            return Err(CoreError::Config(
                "face_embedding_dim must be greater than 0".into(),
            ));
        }
        if self.auth.lockout_enabled && self.auth.lockout_max_failures == 0 {
            return Err(CoreError::Config(
                "lockout_max_failures must be greater than 0 when lockout is enabled".into(),
            ));
        }

        if self.device.poll_interval_ms == 0 {
            return Err(CoreError::Config(
                "poll_interval_ms must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    pub fn second_factor_window(&self) -> Duration {
        Duration::from_secs(self.auth.second_factor_window_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.device.poll_interval_ms)
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.device.acquire_timeout_secs)
    }
}

impl From<ConfigError> for CoreError {
    fn from(error: ConfigError) -> Self {
        CoreError::Config(error.to_string())
    }
}
