// src/core/enrollment/device.rs
use async_trait::async_trait;
use tracing::warn;

use crate::utils::error::{CoreError, Result};

/// Driver seam for fingerprint acquisition hardware. Implementations are
/// injected into the enrollment and authentication services; the core never
/// holds a process-wide device handle.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FingerprintScanner: Send + Sync {
    /// Non-blocking readiness check, polled at a fixed interval.
    async fn sample_ready(&self) -> Result<bool>;

    /// Reads the minutiae template for the sample currently on the sensor.
    async fn read_sample(&self) -> Result<Vec<f32>>;
}

/// Stand-in used when no scanner hardware is attached. Every acquisition
/// fails the same way the real service reports an uninitialized scanner.
pub struct DisconnectedScanner;

impl DisconnectedScanner {
    pub fn new() -> Self {
        warn!("no fingerprint scanner attached, fingerprint enrollment will be unavailable");
        Self
    }
}

impl Default for DisconnectedScanner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FingerprintScanner for DisconnectedScanner {
    async fn sample_ready(&self) -> Result<bool> {
        Err(CoreError::Device("scanner not initialized".into()))
    }

    async fn read_sample(&self) -> Result<Vec<f32>> {
        Err(CoreError::Device("scanner not initialized".into()))
    }
}
