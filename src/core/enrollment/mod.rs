pub mod device;

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

use crate::core::matching;
use crate::storage::TemplateStore;
use crate::utils::config::Config;
use crate::utils::error::{CoreError, Result};
use self::device::FingerprintScanner;

/// Fingerprint enrollment walks these phases in order; face enrollment is a
/// single validate-and-commit step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentPhase {
    AwaitingFirstSample,
    AwaitingFingerRemoval,
    AwaitingSecondSample,
    Comparing,
    Committed,
    Rejected,
}

/// Status update streamed to the caller while the device interaction runs.
#[derive(Debug, Clone, Serialize)]
pub struct EnrollmentProgress {
    pub phase: EnrollmentPhase,
    pub message: String,
    pub percent: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrollmentOutcome {
    Committed,
    Rejected { reason: String },
}

pub struct EnrollmentService {
    store: Arc<TemplateStore>,
    scanner: Arc<dyn FingerprintScanner>,
    poll_interval: Duration,
    acquire_timeout: Duration,
    face_embedding_dim: usize,
}

impl EnrollmentService {
    pub fn new(
        store: Arc<TemplateStore>,
        scanner: Arc<dyn FingerprintScanner>,
        config: &Config,
    ) -> Self {
        Self {
            store,
            scanner,
            poll_interval: config.poll_interval(),
            acquire_timeout: config.acquire_timeout(),
            face_embedding_dim: config.auth.face_embedding_dim,
        }
    }

    /// Two-sample fingerprint enrollment. Both acquisitions poll the scanner
    /// cooperatively; cancellation is honored at every poll point and leaves
    /// the store untouched. The samples must agree exactly; on disagreement
    /// the flow terminates rejected and the caller restarts from scratch.
    pub async fn enroll_fingerprint(
        &self,
        identity: &str,
        progress: &mpsc::Sender<EnrollmentProgress>,
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<EnrollmentOutcome> {
        if identity.is_empty() {
            return Err(CoreError::Validation("identity is required".into()));
        }

        let flow_id = Uuid::new_v4();
        info!(%flow_id, identity, "starting fingerprint enrollment");

        self.emit(
            progress,
            EnrollmentPhase::AwaitingFirstSample,
            "Place your finger on the scanner...",
            0,
        )
        .await;
        let first = self.acquire_sample(cancel).await?;

        self.emit(
            progress,
            EnrollmentPhase::AwaitingFingerRemoval,
            "Remove your finger...",
            33,
        )
        .await;
        self.await_finger_removal(cancel).await?;

        self.emit(
            progress,
            EnrollmentPhase::AwaitingSecondSample,
            "Place the same finger again...",
            66,
        )
        .await;
        let second = self.acquire_sample(cancel).await?;

        self.emit(
            progress,
            EnrollmentPhase::Comparing,
            "Comparing samples...",
            66,
        )
        .await;

        if !matching::match_fingerprint(&first, &second) {
            warn!(%flow_id, identity, "fingerprint samples did not match");
            let reason = "samples did not match".to_string();
            self.emit(progress, EnrollmentPhase::Rejected, &reason, 100)
                .await;
            return Ok(EnrollmentOutcome::Rejected { reason });
        }

        self.store.upsert_fingerprint(identity, &first).await?;

        info!(%flow_id, identity, "fingerprint enrolled");
        self.emit(
            progress,
            EnrollmentPhase::Committed,
            "Fingerprint enrolled successfully",
            100,
        )
        .await;

        Ok(EnrollmentOutcome::Committed)
    }

    /// Face enrollment accepts a single embedding produced upstream by the
    /// face model. No second-sample confirmation is performed for face.
    pub async fn enroll_face(&self, identity: &str, embedding: &[f32]) -> Result<()> {
        if identity.is_empty() {
            return Err(CoreError::Validation("identity is required".into()));
        }
        if embedding.is_empty() {
            return Err(CoreError::Validation("no facial data received".into()));
        }
        if embedding.len() != self.face_embedding_dim {
            return Err(CoreError::Validation(format!(
                "expected a {}-element face embedding, got {}",
                self.face_embedding_dim,
                embedding.len()
            )));
        }

        self.store.upsert_face(identity, embedding).await?;
        info!(identity, "face template enrolled");

        Ok(())
    }

    async fn acquire_sample(&self, cancel: &mut watch::Receiver<bool>) -> Result<Vec<f32>> {
        let deadline = Instant::now() + self.acquire_timeout;

        loop {
            if *cancel.borrow() {
                return Err(CoreError::Cancelled);
            }
            if self.scanner.sample_ready().await? {
                return self.scanner.read_sample().await;
            }
            if Instant::now() >= deadline {
                return Err(CoreError::Device(
                    "timed out waiting for a fingerprint sample".into(),
                ));
            }

            self.poll_tick(cancel).await?;
        }
    }

    async fn await_finger_removal(&self, cancel: &mut watch::Receiver<bool>) -> Result<()> {
        let deadline = Instant::now() + self.acquire_timeout;

        loop {
            if *cancel.borrow() {
                return Err(CoreError::Cancelled);
            }
            if !self.scanner.sample_ready().await? {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(CoreError::Device(
                    "timed out waiting for finger removal".into(),
                ));
            }

            self.poll_tick(cancel).await?;
        }
    }

    // One poll-interval sleep that wakes early on cancellation. A dropped
    // cancel sender means the caller went away, which counts as a cancel.
    async fn poll_tick(&self, cancel: &mut watch::Receiver<bool>) -> Result<()> {
        tokio::select! {
            _ = tokio::time::sleep(self.poll_interval) => Ok(()),
            changed = cancel.changed() => {
                if changed.is_err() || *cancel.borrow() {
                    Err(CoreError::Cancelled)
                } else {
                    Ok(())
                }
            }
        }
    }

    async fn emit(
        &self,
        progress: &mpsc::Sender<EnrollmentProgress>,
        phase: EnrollmentPhase,
        message: &str,
        percent: u8,
    ) {
        // A closed receiver is not an error; the flow keeps running and
        // cancellation is signalled separately.
        let _ = progress
            .send(EnrollmentProgress {
                phase,
                message: message.to_string(),
                percent,
            })
            .await;
    }
}
