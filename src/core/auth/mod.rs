pub mod rate_limit;
pub mod session;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::core::matching;
use crate::core::template::{EnrolledFactors, Modality};
use crate::storage::TemplateStore;
use crate::utils::config::Config;
use crate::utils::error::{CoreError, Result};
use self::rate_limit::{FixedWindowLockout, LockoutPolicy, NoLockout};
use self::session::{PendingSecondFactor, SessionStore};

/// Credential-store collaborator. Password semantics live entirely on the
/// other side of this seam.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify_credential(&self, identity: &str, secret: &str) -> Result<bool>;

    async fn identity_exists(&self, identity: &str) -> Result<bool>;
}

/// Placeholder used until a credential backend is attached; rejects every
/// secret.
pub struct DenyAllCredentials;

#[async_trait]
impl CredentialVerifier for DenyAllCredentials {
    async fn verify_credential(&self, _identity: &str, _secret: &str) -> Result<bool> {
        Ok(false)
    }

    async fn identity_exists(&self, _identity: &str) -> Result<bool> {
        Ok(false)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Authenticated {
    pub identity: String,
    /// None when the user was waved through without a second factor.
    pub second_factor: Option<Modality>,
}

#[derive(Debug, Clone)]
pub enum SecondFactorSelection {
    /// At least one modality is enrolled; the session stays pending until
    /// one of them verifies.
    Required(EnrolledFactors),
    /// Nothing enrolled and the escape hatch is on: authenticated with the
    /// password alone.
    WavedThrough(Authenticated),
}

pub struct AuthService {
    credentials: Arc<dyn CredentialVerifier>,
    store: Arc<TemplateStore>,
    sessions: SessionStore,
    lockout: Box<dyn LockoutPolicy>,
    face_login_threshold: f32,
    face_reverify_threshold: f32,
    liveness_min_stddev: f32,
    allow_unenrolled_login: bool,
}

impl AuthService {
    pub fn new(
        config: &Config,
        credentials: Arc<dyn CredentialVerifier>,
        store: Arc<TemplateStore>,
    ) -> Self {
        let lockout: Box<dyn LockoutPolicy> = if config.auth.lockout_enabled {
            Box::new(FixedWindowLockout::new(
                config.auth.lockout_max_failures,
                config.auth.lockout_window_secs,
            ))
        } else {
            Box::new(NoLockout)
        };

        Self {
            credentials,
            store,
            sessions: SessionStore::new(config.auth.second_factor_window_secs),
            lockout,
            face_login_threshold: config.auth.face_login_threshold,
            face_reverify_threshold: config.auth.face_reverify_threshold,
            liveness_min_stddev: config.auth.liveness_min_stddev,
            allow_unenrolled_login: config.auth.allow_unenrolled_login,
        }
    }

    /// Password step. On success the caller receives a pending session whose
    /// token must be presented to the second-factor operations before the
    /// window closes.
    pub async fn verify_password(
        &self,
        identity: &str,
        secret: &str,
        origin: Option<String>,
    ) -> Result<PendingSecondFactor> {
        if identity.is_empty() || secret.is_empty() {
            return Err(CoreError::Validation(
                "identity and secret are required".into(),
            ));
        }

        // Unknown identities get the same answer as a wrong secret
        if !self.credentials.identity_exists(identity).await?
            || !self.credentials.verify_credential(identity, secret).await?
        {
            return Err(CoreError::Auth("invalid credentials".into()));
        }

        let session = self.sessions.create(identity, origin);
        info!(identity, "password verified, awaiting second factor");

        Ok(session)
    }

    /// Reports which second factors the pending identity can present. With
    /// nothing enrolled the flow degrades: the user is treated as
    /// authenticated without a second factor when the configured escape
    /// hatch allows it.
    pub async fn select_second_factor(&self, token: &str) -> Result<SecondFactorSelection> {
        let session = self.sessions.take_valid(token)?;
        let factors = self.store.enrolled_factors(&session.identity).await?;

        if factors.none() {
            if self.allow_unenrolled_login {
                warn!(
                    identity = %session.identity,
                    "no second factor enrolled, authenticating on password alone"
                );
                return Ok(SecondFactorSelection::WavedThrough(Authenticated {
                    identity: session.identity,
                    second_factor: None,
                }));
            }
            return Err(CoreError::Auth("no second factor enrolled".into()));
        }

        // Still pending; put the session back for the verification step.
        self.sessions.restore(session);
        Ok(SecondFactorSelection::Required(factors))
    }

    /// Second-factor step. Expiry is re-checked before any comparison; an
    /// expired session is discarded outright. The session is consumed on
    /// success and restored on a failed attempt so the user can retry
    /// within the window.
    pub async fn verify_second_factor(
        &self,
        token: &str,
        modality: Modality,
        sample: &[f32],
    ) -> Result<Authenticated> {
        if sample.is_empty() {
            return Err(CoreError::Validation("missing biometric sample".into()));
        }

        let session = self.sessions.take_valid(token)?;
        let origin = session.origin.as_deref();

        if !self.lockout.check(&session.identity, origin) {
            warn!(
                identity = %session.identity,
                origin = origin.unwrap_or("unknown"),
                "second-factor attempt blocked by lockout policy"
            );
            self.sessions.restore(session);
            return Err(CoreError::Auth("too many failed attempts".into()));
        }

        match self.compare_sample(&session.identity, modality, sample).await {
            Ok(()) => {
                self.lockout.record_success(&session.identity, origin);
                info!(identity = %session.identity, %modality, "second factor verified");
                Ok(Authenticated {
                    identity: session.identity,
                    second_factor: Some(modality),
                })
            }
            Err(err) => {
                match &err {
                    // Legitimate mismatches and shape errors count as failed
                    // attempts; keep the structured record for review.
                    CoreError::Auth(_) | CoreError::DimensionMismatch { .. } => {
                        warn!(
                            identity = %session.identity,
                            %modality,
                            origin = origin.unwrap_or("unknown"),
                            "second-factor verification failed"
                        );
                        self.lockout.record_failure(&session.identity, origin);
                    }
                    _ => {
                        error!(
                            identity = %session.identity,
                            %modality,
                            error = %err,
                            "second-factor verification aborted"
                        );
                    }
                }
                self.sessions.restore(session);
                Err(err)
            }
        }
    }

    async fn compare_sample(
        &self,
        identity: &str,
        modality: Modality,
        sample: &[f32],
    ) -> Result<()> {
        match modality {
            Modality::Face => {
                let stored = self
                    .store
                    .get_face(identity)
                    .await?
                    .ok_or_else(|| CoreError::Auth("face not enrolled for this identity".into()))?;

                if !matching::match_face(&stored, sample, self.face_login_threshold)? {
                    return Err(CoreError::Auth("verification failed".into()));
                }
                // Liveness applies to face only; fingerprint minutiae come
                // straight from the sensor.
                if !matching::assess_liveness(sample, self.liveness_min_stddev) {
                    return Err(CoreError::Auth("liveness check failed".into()));
                }
                Ok(())
            }
            Modality::Fingerprint => {
                let stored = self.store.get_fingerprint(identity).await?.ok_or_else(|| {
                    CoreError::Auth("fingerprint not enrolled for this identity".into())
                })?;

                if !matching::match_fingerprint(&stored, sample) {
                    return Err(CoreError::Auth("verification failed".into()));
                }
                Ok(())
            }
        }
    }

    /// Re-confirms the face of an already-authenticated user at the looser
    /// threshold. No session, no liveness check.
    pub async fn reverify_face(&self, identity: &str, sample: &[f32]) -> Result<bool> {
        if sample.is_empty() {
            return Err(CoreError::Validation("missing biometric sample".into()));
        }

        match self.store.get_face(identity).await? {
            Some(stored) => matching::match_face(&stored, sample, self.face_reverify_threshold),
            None => Ok(false),
        }
    }

    pub fn purge_expired_sessions(&self) -> usize {
        self.sessions.purge_expired()
    }
}
