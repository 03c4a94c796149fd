// src/core/auth/session.rs
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use rand::{rngs::OsRng, RngCore};
use std::collections::HashMap;

use crate::utils::error::{CoreError, Result};

/// Elevated state granted by a successful password check, waiting for the
/// second factor. Lives only in memory for a fixed window.
#[derive(Debug, Clone)]
pub struct PendingSecondFactor {
    pub token: String,
    pub identity: String,
    pub created_at: DateTime<Utc>,
    pub origin: Option<String>,
}

/// Token-keyed store for pending second-factor sessions. `take_valid`
/// removes the session under the lock, so two concurrent verification
/// attempts for the same token can never both obtain it.
pub struct SessionStore {
    window_secs: i64,
    sessions: Mutex<HashMap<String, PendingSecondFactor>>,
}

impl SessionStore {
    pub fn new(window_secs: u64) -> Self {
        Self {
            window_secs: window_secs as i64,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn create(&self, identity: &str, origin: Option<String>) -> PendingSecondFactor {
        let session = PendingSecondFactor {
            token: new_token(),
            identity: identity.to_string(),
            created_at: Utc::now(),
            origin,
        };

        self.sessions
            .lock()
            .insert(session.token.clone(), session.clone());

        session
    }

    /// Removes and returns the session. An expired session is discarded and
    /// reported as such; the caller must restart authentication.
    pub fn take_valid(&self, token: &str) -> Result<PendingSecondFactor> {
        let session = self
            .sessions
            .lock()
            .remove(token)
            .ok_or_else(|| CoreError::Auth("unknown or already-consumed session".into()))?;

        if Utc::now() - session.created_at > Duration::seconds(self.window_secs) {
            return Err(CoreError::SessionExpired);
        }

        Ok(session)
    }

    /// Puts a taken session back after a failed, non-expiry attempt so the
    /// user can retry until the window closes.
    pub fn restore(&self, session: PendingSecondFactor) {
        self.sessions
            .lock()
            .insert(session.token.clone(), session);
    }

    /// Drops every session past the window. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let cutoff = Utc::now() - Duration::seconds(self.window_secs);
        let mut sessions = self.sessions.lock();
        let before = sessions.len();
        sessions.retain(|_, session| session.created_at >= cutoff);
        before - sessions.len()
    }
}

fn new_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
