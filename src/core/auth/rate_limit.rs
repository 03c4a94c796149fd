// src/core/auth/rate_limit.rs
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;

/// Pluggable lockout after repeated second-factor failures, keyed by
/// identity plus caller origin. Enforcement is opt-in; the default policy
/// never blocks.
pub trait LockoutPolicy: Send + Sync {
    /// Whether another attempt is currently allowed.
    fn check(&self, identity: &str, origin: Option<&str>) -> bool;

    fn record_failure(&self, identity: &str, origin: Option<&str>);

    fn record_success(&self, identity: &str, origin: Option<&str>);
}

pub struct NoLockout;

impl LockoutPolicy for NoLockout {
    fn check(&self, _identity: &str, _origin: Option<&str>) -> bool {
        true
    }

    fn record_failure(&self, _identity: &str, _origin: Option<&str>) {}

    fn record_success(&self, _identity: &str, _origin: Option<&str>) {}
}

/// Fixed-window counter: at most `max_failures` failed attempts per key per
/// window, then blocked until the window rolls over.
pub struct FixedWindowLockout {
    max_failures: u32,
    window_secs: i64,
    attempts: Mutex<HashMap<String, WindowState>>,
}

struct WindowState {
    failures: u32,
    window_start: DateTime<Utc>,
}

impl FixedWindowLockout {
    pub fn new(max_failures: u32, window_secs: u64) -> Self {
        Self {
            max_failures,
            window_secs: window_secs as i64,
            attempts: Mutex::new(HashMap::new()),
        }
    }

    fn key(identity: &str, origin: Option<&str>) -> String {
        format!("{}|{}", identity, origin.unwrap_or("-"))
    }

    fn window_elapsed(&self, state: &WindowState) -> bool {
        Utc::now() - state.window_start > Duration::seconds(self.window_secs)
    }
}

impl LockoutPolicy for FixedWindowLockout {
    fn check(&self, identity: &str, origin: Option<&str>) -> bool {
        let attempts = self.attempts.lock();
        match attempts.get(&Self::key(identity, origin)) {
            Some(state) => self.window_elapsed(state) || state.failures < self.max_failures,
            None => true,
        }
    }

    fn record_failure(&self, identity: &str, origin: Option<&str>) {
        let mut attempts = self.attempts.lock();
        let state = attempts
            .entry(Self::key(identity, origin))
            .or_insert_with(|| WindowState {
                failures: 0,
                window_start: Utc::now(),
            });

        if self.window_elapsed(state) {
            state.failures = 0;
            state.window_start = Utc::now();
        }
        state.failures += 1;
    }

    fn record_success(&self, identity: &str, origin: Option<&str>) {
        self.attempts.lock().remove(&Self::key(identity, origin));
    }
}
