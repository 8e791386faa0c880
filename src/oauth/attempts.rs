//! Pending login attempts keyed by credential token.
//!
//! Each attempt's credential token is registered when the authorize URL
//! is built and consumed exactly once when the provider redirect comes
//! back. Concurrent attempts share nothing but this lock-guarded map.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};

use crate::oauth::authorize::LoginStyle;

/// Data stored for one in-flight login attempt.
#[derive(Debug, Clone)]
pub struct AttemptData {
    /// How the login page was presented.
    pub login_style: LoginStyle,
    /// Absolute post-login return target.
    pub redirect_url: String,
    /// When this attempt expires.
    pub expires_at: DateTime<Utc>,
}

/// Store of in-flight login attempts with expiration.
#[derive(Clone)]
pub struct PendingAttempts {
    attempts: Arc<Mutex<HashMap<String, AttemptData>>>,
    ttl: Duration,
}

impl PendingAttempts {
    /// Create a store with the default TTL of 10 minutes.
    pub fn new() -> Self {
        Self::with_ttl(Duration::minutes(10))
    }

    /// Create a store with a custom TTL.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            attempts: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    /// Register a new attempt under its credential token.
    pub fn register(&self, credential_token: &str, login_style: LoginStyle, redirect_url: &str) {
        let data = AttemptData {
            login_style,
            redirect_url: redirect_url.to_string(),
            expires_at: Utc::now() + self.ttl,
        };

        let mut attempts = self.attempts.lock().unwrap();
        attempts.insert(credential_token.to_string(), data);
    }

    /// Consume an attempt, removing it from the store.
    ///
    /// Returns `None` for unknown, expired, or already-consumed tokens;
    /// a token can never be consumed twice.
    pub fn consume(&self, credential_token: &str) -> Option<AttemptData> {
        let mut attempts = self.attempts.lock().unwrap();

        if let Some(data) = attempts.remove(credential_token) {
            if Utc::now() > data.expires_at {
                return None;
            }
            Some(data)
        } else {
            None
        }
    }

    /// Drop expired attempts that were never consumed.
    pub fn sweep_expired(&self) {
        let mut attempts = self.attempts.lock().unwrap();
        let now = Utc::now();
        attempts.retain(|_, data| data.expires_at > now);
    }
}

impl Default for PendingAttempts {
    fn default() -> Self {
        Self::new()
    }
}
