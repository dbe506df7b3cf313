//! In-memory login sessions keyed by bearer token.

use crate::chat::Transcript;
use crate::error::{AppError, AppResult};
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

/// One logged-in user.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
    /// Chat history. Turns of one session serialize on this lock.
    pub transcript: Arc<tokio::sync::Mutex<Transcript>>,
}

impl Session {
    fn is_expired(&self, now: DateTime<Utc>, ttl: TimeDelta) -> bool {
        now - self.created_at >= ttl
    }
}

pub struct SessionManager {
    sessions: Mutex<HashMap<String, Session>>,
    ttl: TimeDelta,
}

impl SessionManager {
    /// Sessions expire `ttl` after login.
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl: TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX),
        }
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, HashMap<String, Session>>> {
        self.sessions
            .lock()
            .map_err(|e| AppError::storage(format!("session lock poisoned: {}", e)))
    }

    /// Start a session for an authenticated user, evicting expired ones.
    pub fn create(&self, username: &str) -> AppResult<Session> {
        let now = Utc::now();
        let session = Session {
            token: Uuid::new_v4().simple().to_string(),
            username: username.to_string(),
            created_at: now,
            transcript: Arc::new(tokio::sync::Mutex::new(Transcript::new())),
        };

        let mut sessions = self.lock()?;
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired(now, self.ttl));
        if sessions.len() < before {
            debug!(evicted = before - sessions.len(), "Expired sessions evicted");
        }
        sessions.insert(session.token.clone(), session.clone());
        info!(username = %username, "Session started");
        Ok(session)
    }

    /// Resolve a token. Unknown and expired tokens are an auth failure.
    pub fn get(&self, token: &str) -> AppResult<Session> {
        let mut sessions = self.lock()?;
        let session = sessions.get(token).ok_or_else(AppError::not_logged_in)?;
        if session.is_expired(Utc::now(), self.ttl) {
            info!(username = %session.username, "Session expired");
            sessions.remove(token);
            return Err(AppError::not_logged_in());
        }
        Ok(session.clone())
    }

    /// Drop a session and its transcript. Returns whether it existed.
    pub fn remove(&self, token: &str) -> AppResult<bool> {
        let removed = self.lock()?.remove(token);
        if let Some(ref session) = removed {
            info!(username = %session.username, "Session ended");
        }
        Ok(removed.is_some())
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
