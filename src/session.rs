use std::{collections::HashMap, sync::Mutex};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::{generate_token, hash_token};

pub const SESSION_COOKIE: &str = "leadline_session";

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Caller,
}

impl Role {
    /// Stored caller roles are free text, only `admin` grants admin rights
    pub fn from_label(label: &str) -> Self {
        match label.trim().eq_ignore_ascii_case("admin") {
            true => Role::Admin,
            false => Role::Caller,
        }
    }
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Session {
    pub user: String,
    pub role: Role,
    #[serde(rename = "expiresAt")]
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Logged-in users keyed by the SHA-256 of their token. The raw token only ever
/// lives in the client's cookie or bearer header.
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Session>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the raw token to hand to the client
    pub fn create(&self, user: &str, role: Role) -> String {
        let token = generate_token();
        let session = Session {
            user: user.to_string(),
            role,
            expires_at: Utc::now() + self.ttl,
        };

        let mut sessions = self.lock();

        // Expired sessions are swept whenever a new one is created
        let now = Utc::now();
        sessions.retain(|_, session| session.expires_at > now);
        sessions.insert(hash_token(&token), session);

        token
    }

    pub fn get(&self, token: &str) -> Option<Session> {
        let token_hash = hash_token(token);
        let mut sessions = self.lock();

        match sessions.get(&token_hash) {
            Some(session) if session.expires_at > Utc::now() => Some(session.clone()),
            Some(_) => {
                sessions.remove(&token_hash);
                None
            }
            None => None,
        }
    }

    pub fn remove(&self, token: &str) -> bool {
        self.lock().remove(&hash_token(token)).is_some()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Session>> {
        // Poisoning is ignored, every write is a single map call
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
