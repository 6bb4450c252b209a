use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::consts::consts::{ACTIVE_CALLER_STATUS, DEFAULT_CALLER_ROLE};

/// Sales agent account. `password_hash` is a PHC string, hashing happens in the web layer.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Caller {
    pub username: String,
    pub password_hash: String,
    pub role: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl Caller {
    pub fn new(username: String, password_hash: String) -> Self {
        Caller {
            username,
            password_hash,
            role: DEFAULT_CALLER_ROLE.to_string(),
            status: ACTIVE_CALLER_STATUS.to_string(),
            created_at: Utc::now(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status.eq_ignore_ascii_case(ACTIVE_CALLER_STATUS)
    }
}
