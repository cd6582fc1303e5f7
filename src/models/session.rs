//! Session rows consulted by the auth provider.

use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Session {
    pub token: String,
    pub user_id: String,
    #[serde(default)]
    pub claims_admin: bool,
    #[serde(default)]
    pub expires_at: Option<String>,
}

impl Session {
    /// Sessions without an expiry never expire; unparsable expiries always have.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match &self.expires_at {
            None => false,
            Some(raw) => DateTime::parse_from_rfc3339(raw)
                .map(|at| at.with_timezone(&Utc) <= now)
                .unwrap_or(true),
        }
    }
}
