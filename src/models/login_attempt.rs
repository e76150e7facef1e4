//! Login attempt audit record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum user agent length stored per attempt
pub const MAX_USER_AGENT_LEN: usize = 500;

/// One failed authentication attempt, kept for inspection.
///
/// Rows are append-only: never mutated, never read back to rebuild the
/// in-memory lockout state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginAttempt {
    pub id: i64,
    pub ip_address: String,
    pub user_agent: Option<String>,
    pub endpoint: String,
    /// The failure counter as seen when this row was written
    pub attempt_count: i64,
    /// Whether this failure triggered the lockout
    pub blocked: bool,
    pub created_at: DateTime<Utc>,
}

/// Truncate a user agent string to the stored maximum.
pub fn truncate_user_agent(user_agent: Option<&str>) -> Option<String> {
    user_agent.map(|ua| ua.chars().take(MAX_USER_AGENT_LEN).collect())
}
