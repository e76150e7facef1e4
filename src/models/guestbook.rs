//! Guestbook message model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum nickname length accepted from visitors
pub const MAX_NICKNAME_LEN: usize = 20;

/// Maximum message length accepted from visitors
pub const MAX_CONTENT_LEN: usize = 200;

/// Guestbook message entity (soft deleted, never physically removed)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuestbookMessage {
    pub id: i64,
    pub nickname: Option<String>,
    pub content: String,
    pub ip_address: String,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Input for creating a guestbook message
#[derive(Debug, Clone, Deserialize)]
pub struct CreateGuestbookMessageInput {
    pub nickname: Option<String>,
    pub content: String,
}

impl CreateGuestbookMessageInput {
    /// Trim whitespace and enforce length caps.
    ///
    /// Returns a human-readable message on the first violated rule.
    pub fn validate(&self) -> Result<(), String> {
        let content = self.content.trim();
        if content.is_empty() {
            return Err("Message must not be empty".to_string());
        }
        if content.chars().count() > MAX_CONTENT_LEN {
            return Err(format!("Message must be at most {} characters", MAX_CONTENT_LEN));
        }
        if let Some(nickname) = &self.nickname {
            if nickname.trim().chars().count() > MAX_NICKNAME_LEN {
                return Err(format!("Nickname must be at most {} characters", MAX_NICKNAME_LEN));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_plain_message() {
        let input = CreateGuestbookMessageInput {
            nickname: Some("visitor".to_string()),
            content: "had a great time".to_string(),
        };
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_blank_content() {
        let input = CreateGuestbookMessageInput {
            nickname: None,
            content: "   ".to_string(),
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_long_content() {
        let input = CreateGuestbookMessageInput {
            nickname: None,
            content: "x".repeat(MAX_CONTENT_LEN + 1),
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_long_nickname() {
        let input = CreateGuestbookMessageInput {
            nickname: Some("n".repeat(MAX_NICKNAME_LEN + 1)),
            content: "hello".to_string(),
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_validate_content_at_limit() {
        let input = CreateGuestbookMessageInput {
            nickname: None,
            content: "x".repeat(MAX_CONTENT_LEN),
        };
        assert!(input.validate().is_ok());
    }
}
