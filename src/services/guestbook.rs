//! Guestbook service
//!
//! Public message board with layered abuse protection: input validation,
//! an in-memory per-IP write cooldown, and daily quotas backed by durable
//! counts. Messages are soft deleted; visitors may delete their own
//! (same IP), the admin may delete any.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::config::GuestbookConfig;
use crate::db::repositories::GuestbookRepository;
use crate::models::{CreateGuestbookMessageInput, GuestbookMessage};
use crate::services::quota::{QuotaChecker, QuotaDecision, QuotaScope};

/// Error types for guestbook operations
#[derive(Debug, thiserror::Error)]
pub enum GuestbookServiceError {
    /// Input failed validation
    #[error("{0}")]
    Validation(String),

    /// Writing again too soon from the same IP
    #[error("Please wait {retry_after_seconds} second(s) before writing again")]
    Cooldown { retry_after_seconds: i64 },

    /// Per-IP daily cap reached
    #[error("Daily limit of {limit} messages per visitor reached")]
    PerIpQuota { limit: i64 },

    /// Global daily cap reached
    #[error("The guestbook is full for today ({limit} messages)")]
    GlobalQuota { limit: i64 },

    /// Message missing or already deleted
    #[error("Message not found")]
    NotFound,

    /// Caller may not delete this message
    #[error("Not allowed to delete this message")]
    Unauthorized,

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Guestbook message as shown to visitors. The author IP stays private;
/// `deletable` tells the caller whether a delete button makes sense.
#[derive(Debug, Clone, Serialize)]
pub struct GuestbookMessageView {
    pub id: i64,
    pub nickname: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub deletable: bool,
}

/// Guestbook service
pub struct GuestbookService {
    repo: Arc<dyn GuestbookRepository>,
    quota: QuotaChecker,
    cooldown: Duration,
    throttle_expiry: Duration,
    max_display: i64,
    /// Last accepted write per IP
    last_writes: RwLock<HashMap<String, DateTime<Utc>>>,
}

impl GuestbookService {
    pub fn new(repo: Arc<dyn GuestbookRepository>, config: &GuestbookConfig) -> Self {
        Self {
            quota: QuotaChecker::new(repo.clone(), config),
            repo,
            cooldown: Duration::seconds(config.cooldown_seconds),
            throttle_expiry: Duration::minutes(config.throttle_expiry_minutes),
            max_display: config.max_display,
            last_writes: RwLock::new(HashMap::new()),
        }
    }

    /// Submit a new message from the given client IP
    pub async fn create_message(
        &self,
        input: CreateGuestbookMessageInput,
        ip: &str,
    ) -> Result<GuestbookMessageView, GuestbookServiceError> {
        self.create_message_at(input, ip, Utc::now()).await
    }

    pub(crate) async fn create_message_at(
        &self,
        input: CreateGuestbookMessageInput,
        ip: &str,
        now: DateTime<Utc>,
    ) -> Result<GuestbookMessageView, GuestbookServiceError> {
        input.validate().map_err(GuestbookServiceError::Validation)?;

        // Cooldown gate, before any database work
        {
            let mut last_writes = self.last_writes.write().await;
            last_writes.retain(|_, at| now - *at < self.throttle_expiry);

            if let Some(last) = last_writes.get(ip) {
                let ready_at = *last + self.cooldown;
                if ready_at > now {
                    let retry_after_seconds = (ready_at - now).num_seconds().max(1);
                    return Err(GuestbookServiceError::Cooldown {
                        retry_after_seconds,
                    });
                }
            }
        }

        match self.quota.check(ip, now).await? {
            QuotaDecision::Allowed => {}
            QuotaDecision::Exceeded {
                scope: QuotaScope::PerIp,
                limit,
            } => return Err(GuestbookServiceError::PerIpQuota { limit }),
            QuotaDecision::Exceeded {
                scope: QuotaScope::Global,
                limit,
            } => return Err(GuestbookServiceError::GlobalQuota { limit }),
        }

        let nickname = input
            .nickname
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(String::from);
        let content = input.content.trim().to_string();

        let message = self
            .repo
            .create(nickname, content, ip.to_string())
            .await?;

        self.last_writes.write().await.insert(ip.to_string(), now);
        tracing::debug!("Guestbook message {} accepted from {}", message.id, ip);

        // The author can always delete what they just wrote
        Ok(view_of(message, true))
    }

    /// The most recent messages, oldest first, flagged for deletability
    /// from the caller's perspective.
    pub async fn list_messages(
        &self,
        viewer_ip: &str,
        is_admin: bool,
    ) -> Result<Vec<GuestbookMessageView>, GuestbookServiceError> {
        let mut messages = self.repo.list_recent(self.max_display).await?;
        messages.reverse();
        Ok(messages
            .into_iter()
            .map(|m| {
                let deletable = is_admin || m.ip_address == viewer_ip;
                view_of(m, deletable)
            })
            .collect())
    }

    /// Soft delete a message. Visitors may delete their own messages
    /// (matched by IP); the admin may delete any.
    pub async fn delete_message(
        &self,
        id: i64,
        viewer_ip: &str,
        is_admin: bool,
    ) -> Result<(), GuestbookServiceError> {
        let message = self
            .repo
            .get_by_id(id)
            .await?
            .filter(|m| m.deleted_at.is_none())
            .ok_or(GuestbookServiceError::NotFound)?;

        if !is_admin && message.ip_address != viewer_ip {
            return Err(GuestbookServiceError::Unauthorized);
        }

        if !self.repo.soft_delete(id).await? {
            return Err(GuestbookServiceError::NotFound);
        }
        Ok(())
    }
}

fn view_of(message: GuestbookMessage, deletable: bool) -> GuestbookMessageView {
    GuestbookMessageView {
        id: message.id,
        nickname: message.nickname,
        content: message.content,
        created_at: message.created_at,
        deletable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxGuestbookRepository;
    use crate::db::{create_test_pool, migrations};

    fn test_config() -> GuestbookConfig {
        GuestbookConfig {
            cooldown_seconds: 5,
            throttle_expiry_minutes: 30,
            daily_limit_per_ip: 5,
            daily_limit_global: 20,
            max_display: 20,
        }
    }

    async fn service() -> GuestbookService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        GuestbookService::new(Arc::new(SqlxGuestbookRepository::new(pool)), &test_config())
    }

    fn input(content: &str) -> CreateGuestbookMessageInput {
        CreateGuestbookMessageInput {
            nickname: Some("visitor".to_string()),
            content: content.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_message() {
        let svc = service().await;
        let view = svc
            .create_message(input("hello there"), "10.0.0.1")
            .await
            .expect("create failed");
        assert_eq!(view.content, "hello there");
        assert_eq!(view.nickname.as_deref(), Some("visitor"));
    }

    #[tokio::test]
    async fn test_blank_content_rejected() {
        let svc = service().await;
        let result = svc.create_message(input("   "), "10.0.0.1").await;
        assert!(matches!(result, Err(GuestbookServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn test_cooldown_between_writes() {
        let svc = service().await;
        let now = Utc::now();

        svc.create_message_at(input("first"), "10.0.0.1", now)
            .await
            .expect("first write should pass");

        let result = svc
            .create_message_at(input("second"), "10.0.0.1", now + Duration::seconds(2))
            .await;
        match result {
            Err(GuestbookServiceError::Cooldown {
                retry_after_seconds,
            }) => assert_eq!(retry_after_seconds, 3),
            other => panic!("Expected Cooldown, got {:?}", other.map(|v| v.id)),
        }

        // After the cooldown the same IP may write again
        svc.create_message_at(input("second"), "10.0.0.1", now + Duration::seconds(6))
            .await
            .expect("write after cooldown should pass");
    }

    #[tokio::test]
    async fn test_cooldown_is_per_ip() {
        let svc = service().await;
        let now = Utc::now();

        svc.create_message_at(input("first"), "10.0.0.1", now)
            .await
            .expect("first write should pass");
        svc.create_message_at(input("other"), "10.0.0.2", now + Duration::seconds(1))
            .await
            .expect("other IP should pass");
    }

    #[tokio::test]
    async fn test_per_ip_quota_rejection() {
        let svc = service().await;
        let mut now = Utc::now();

        for i in 0..5 {
            svc.create_message_at(input(&format!("message {}", i)), "10.0.0.1", now)
                .await
                .expect("write should pass");
            now += Duration::seconds(10);
        }

        let result = svc.create_message_at(input("one too many"), "10.0.0.1", now).await;
        assert!(matches!(
            result,
            Err(GuestbookServiceError::PerIpQuota { limit: 5 })
        ));
    }

    #[tokio::test]
    async fn test_per_ip_quota_takes_precedence_over_global() {
        let svc = service().await;
        let mut now = Utc::now();

        // Fill the global cap from a single IP in cooldown-respecting steps
        for i in 0..5 {
            svc.create_message_at(input(&format!("message {}", i)), "10.0.0.1", now)
                .await
                .expect("write should pass");
            now += Duration::seconds(10);
        }

        let result = svc.create_message_at(input("again"), "10.0.0.1", now).await;
        assert!(matches!(
            result,
            Err(GuestbookServiceError::PerIpQuota { .. })
        ));
    }

    #[tokio::test]
    async fn test_list_oldest_first_with_deletable_flags() {
        let svc = service().await;
        let now = Utc::now();

        svc.create_message_at(input("mine"), "10.0.0.1", now)
            .await
            .expect("write should pass");
        svc.create_message_at(input("theirs"), "10.0.0.2", now + Duration::seconds(10))
            .await
            .expect("write should pass");

        let views = svc.list_messages("10.0.0.1", false).await.expect("list failed");
        assert_eq!(views.len(), 2);
        assert_eq!(views[0].content, "mine");
        assert!(views[0].deletable);
        assert!(!views[1].deletable);

        // Admin can delete everything
        let views = svc.list_messages("10.0.0.9", true).await.expect("list failed");
        assert!(views.iter().all(|v| v.deletable));
    }

    #[tokio::test]
    async fn test_delete_rights() {
        let svc = service().await;
        let view = svc
            .create_message(input("mine"), "10.0.0.1")
            .await
            .expect("create failed");

        // A stranger cannot delete it
        let result = svc.delete_message(view.id, "10.0.0.2", false).await;
        assert!(matches!(result, Err(GuestbookServiceError::Unauthorized)));

        // The author can
        svc.delete_message(view.id, "10.0.0.1", false)
            .await
            .expect("author delete should pass");

        // Deleting again is NotFound
        let result = svc.delete_message(view.id, "10.0.0.1", false).await;
        assert!(matches!(result, Err(GuestbookServiceError::NotFound)));
    }

    #[tokio::test]
    async fn test_admin_can_delete_any() {
        let svc = service().await;
        let view = svc
            .create_message(input("spam"), "10.0.0.1")
            .await
            .expect("create failed");

        svc.delete_message(view.id, "10.0.0.9", true)
            .await
            .expect("admin delete should pass");
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let svc = service().await;
        let result = svc.delete_message(404, "10.0.0.1", false).await;
        assert!(matches!(result, Err(GuestbookServiceError::NotFound)));
    }
}
