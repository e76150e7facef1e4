//! Daily write quota checker
//!
//! Stateless helper over the durable guestbook counts. The calendar day
//! starts at UTC midnight. The per-IP cap only counts live messages, so a
//! visitor who deletes an own message gets that slot back; the global cap
//! counts soft-deleted rows too. Count-query errors propagate, so a broken
//! database rejects writes instead of waving them through.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::config::GuestbookConfig;
use crate::db::repositories::GuestbookRepository;

/// Which limit a submission ran into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaScope {
    /// The per-IP daily cap
    PerIp,
    /// The global daily cap
    Global,
}

/// Outcome of a quota check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaDecision {
    Allowed,
    Exceeded { scope: QuotaScope, limit: i64 },
}

/// Daily quota checker for guestbook writes
pub struct QuotaChecker {
    repo: Arc<dyn GuestbookRepository>,
    daily_limit_per_ip: i64,
    daily_limit_global: i64,
}

impl QuotaChecker {
    pub fn new(repo: Arc<dyn GuestbookRepository>, config: &GuestbookConfig) -> Self {
        Self {
            repo,
            daily_limit_per_ip: config.daily_limit_per_ip,
            daily_limit_global: config.daily_limit_global,
        }
    }

    /// Check both daily caps for a submission from `ip` at `now`.
    /// The per-IP cap is checked before the global one.
    pub async fn check(&self, ip: &str, now: DateTime<Utc>) -> anyhow::Result<QuotaDecision> {
        let day_start = day_start_utc(now);

        let by_ip = self.repo.count_by_ip_since(ip, day_start).await?;
        if by_ip >= self.daily_limit_per_ip {
            return Ok(QuotaDecision::Exceeded {
                scope: QuotaScope::PerIp,
                limit: self.daily_limit_per_ip,
            });
        }

        let total = self.repo.count_all_since(day_start).await?;
        if total >= self.daily_limit_global {
            return Ok(QuotaDecision::Exceeded {
                scope: QuotaScope::Global,
                limit: self.daily_limit_global,
            });
        }

        Ok(QuotaDecision::Allowed)
    }
}

/// Start of the calendar day containing `now`, at UTC midnight
pub fn day_start_utc(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .unwrap_or_default()
        .and_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxGuestbookRepository;
    use crate::db::{create_test_pool, migrations};
    use chrono::TimeZone;

    fn test_config() -> GuestbookConfig {
        GuestbookConfig {
            cooldown_seconds: 5,
            throttle_expiry_minutes: 30,
            daily_limit_per_ip: 5,
            daily_limit_global: 20,
            max_display: 20,
        }
    }

    async fn setup() -> (Arc<SqlxGuestbookRepository>, QuotaChecker) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let repo = Arc::new(SqlxGuestbookRepository::new(pool));
        let checker = QuotaChecker::new(repo.clone(), &test_config());
        (repo, checker)
    }

    #[test]
    fn test_day_start_is_utc_midnight() {
        let now = Utc.with_ymd_and_hms(2026, 3, 14, 15, 9, 26).unwrap();
        let start = day_start_utc(now);
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 3, 14, 0, 0, 0).unwrap());
    }

    #[tokio::test]
    async fn test_allowed_when_under_limits() {
        let (_, checker) = setup().await;
        let decision = checker.check("10.0.0.1", Utc::now()).await.expect("check failed");
        assert_eq!(decision, QuotaDecision::Allowed);
    }

    #[tokio::test]
    async fn test_per_ip_limit() {
        let (repo, checker) = setup().await;
        for i in 0..5 {
            repo.create(None, format!("message {}", i), "10.0.0.1".to_string())
                .await
                .expect("create failed");
        }

        let decision = checker.check("10.0.0.1", Utc::now()).await.expect("check failed");
        assert_eq!(
            decision,
            QuotaDecision::Exceeded {
                scope: QuotaScope::PerIp,
                limit: 5
            }
        );

        // Another IP is still fine
        let decision = checker.check("10.0.0.2", Utc::now()).await.expect("check failed");
        assert_eq!(decision, QuotaDecision::Allowed);
    }

    #[tokio::test]
    async fn test_global_limit() {
        let (repo, checker) = setup().await;
        // 20 messages spread over many IPs
        for i in 0..20 {
            repo.create(None, format!("message {}", i), format!("10.0.1.{}", i))
                .await
                .expect("create failed");
        }

        let decision = checker.check("10.0.0.1", Utc::now()).await.expect("check failed");
        assert_eq!(
            decision,
            QuotaDecision::Exceeded {
                scope: QuotaScope::Global,
                limit: 20
            }
        );
    }

    #[tokio::test]
    async fn test_per_ip_checked_before_global() {
        let (repo, checker) = setup().await;
        // One IP exhausts its own cap while also pushing the global total over
        for i in 0..20 {
            repo.create(None, format!("message {}", i), "10.0.0.1".to_string())
                .await
                .expect("create failed");
        }

        let decision = checker.check("10.0.0.1", Utc::now()).await.expect("check failed");
        assert_eq!(
            decision,
            QuotaDecision::Exceeded {
                scope: QuotaScope::PerIp,
                limit: 5
            }
        );
    }

    #[tokio::test]
    async fn test_deleting_own_messages_frees_per_ip_quota() {
        let (repo, checker) = setup().await;
        for i in 0..5 {
            let msg = repo
                .create(None, format!("message {}", i), "10.0.0.1".to_string())
                .await
                .expect("create failed");
            repo.soft_delete(msg.id).await.expect("delete failed");
        }

        let decision = checker.check("10.0.0.1", Utc::now()).await.expect("check failed");
        assert_eq!(decision, QuotaDecision::Allowed);
    }

    #[tokio::test]
    async fn test_global_quota_still_counts_deleted() {
        let (repo, checker) = setup().await;
        // 20 messages from distinct IPs, all deleted afterwards
        for i in 0..20 {
            let msg = repo
                .create(None, format!("message {}", i), format!("10.0.1.{}", i))
                .await
                .expect("create failed");
            repo.soft_delete(msg.id).await.expect("delete failed");
        }

        let decision = checker.check("10.0.0.1", Utc::now()).await.expect("check failed");
        assert_eq!(
            decision,
            QuotaDecision::Exceeded {
                scope: QuotaScope::Global,
                limit: 20
            }
        );
    }
}
