//! Authentication service with login lockout
//!
//! Tracks failed admin logins per client IP in memory and blocks an IP for
//! a configured duration once it reaches the attempt cap. The in-memory map
//! is the single authority for blocking decisions; the `login_attempts`
//! table is an append-only audit trail and is never read back here.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

use crate::config::AuthConfig;
use crate::db::repositories::{LoginAttemptRepository, NewLoginAttempt};
use crate::models::{truncate_user_agent, LoginAttempt};
use crate::services::token::{TokenError, TokenIssuer};

/// Endpoint recorded on audit rows
const LOGIN_ENDPOINT: &str = "/api/auth/login";

/// Per-IP failure state
#[derive(Debug, Clone, Copy, Default)]
pub struct AttemptState {
    /// Consecutive failed attempts
    pub count: u32,
    /// Set once `count` reaches the attempt cap
    pub blocked_until: Option<DateTime<Utc>>,
}

/// Error types for authentication operations
#[derive(Debug, thiserror::Error)]
pub enum AuthServiceError {
    /// Wrong password
    #[error("Invalid password")]
    InvalidPassword,

    /// IP is blocked after too many failures
    #[error("Too many failed attempts, blocked until {blocked_until}")]
    Blocked { blocked_until: DateTime<Utc> },

    /// Token could not be issued
    #[error("Failed to issue token: {0}")]
    Token(#[from] TokenError),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Authentication service
pub struct AuthService {
    admin_password: String,
    max_attempts: u32,
    block_duration: Duration,
    attempts: RwLock<HashMap<String, AttemptState>>,
    ledger: Arc<dyn LoginAttemptRepository>,
    tokens: Arc<TokenIssuer>,
}

impl AuthService {
    pub fn new(
        config: &AuthConfig,
        ledger: Arc<dyn LoginAttemptRepository>,
        tokens: Arc<TokenIssuer>,
    ) -> Self {
        Self {
            admin_password: config.admin_password.clone(),
            max_attempts: config.max_attempts,
            block_duration: Duration::hours(config.block_duration_hours),
            attempts: RwLock::new(HashMap::new()),
            ledger,
            tokens,
        }
    }

    /// Attempt an admin login from the given client IP.
    ///
    /// Returns a session token on success. Failures increment the IP's
    /// counter and append an audit row; reaching the cap blocks the IP,
    /// after which even the correct password is refused until the block
    /// expires or the IP is unblocked.
    pub async fn login(
        &self,
        password: &str,
        ip: &str,
        user_agent: Option<&str>,
    ) -> Result<String, AuthServiceError> {
        self.login_at(password, ip, user_agent, Utc::now()).await
    }

    pub(crate) async fn login_at(
        &self,
        password: &str,
        ip: &str,
        user_agent: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<String, AuthServiceError> {
        // The write lock is held for the whole decide-and-update sequence
        // so concurrent logins from one IP are serialized.
        let failure = {
            let mut attempts = self.attempts.write().await;

            match attempts.get(ip) {
                Some(state) => match state.blocked_until {
                    Some(until) if until > now => {
                        return Err(AuthServiceError::Blocked {
                            blocked_until: until,
                        });
                    }
                    Some(_) => {
                        // Block expired, start fresh
                        attempts.remove(ip);
                    }
                    None => {}
                },
                None => {}
            }

            if password == self.admin_password {
                attempts.remove(ip);
                None
            } else {
                let state = attempts.entry(ip.to_string()).or_default();
                state.count += 1;
                let blocked = state.count >= self.max_attempts;
                if blocked {
                    state.blocked_until = Some(now + self.block_duration);
                }
                Some((state.count, blocked))
            }
        };

        match failure {
            None => Ok(self.tokens.issue_at(now)?),
            Some((count, blocked)) => {
                if blocked {
                    tracing::warn!(
                        "Blocking {} after {} failed login attempts",
                        ip,
                        count
                    );
                }

                // Audit is best effort: a write failure must not mask the
                // authentication outcome.
                let record = NewLoginAttempt {
                    ip_address: ip.to_string(),
                    user_agent: truncate_user_agent(user_agent),
                    endpoint: LOGIN_ENDPOINT.to_string(),
                    attempt_count: count as i64,
                    blocked,
                };
                if let Err(err) = self.ledger.append(record).await {
                    tracing::warn!("Failed to record login attempt for {}: {:#}", ip, err);
                }

                Err(AuthServiceError::InvalidPassword)
            }
        }
    }

    /// Verify a session token
    pub fn verify_token(&self, token: &str) -> bool {
        self.tokens.verify(token)
    }

    /// Lift a block and forget the failure count. Idempotent; unknown IPs
    /// are a no-op.
    pub async fn unblock(&self, ip: &str) {
        let removed = self.attempts.write().await.remove(ip);
        if removed.is_some() {
            tracing::info!("Cleared login attempt state for {}", ip);
        }
    }

    /// Current in-memory failure state for an IP, if any
    pub async fn attempt_state(&self, ip: &str) -> Option<AttemptState> {
        self.attempts.read().await.get(ip).copied()
    }

    /// Audit rows recorded for an IP, newest first
    pub async fn attempts_for(&self, ip: &str, limit: i64) -> Result<Vec<LoginAttempt>, AuthServiceError> {
        Ok(self.ledger.find_by_ip(ip, limit).await?)
    }

    /// Most recent audit rows across all IPs
    pub async fn recent_attempts(&self, limit: i64) -> Result<Vec<LoginAttempt>, AuthServiceError> {
        Ok(self.ledger.list_recent(limit).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxLoginAttemptRepository;
    use crate::db::{create_test_pool, migrations};
    use anyhow::anyhow;
    use async_trait::async_trait;

    const PASSWORD: &str = "correct horse battery staple";

    fn test_config() -> AuthConfig {
        AuthConfig {
            admin_password: PASSWORD.to_string(),
            token_secret: "a-test-secret-that-is-long-enough!!".to_string(),
            token_ttl_hours: 24,
            max_attempts: 5,
            block_duration_hours: 24,
        }
    }

    async fn service() -> (AuthService, Arc<dyn LoginAttemptRepository>) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let ledger: Arc<dyn LoginAttemptRepository> =
            Arc::new(SqlxLoginAttemptRepository::new(pool));
        let config = test_config();
        let tokens = Arc::new(TokenIssuer::new(&config.token_secret, config.token_ttl_hours));
        (AuthService::new(&config, ledger.clone(), tokens), ledger)
    }

    #[tokio::test]
    async fn test_correct_password_issues_token() {
        let (auth, _) = service().await;
        let token = auth
            .login(PASSWORD, "10.0.0.1", None)
            .await
            .expect("login should succeed");
        assert!(auth.verify_token(&token));
    }

    #[tokio::test]
    async fn test_wrong_password_rejected_and_counted() {
        let (auth, _) = service().await;
        let result = auth.login("nope", "10.0.0.1", None).await;
        assert!(matches!(result, Err(AuthServiceError::InvalidPassword)));

        let state = auth.attempt_state("10.0.0.1").await.expect("state exists");
        assert_eq!(state.count, 1);
        assert!(state.blocked_until.is_none());
    }

    #[tokio::test]
    async fn test_success_below_cap_resets_count() {
        let (auth, _) = service().await;
        for _ in 0..4 {
            let _ = auth.login("nope", "10.0.0.1", None).await;
        }
        auth.login(PASSWORD, "10.0.0.1", None)
            .await
            .expect("login should succeed");

        assert!(auth.attempt_state("10.0.0.1").await.is_none());

        // Counting starts over afterwards
        let _ = auth.login("nope", "10.0.0.1", None).await;
        let state = auth.attempt_state("10.0.0.1").await.expect("state exists");
        assert_eq!(state.count, 1);
    }

    #[tokio::test]
    async fn test_block_after_max_attempts() {
        let (auth, _) = service().await;
        let now = Utc::now();

        for _ in 0..5 {
            let result = auth.login_at("nope", "10.0.0.1", None, now).await;
            assert!(matches!(result, Err(AuthServiceError::InvalidPassword)));
        }

        // Even the correct password is refused while blocked
        let result = auth.login_at(PASSWORD, "10.0.0.1", None, now).await;
        match result {
            Err(AuthServiceError::Blocked { blocked_until }) => {
                assert_eq!(blocked_until, now + Duration::hours(24));
            }
            other => panic!("Expected Blocked, got {:?}", other.map(|_| "token")),
        }
    }

    #[tokio::test]
    async fn test_block_expires() {
        let (auth, _) = service().await;
        let now = Utc::now();

        for _ in 0..5 {
            let _ = auth.login_at("nope", "10.0.0.1", None, now).await;
        }

        let later = now + Duration::hours(25);
        auth.login_at(PASSWORD, "10.0.0.1", None, later)
            .await
            .expect("login should succeed after block expiry");
        assert!(auth.attempt_state("10.0.0.1").await.is_none());
    }

    #[tokio::test]
    async fn test_per_ip_isolation() {
        let (auth, _) = service().await;
        let now = Utc::now();

        for _ in 0..5 {
            let _ = auth.login_at("nope", "10.0.0.1", None, now).await;
        }

        // A different IP is unaffected
        auth.login_at(PASSWORD, "10.0.0.2", None, now)
            .await
            .expect("other IP should log in");
    }

    #[tokio::test]
    async fn test_unblock_restores_access() {
        let (auth, _) = service().await;
        let now = Utc::now();

        for _ in 0..5 {
            let _ = auth.login_at("nope", "10.0.0.1", None, now).await;
        }

        auth.unblock("10.0.0.1").await;
        auth.login_at(PASSWORD, "10.0.0.1", None, now)
            .await
            .expect("login should succeed after unblock");

        // Unknown IP is a no-op
        auth.unblock("10.9.9.9").await;
    }

    #[tokio::test]
    async fn test_audit_rows_per_failure() {
        let (auth, ledger) = service().await;
        let now = Utc::now();

        for _ in 0..5 {
            let _ = auth.login_at("nope", "10.0.0.1", Some("test-agent"), now).await;
        }

        let rows = ledger.find_by_ip("10.0.0.1", 50).await.expect("find failed");
        assert_eq!(rows.len(), 5);

        // Newest first: counts run 5..1, only the threshold row is blocked
        for (i, row) in rows.iter().enumerate() {
            assert_eq!(row.attempt_count, (5 - i) as i64);
            assert_eq!(row.blocked, row.attempt_count == 5);
            assert_eq!(row.endpoint, LOGIN_ENDPOINT);
            assert_eq!(row.user_agent.as_deref(), Some("test-agent"));
        }
    }

    #[tokio::test]
    async fn test_success_leaves_no_audit_row() {
        let (auth, ledger) = service().await;
        auth.login(PASSWORD, "10.0.0.1", None)
            .await
            .expect("login should succeed");

        let rows = ledger.find_by_ip("10.0.0.1", 50).await.expect("find failed");
        assert!(rows.is_empty());
    }

    struct FailingLedger;

    #[async_trait]
    impl LoginAttemptRepository for FailingLedger {
        async fn append(&self, _attempt: NewLoginAttempt) -> anyhow::Result<LoginAttempt> {
            Err(anyhow!("disk full"))
        }

        async fn find_by_ip(&self, _ip: &str, _limit: i64) -> anyhow::Result<Vec<LoginAttempt>> {
            Err(anyhow!("disk full"))
        }

        async fn list_recent(&self, _limit: i64) -> anyhow::Result<Vec<LoginAttempt>> {
            Err(anyhow!("disk full"))
        }
    }

    #[tokio::test]
    async fn test_audit_failure_does_not_change_outcome() {
        let config = test_config();
        let tokens = Arc::new(TokenIssuer::new(&config.token_secret, config.token_ttl_hours));
        let auth = AuthService::new(&config, Arc::new(FailingLedger), tokens);
        let now = Utc::now();

        // Failures still count and still block at the cap
        for _ in 0..5 {
            let result = auth.login_at("nope", "10.0.0.1", None, now).await;
            assert!(matches!(result, Err(AuthServiceError::InvalidPassword)));
        }
        let result = auth.login_at(PASSWORD, "10.0.0.1", None, now).await;
        assert!(matches!(result, Err(AuthServiceError::Blocked { .. })));
    }
}
