//! Login attempt repository
//!
//! Append-only audit ledger for failed authentication attempts. Rows are
//! never read back to rebuild lockout state; the in-memory counters own
//! that decision.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::LoginAttempt;

/// Data for one appended audit row
#[derive(Debug, Clone)]
pub struct NewLoginAttempt {
    pub ip_address: String,
    pub user_agent: Option<String>,
    pub endpoint: String,
    pub attempt_count: i64,
    pub blocked: bool,
}

/// Login attempt repository trait
#[async_trait]
pub trait LoginAttemptRepository: Send + Sync {
    /// Append one attempt record to the ledger
    async fn append(&self, attempt: NewLoginAttempt) -> Result<LoginAttempt>;

    /// Attempts recorded for an IP, newest first
    async fn find_by_ip(&self, ip_address: &str, limit: i64) -> Result<Vec<LoginAttempt>>;

    /// Most recent attempts across all IPs, newest first
    async fn list_recent(&self, limit: i64) -> Result<Vec<LoginAttempt>>;
}

/// Login attempt repository implementation
pub struct SqlxLoginAttemptRepository {
    pool: DynDatabasePool,
}

impl SqlxLoginAttemptRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LoginAttemptRepository for SqlxLoginAttemptRepository {
    async fn append(&self, attempt: NewLoginAttempt) -> Result<LoginAttempt> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => append_sqlite(self.pool.as_sqlite().unwrap(), attempt).await,
            DatabaseDriver::Mysql => append_mysql(self.pool.as_mysql().unwrap(), attempt).await,
        }
    }

    async fn find_by_ip(&self, ip_address: &str, limit: i64) -> Result<Vec<LoginAttempt>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                find_by_ip_sqlite(self.pool.as_sqlite().unwrap(), ip_address, limit).await
            }
            DatabaseDriver::Mysql => {
                find_by_ip_mysql(self.pool.as_mysql().unwrap(), ip_address, limit).await
            }
        }
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<LoginAttempt>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_recent_sqlite(self.pool.as_sqlite().unwrap(), limit).await,
            DatabaseDriver::Mysql => list_recent_mysql(self.pool.as_mysql().unwrap(), limit).await,
        }
    }
}

// SQLite implementations

async fn append_sqlite(pool: &SqlitePool, attempt: NewLoginAttempt) -> Result<LoginAttempt> {
    let now = Utc::now();
    let result = sqlx::query(
        r#"INSERT INTO login_attempts (ip_address, user_agent, endpoint, attempt_count, blocked, created_at)
           VALUES (?, ?, ?, ?, ?, ?)"#,
    )
    .bind(&attempt.ip_address)
    .bind(&attempt.user_agent)
    .bind(&attempt.endpoint)
    .bind(attempt.attempt_count)
    .bind(attempt.blocked)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(LoginAttempt {
        id: result.last_insert_rowid(),
        ip_address: attempt.ip_address,
        user_agent: attempt.user_agent,
        endpoint: attempt.endpoint,
        attempt_count: attempt.attempt_count,
        blocked: attempt.blocked,
        created_at: now,
    })
}

async fn find_by_ip_sqlite(
    pool: &SqlitePool,
    ip_address: &str,
    limit: i64,
) -> Result<Vec<LoginAttempt>> {
    let rows = sqlx::query(
        r#"SELECT * FROM login_attempts
           WHERE ip_address = ?
           ORDER BY created_at DESC, id DESC
           LIMIT ?"#,
    )
    .bind(ip_address)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(attempt_from_sqlite_row).collect())
}

async fn list_recent_sqlite(pool: &SqlitePool, limit: i64) -> Result<Vec<LoginAttempt>> {
    let rows = sqlx::query(
        r#"SELECT * FROM login_attempts
           ORDER BY created_at DESC, id DESC
           LIMIT ?"#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(attempt_from_sqlite_row).collect())
}

fn attempt_from_sqlite_row(r: &sqlx::sqlite::SqliteRow) -> LoginAttempt {
    LoginAttempt {
        id: r.get("id"),
        ip_address: r.get("ip_address"),
        user_agent: r.get("user_agent"),
        endpoint: r.get("endpoint"),
        attempt_count: r.get("attempt_count"),
        blocked: r.get("blocked"),
        created_at: r.get("created_at"),
    }
}

// MySQL implementations

async fn append_mysql(pool: &MySqlPool, attempt: NewLoginAttempt) -> Result<LoginAttempt> {
    let now = Utc::now();
    let result = sqlx::query(
        r#"INSERT INTO login_attempts (ip_address, user_agent, endpoint, attempt_count, blocked, created_at)
           VALUES (?, ?, ?, ?, ?, ?)"#,
    )
    .bind(&attempt.ip_address)
    .bind(&attempt.user_agent)
    .bind(&attempt.endpoint)
    .bind(attempt.attempt_count)
    .bind(attempt.blocked)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(LoginAttempt {
        id: result.last_insert_id() as i64,
        ip_address: attempt.ip_address,
        user_agent: attempt.user_agent,
        endpoint: attempt.endpoint,
        attempt_count: attempt.attempt_count,
        blocked: attempt.blocked,
        created_at: now,
    })
}

async fn find_by_ip_mysql(
    pool: &MySqlPool,
    ip_address: &str,
    limit: i64,
) -> Result<Vec<LoginAttempt>> {
    let rows = sqlx::query(
        r#"SELECT * FROM login_attempts
           WHERE ip_address = ?
           ORDER BY created_at DESC, id DESC
           LIMIT ?"#,
    )
    .bind(ip_address)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(attempt_from_mysql_row).collect())
}

async fn list_recent_mysql(pool: &MySqlPool, limit: i64) -> Result<Vec<LoginAttempt>> {
    let rows = sqlx::query(
        r#"SELECT * FROM login_attempts
           ORDER BY created_at DESC, id DESC
           LIMIT ?"#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(attempt_from_mysql_row).collect())
}

fn attempt_from_mysql_row(r: &sqlx::mysql::MySqlRow) -> LoginAttempt {
    LoginAttempt {
        id: r.get("id"),
        ip_address: r.get("ip_address"),
        user_agent: r.get("user_agent"),
        endpoint: r.get("endpoint"),
        attempt_count: r.get("attempt_count"),
        blocked: r.get("blocked"),
        created_at: r.get("created_at"),
    }
}
