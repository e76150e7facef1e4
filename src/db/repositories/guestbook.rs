//! Guestbook repository
//!
//! Messages are soft deleted. The per-IP daily count only sees live rows,
//! so deleting an own message frees that quota slot; the global daily count
//! keeps seeing deleted rows.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::GuestbookMessage;

/// Guestbook repository trait
#[async_trait]
pub trait GuestbookRepository: Send + Sync {
    /// Insert a new message
    async fn create(
        &self,
        nickname: Option<String>,
        content: String,
        ip_address: String,
    ) -> Result<GuestbookMessage>;

    /// Get a message by ID, deleted or not
    async fn get_by_id(&self, id: i64) -> Result<Option<GuestbookMessage>>;

    /// List the most recent non-deleted messages, newest first
    async fn list_recent(&self, limit: i64) -> Result<Vec<GuestbookMessage>>;

    /// Soft delete a message; returns false if missing or already deleted
    async fn soft_delete(&self, id: i64) -> Result<bool>;

    /// Count live messages written from one IP since a point in time.
    /// Soft-deleted rows are excluded; deleting an own message frees the slot.
    async fn count_by_ip_since(&self, ip_address: &str, since: DateTime<Utc>) -> Result<i64>;

    /// Count all messages written since a point in time, soft-deleted included
    async fn count_all_since(&self, since: DateTime<Utc>) -> Result<i64>;
}

/// Guestbook repository implementation
pub struct SqlxGuestbookRepository {
    pool: DynDatabasePool,
}

impl SqlxGuestbookRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GuestbookRepository for SqlxGuestbookRepository {
    async fn create(
        &self,
        nickname: Option<String>,
        content: String,
        ip_address: String,
    ) -> Result<GuestbookMessage> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_sqlite(self.pool.as_sqlite().unwrap(), nickname, content, ip_address).await
            }
            DatabaseDriver::Mysql => {
                create_mysql(self.pool.as_mysql().unwrap(), nickname, content, ip_address).await
            }
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<GuestbookMessage>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => get_by_id_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<GuestbookMessage>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_recent_sqlite(self.pool.as_sqlite().unwrap(), limit).await,
            DatabaseDriver::Mysql => list_recent_mysql(self.pool.as_mysql().unwrap(), limit).await,
        }
    }

    async fn soft_delete(&self, id: i64) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => soft_delete_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => soft_delete_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn count_by_ip_since(&self, ip_address: &str, since: DateTime<Utc>) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                count_by_ip_since_sqlite(self.pool.as_sqlite().unwrap(), ip_address, since).await
            }
            DatabaseDriver::Mysql => {
                count_by_ip_since_mysql(self.pool.as_mysql().unwrap(), ip_address, since).await
            }
        }
    }

    async fn count_all_since(&self, since: DateTime<Utc>) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                count_all_since_sqlite(self.pool.as_sqlite().unwrap(), since).await
            }
            DatabaseDriver::Mysql => {
                count_all_since_mysql(self.pool.as_mysql().unwrap(), since).await
            }
        }
    }
}

// SQLite implementations

async fn create_sqlite(
    pool: &SqlitePool,
    nickname: Option<String>,
    content: String,
    ip_address: String,
) -> Result<GuestbookMessage> {
    let now = Utc::now();
    let result = sqlx::query(
        r#"INSERT INTO guestbook_messages (nickname, content, ip_address, created_at)
           VALUES (?, ?, ?, ?)"#,
    )
    .bind(&nickname)
    .bind(&content)
    .bind(&ip_address)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(GuestbookMessage {
        id: result.last_insert_rowid(),
        nickname,
        content,
        ip_address,
        created_at: now,
        deleted_at: None,
    })
}

async fn get_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<GuestbookMessage>> {
    let row = sqlx::query("SELECT * FROM guestbook_messages WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|r| message_from_sqlite_row(&r)))
}

async fn list_recent_sqlite(pool: &SqlitePool, limit: i64) -> Result<Vec<GuestbookMessage>> {
    let rows = sqlx::query(
        r#"SELECT * FROM guestbook_messages
           WHERE deleted_at IS NULL
           ORDER BY created_at DESC, id DESC
           LIMIT ?"#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(message_from_sqlite_row).collect())
}

async fn soft_delete_sqlite(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE guestbook_messages SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL",
    )
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

async fn count_by_ip_since_sqlite(
    pool: &SqlitePool,
    ip_address: &str,
    since: DateTime<Utc>,
) -> Result<i64> {
    let row = sqlx::query(
        "SELECT COUNT(*) as count FROM guestbook_messages WHERE ip_address = ? AND created_at >= ? AND deleted_at IS NULL",
    )
    .bind(ip_address)
    .bind(since)
    .fetch_one(pool)
    .await?;
    Ok(row.get("count"))
}

async fn count_all_since_sqlite(pool: &SqlitePool, since: DateTime<Utc>) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM guestbook_messages WHERE created_at >= ?")
        .bind(since)
        .fetch_one(pool)
        .await?;
    Ok(row.get("count"))
}

fn message_from_sqlite_row(r: &sqlx::sqlite::SqliteRow) -> GuestbookMessage {
    GuestbookMessage {
        id: r.get("id"),
        nickname: r.get("nickname"),
        content: r.get("content"),
        ip_address: r.get("ip_address"),
        created_at: r.get("created_at"),
        deleted_at: r.get("deleted_at"),
    }
}

// MySQL implementations

async fn create_mysql(
    pool: &MySqlPool,
    nickname: Option<String>,
    content: String,
    ip_address: String,
) -> Result<GuestbookMessage> {
    let now = Utc::now();
    let result = sqlx::query(
        r#"INSERT INTO guestbook_messages (nickname, content, ip_address, created_at)
           VALUES (?, ?, ?, ?)"#,
    )
    .bind(&nickname)
    .bind(&content)
    .bind(&ip_address)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(GuestbookMessage {
        id: result.last_insert_id() as i64,
        nickname,
        content,
        ip_address,
        created_at: now,
        deleted_at: None,
    })
}

async fn get_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<GuestbookMessage>> {
    let row = sqlx::query("SELECT * FROM guestbook_messages WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|r| message_from_mysql_row(&r)))
}

async fn list_recent_mysql(pool: &MySqlPool, limit: i64) -> Result<Vec<GuestbookMessage>> {
    let rows = sqlx::query(
        r#"SELECT * FROM guestbook_messages
           WHERE deleted_at IS NULL
           ORDER BY created_at DESC, id DESC
           LIMIT ?"#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(message_from_mysql_row).collect())
}

async fn soft_delete_mysql(pool: &MySqlPool, id: i64) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE guestbook_messages SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL",
    )
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

async fn count_by_ip_since_mysql(
    pool: &MySqlPool,
    ip_address: &str,
    since: DateTime<Utc>,
) -> Result<i64> {
    let row = sqlx::query(
        "SELECT COUNT(*) as count FROM guestbook_messages WHERE ip_address = ? AND created_at >= ? AND deleted_at IS NULL",
    )
    .bind(ip_address)
    .bind(since)
    .fetch_one(pool)
    .await?;
    Ok(row.get("count"))
}

async fn count_all_since_mysql(pool: &MySqlPool, since: DateTime<Utc>) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM guestbook_messages WHERE created_at >= ?")
        .bind(since)
        .fetch_one(pool)
        .await?;
    Ok(row.get("count"))
}

fn message_from_mysql_row(r: &sqlx::mysql::MySqlRow) -> GuestbookMessage {
    GuestbookMessage {
        id: r.get("id"),
        nickname: r.get("nickname"),
        content: r.get("content"),
        ip_address: r.get("ip_address"),
        created_at: r.get("created_at"),
        deleted_at: r.get("deleted_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use chrono::Duration;

    async fn setup() -> SqlxGuestbookRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxGuestbookRepository::new(pool)
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let repo = setup().await;

        repo.create(Some("ann".to_string()), "first!".to_string(), "10.0.0.1".to_string())
            .await
            .expect("create failed");
        repo.create(None, "lovely place".to_string(), "10.0.0.2".to_string())
            .await
            .expect("create failed");

        let messages = repo.list_recent(20).await.expect("list failed");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, "lovely place");
    }

    #[tokio::test]
    async fn test_list_respects_limit() {
        let repo = setup().await;
        for i in 0..5 {
            repo.create(None, format!("message {}", i), "10.0.0.1".to_string())
                .await
                .expect("create failed");
        }

        let messages = repo.list_recent(3).await.expect("list failed");
        assert_eq!(messages.len(), 3);
    }

    #[tokio::test]
    async fn test_soft_delete_hides_from_list() {
        let repo = setup().await;
        let msg = repo
            .create(None, "oops".to_string(), "10.0.0.1".to_string())
            .await
            .expect("create failed");

        assert!(repo.soft_delete(msg.id).await.expect("delete failed"));

        let messages = repo.list_recent(20).await.expect("list failed");
        assert!(messages.is_empty());

        // Row still exists with the deletion timestamp
        let fetched = repo
            .get_by_id(msg.id)
            .await
            .expect("get failed")
            .expect("row should remain");
        assert!(fetched.deleted_at.is_some());

        // Second delete is a no-op
        assert!(!repo.soft_delete(msg.id).await.expect("delete failed"));
    }

    #[tokio::test]
    async fn test_per_ip_count_excludes_deleted() {
        let repo = setup().await;
        let since = Utc::now() - Duration::minutes(1);

        let msg = repo
            .create(None, "counted".to_string(), "10.0.0.1".to_string())
            .await
            .expect("create failed");
        repo.create(None, "other ip".to_string(), "10.0.0.2".to_string())
            .await
            .expect("create failed");
        repo.soft_delete(msg.id).await.expect("delete failed");

        // Deleting an own message frees the per-IP slot
        assert_eq!(
            repo.count_by_ip_since("10.0.0.1", since).await.expect("count failed"),
            0
        );
        // The global count keeps seeing the deleted row
        assert_eq!(repo.count_all_since(since).await.expect("count failed"), 2);
    }

    #[tokio::test]
    async fn test_counts_respect_since() {
        let repo = setup().await;
        repo.create(None, "now".to_string(), "10.0.0.1".to_string())
            .await
            .expect("create failed");

        let future = Utc::now() + Duration::hours(1);
        assert_eq!(repo.count_all_since(future).await.expect("count failed"), 0);
    }
}
