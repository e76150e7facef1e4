//! Memo repository

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{CreateMemoInput, Memo, UpdateMemoInput};

/// Memo repository trait
#[async_trait]
pub trait MemoRepository: Send + Sync {
    /// Create a memo attached to a place
    async fn create(&self, place_id: i64, input: CreateMemoInput) -> Result<Memo>;

    /// Get a memo by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Memo>>;

    /// List memos for a place, newest first
    async fn list_by_place(&self, place_id: i64) -> Result<Vec<Memo>>;

    /// Update a memo; returns the updated row or None if not found
    async fn update(&self, id: i64, input: UpdateMemoInput) -> Result<Option<Memo>>;

    /// Delete a memo; returns whether a row was removed
    async fn delete(&self, id: i64) -> Result<bool>;
}

/// Memo repository implementation
pub struct SqlxMemoRepository {
    pool: DynDatabasePool,
}

impl SqlxMemoRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MemoRepository for SqlxMemoRepository {
    async fn create(&self, place_id: i64, input: CreateMemoInput) -> Result<Memo> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_sqlite(self.pool.as_sqlite().unwrap(), place_id, input).await,
            DatabaseDriver::Mysql => create_mysql(self.pool.as_mysql().unwrap(), place_id, input).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Memo>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => get_by_id_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn list_by_place(&self, place_id: i64) -> Result<Vec<Memo>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_by_place_sqlite(self.pool.as_sqlite().unwrap(), place_id).await,
            DatabaseDriver::Mysql => list_by_place_mysql(self.pool.as_mysql().unwrap(), place_id).await,
        }
    }

    async fn update(&self, id: i64, input: UpdateMemoInput) -> Result<Option<Memo>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => update_sqlite(self.pool.as_sqlite().unwrap(), id, input).await,
            DatabaseDriver::Mysql => update_mysql(self.pool.as_mysql().unwrap(), id, input).await,
        }
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => delete_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }
}

// SQLite implementations

async fn create_sqlite(pool: &SqlitePool, place_id: i64, input: CreateMemoInput) -> Result<Memo> {
    let now = Utc::now();
    let result = sqlx::query(
        r#"INSERT INTO memos (place_id, item_name, rating, comment, created_at)
           VALUES (?, ?, ?, ?, ?)"#,
    )
    .bind(place_id)
    .bind(&input.item_name)
    .bind(input.rating.to_string())
    .bind(&input.comment)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(Memo {
        id: result.last_insert_rowid(),
        place_id,
        item_name: input.item_name,
        rating: input.rating,
        comment: input.comment,
        created_at: now,
    })
}

async fn get_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Memo>> {
    let row = sqlx::query("SELECT * FROM memos WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(r) => Ok(Some(memo_from_sqlite_row(&r)?)),
        None => Ok(None),
    }
}

async fn list_by_place_sqlite(pool: &SqlitePool, place_id: i64) -> Result<Vec<Memo>> {
    let rows = sqlx::query("SELECT * FROM memos WHERE place_id = ? ORDER BY created_at DESC")
        .bind(place_id)
        .fetch_all(pool)
        .await?;

    rows.iter().map(memo_from_sqlite_row).collect()
}

async fn update_sqlite(pool: &SqlitePool, id: i64, input: UpdateMemoInput) -> Result<Option<Memo>> {
    let existing = match get_by_id_sqlite(pool, id).await? {
        Some(m) => m,
        None => return Ok(None),
    };

    let updated = merge_update(existing, input);

    sqlx::query("UPDATE memos SET item_name = ?, rating = ?, comment = ? WHERE id = ?")
        .bind(&updated.item_name)
        .bind(updated.rating.to_string())
        .bind(&updated.comment)
        .bind(id)
        .execute(pool)
        .await?;

    Ok(Some(updated))
}

async fn delete_sqlite(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM memos WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

fn memo_from_sqlite_row(r: &sqlx::sqlite::SqliteRow) -> Result<Memo> {
    Ok(Memo {
        id: r.get("id"),
        place_id: r.get("place_id"),
        item_name: r.get("item_name"),
        rating: r
            .get::<String, _>("rating")
            .parse()
            .map_err(anyhow::Error::msg)?,
        comment: r.get("comment"),
        created_at: r.get("created_at"),
    })
}

// MySQL implementations

async fn create_mysql(pool: &MySqlPool, place_id: i64, input: CreateMemoInput) -> Result<Memo> {
    let now = Utc::now();
    let result = sqlx::query(
        r#"INSERT INTO memos (place_id, item_name, rating, comment, created_at)
           VALUES (?, ?, ?, ?, ?)"#,
    )
    .bind(place_id)
    .bind(&input.item_name)
    .bind(input.rating.to_string())
    .bind(&input.comment)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(Memo {
        id: result.last_insert_id() as i64,
        place_id,
        item_name: input.item_name,
        rating: input.rating,
        comment: input.comment,
        created_at: now,
    })
}

async fn get_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Memo>> {
    let row = sqlx::query("SELECT * FROM memos WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(r) => Ok(Some(memo_from_mysql_row(&r)?)),
        None => Ok(None),
    }
}

async fn list_by_place_mysql(pool: &MySqlPool, place_id: i64) -> Result<Vec<Memo>> {
    let rows = sqlx::query("SELECT * FROM memos WHERE place_id = ? ORDER BY created_at DESC")
        .bind(place_id)
        .fetch_all(pool)
        .await?;

    rows.iter().map(memo_from_mysql_row).collect()
}

async fn update_mysql(pool: &MySqlPool, id: i64, input: UpdateMemoInput) -> Result<Option<Memo>> {
    let existing = match get_by_id_mysql(pool, id).await? {
        Some(m) => m,
        None => return Ok(None),
    };

    let updated = merge_update(existing, input);

    sqlx::query("UPDATE memos SET item_name = ?, rating = ?, comment = ? WHERE id = ?")
        .bind(&updated.item_name)
        .bind(updated.rating.to_string())
        .bind(&updated.comment)
        .bind(id)
        .execute(pool)
        .await?;

    Ok(Some(updated))
}

async fn delete_mysql(pool: &MySqlPool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM memos WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

fn memo_from_mysql_row(r: &sqlx::mysql::MySqlRow) -> Result<Memo> {
    Ok(Memo {
        id: r.get("id"),
        place_id: r.get("place_id"),
        item_name: r.get("item_name"),
        rating: r
            .get::<String, _>("rating")
            .parse()
            .map_err(anyhow::Error::msg)?,
        comment: r.get("comment"),
        created_at: r.get("created_at"),
    })
}

/// Apply partial update fields onto an existing memo
fn merge_update(existing: Memo, input: UpdateMemoInput) -> Memo {
    Memo {
        item_name: input.item_name.unwrap_or(existing.item_name),
        rating: input.rating.unwrap_or(existing.rating),
        comment: input.comment.or(existing.comment),
        ..existing
    }
}
