//! Place repository

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use sqlx::{MySqlPool, Row, SqlitePool};

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{CreatePlaceInput, Place, PlaceType, UpdatePlaceInput};

/// Rectangular viewport used by the map marker query
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct MapBounds {
    pub south: f64,
    pub north: f64,
    pub west: f64,
    pub east: f64,
}

/// Place repository trait
#[async_trait]
pub trait PlaceRepository: Send + Sync {
    /// Create a new place
    async fn create(&self, input: CreatePlaceInput) -> Result<Place>;

    /// Get a place by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Place>>;

    /// List places, optionally filtered by type, newest first
    async fn list(&self, place_type: Option<PlaceType>) -> Result<Vec<Place>>;

    /// Find places inside a map viewport
    async fn find_in_bounds(&self, bounds: MapBounds, place_type: Option<PlaceType>) -> Result<Vec<Place>>;

    /// Check whether a place with the same name and address already exists
    async fn exists_by_name_and_address(&self, name: &str, address: &str) -> Result<bool>;

    /// Update a place; returns the updated row or None if not found
    async fn update(&self, id: i64, input: UpdatePlaceInput) -> Result<Option<Place>>;

    /// Soft delete a place; returns false if missing or already deleted
    async fn delete(&self, id: i64) -> Result<bool>;
}

/// Place repository implementation
pub struct SqlxPlaceRepository {
    pool: DynDatabasePool,
}

impl SqlxPlaceRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PlaceRepository for SqlxPlaceRepository {
    async fn create(&self, input: CreatePlaceInput) -> Result<Place> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_sqlite(self.pool.as_sqlite().unwrap(), input).await,
            DatabaseDriver::Mysql => create_mysql(self.pool.as_mysql().unwrap(), input).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Place>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => get_by_id_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn list(&self, place_type: Option<PlaceType>) -> Result<Vec<Place>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_sqlite(self.pool.as_sqlite().unwrap(), place_type).await,
            DatabaseDriver::Mysql => list_mysql(self.pool.as_mysql().unwrap(), place_type).await,
        }
    }

    async fn find_in_bounds(&self, bounds: MapBounds, place_type: Option<PlaceType>) -> Result<Vec<Place>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => find_in_bounds_sqlite(self.pool.as_sqlite().unwrap(), bounds, place_type).await,
            DatabaseDriver::Mysql => find_in_bounds_mysql(self.pool.as_mysql().unwrap(), bounds, place_type).await,
        }
    }

    async fn exists_by_name_and_address(&self, name: &str, address: &str) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => exists_sqlite(self.pool.as_sqlite().unwrap(), name, address).await,
            DatabaseDriver::Mysql => exists_mysql(self.pool.as_mysql().unwrap(), name, address).await,
        }
    }

    async fn update(&self, id: i64, input: UpdatePlaceInput) -> Result<Option<Place>> {
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

async fn create_sqlite(pool: &SqlitePool, input: CreatePlaceInput) -> Result<Place> {
    let now = Utc::now();
    let result = sqlx::query(
        r#"INSERT INTO places (name, place_type, address, latitude, longitude, description, image_url, created_at, updated_at)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(&input.name)
    .bind(input.place_type.to_string())
    .bind(&input.address)
    .bind(input.latitude)
    .bind(input.longitude)
    .bind(&input.description)
    .bind(&input.image_url)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(Place {
        id: result.last_insert_rowid(),
        name: input.name,
        place_type: input.place_type,
        address: input.address,
        latitude: input.latitude,
        longitude: input.longitude,
        description: input.description,
        image_url: input.image_url,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    })
}

async fn get_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Place>> {
    let row = sqlx::query("SELECT * FROM places WHERE id = ? AND deleted_at IS NULL")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(r) => Ok(Some(place_from_sqlite_row(&r)?)),
        None => Ok(None),
    }
}

async fn list_sqlite(pool: &SqlitePool, place_type: Option<PlaceType>) -> Result<Vec<Place>> {
    let rows = match place_type {
        Some(t) => {
            sqlx::query("SELECT * FROM places WHERE deleted_at IS NULL AND place_type = ? ORDER BY created_at DESC")
                .bind(t.to_string())
                .fetch_all(pool)
                .await?
        }
        None => {
            sqlx::query("SELECT * FROM places WHERE deleted_at IS NULL ORDER BY created_at DESC")
                .fetch_all(pool)
                .await?
        }
    };

    rows.iter().map(place_from_sqlite_row).collect()
}

async fn find_in_bounds_sqlite(
    pool: &SqlitePool,
    bounds: MapBounds,
    place_type: Option<PlaceType>,
) -> Result<Vec<Place>> {
    let rows = match place_type {
        Some(t) => {
            sqlx::query(
                r#"SELECT * FROM places
                   WHERE deleted_at IS NULL
                     AND latitude BETWEEN ? AND ?
                     AND longitude BETWEEN ? AND ?
                     AND place_type = ?"#,
            )
            .bind(bounds.south)
            .bind(bounds.north)
            .bind(bounds.west)
            .bind(bounds.east)
            .bind(t.to_string())
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query(
                r#"SELECT * FROM places
                   WHERE deleted_at IS NULL
                     AND latitude BETWEEN ? AND ?
                     AND longitude BETWEEN ? AND ?"#,
            )
            .bind(bounds.south)
            .bind(bounds.north)
            .bind(bounds.west)
            .bind(bounds.east)
            .fetch_all(pool)
            .await?
        }
    };

    rows.iter().map(place_from_sqlite_row).collect()
}

async fn exists_sqlite(pool: &SqlitePool, name: &str, address: &str) -> Result<bool> {
    let row = sqlx::query(
        "SELECT COUNT(*) as count FROM places WHERE name = ? AND address = ? AND deleted_at IS NULL",
    )
        .bind(name)
        .bind(address)
        .fetch_one(pool)
        .await?;
    let count: i64 = row.get("count");
    Ok(count > 0)
}

async fn update_sqlite(pool: &SqlitePool, id: i64, input: UpdatePlaceInput) -> Result<Option<Place>> {
    let existing = match get_by_id_sqlite(pool, id).await? {
        Some(p) => p,
        None => return Ok(None),
    };

    let updated = merge_update(existing, input);
    let now = Utc::now();

    sqlx::query(
        r#"UPDATE places
           SET name = ?, place_type = ?, address = ?, latitude = ?, longitude = ?,
               description = ?, image_url = ?, updated_at = ?
           WHERE id = ?"#,
    )
    .bind(&updated.name)
    .bind(updated.place_type.to_string())
    .bind(&updated.address)
    .bind(updated.latitude)
    .bind(updated.longitude)
    .bind(&updated.description)
    .bind(&updated.image_url)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(Some(Place {
        updated_at: now,
        ..updated
    }))
}

async fn delete_sqlite(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("UPDATE places SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL")
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

fn place_from_sqlite_row(r: &sqlx::sqlite::SqliteRow) -> Result<Place> {
    Ok(Place {
        id: r.get("id"),
        name: r.get("name"),
        place_type: r
            .get::<String, _>("place_type")
            .parse()
            .map_err(anyhow::Error::msg)?,
        address: r.get("address"),
        latitude: r.get("latitude"),
        longitude: r.get("longitude"),
        description: r.get("description"),
        image_url: r.get("image_url"),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
        deleted_at: r.get("deleted_at"),
    })
}

// MySQL implementations

async fn create_mysql(pool: &MySqlPool, input: CreatePlaceInput) -> Result<Place> {
    let now = Utc::now();
    let result = sqlx::query(
        r#"INSERT INTO places (name, place_type, address, latitude, longitude, description, image_url, created_at, updated_at)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(&input.name)
    .bind(input.place_type.to_string())
    .bind(&input.address)
    .bind(input.latitude)
    .bind(input.longitude)
    .bind(&input.description)
    .bind(&input.image_url)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(Place {
        id: result.last_insert_id() as i64,
        name: input.name,
        place_type: input.place_type,
        address: input.address,
        latitude: input.latitude,
        longitude: input.longitude,
        description: input.description,
        image_url: input.image_url,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    })
}

async fn get_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Place>> {
    let row = sqlx::query("SELECT * FROM places WHERE id = ? AND deleted_at IS NULL")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(r) => Ok(Some(place_from_mysql_row(&r)?)),
        None => Ok(None),
    }
}

async fn list_mysql(pool: &MySqlPool, place_type: Option<PlaceType>) -> Result<Vec<Place>> {
    let rows = match place_type {
        Some(t) => {
            sqlx::query("SELECT * FROM places WHERE deleted_at IS NULL AND place_type = ? ORDER BY created_at DESC")
                .bind(t.to_string())
                .fetch_all(pool)
                .await?
        }
        None => {
            sqlx::query("SELECT * FROM places WHERE deleted_at IS NULL ORDER BY created_at DESC")
                .fetch_all(pool)
                .await?
        }
    };

    rows.iter().map(place_from_mysql_row).collect()
}

async fn find_in_bounds_mysql(
    pool: &MySqlPool,
    bounds: MapBounds,
    place_type: Option<PlaceType>,
) -> Result<Vec<Place>> {
    let rows = match place_type {
        Some(t) => {
            sqlx::query(
                r#"SELECT * FROM places
                   WHERE deleted_at IS NULL
                     AND latitude BETWEEN ? AND ?
                     AND longitude BETWEEN ? AND ?
                     AND place_type = ?"#,
            )
            .bind(bounds.south)
            .bind(bounds.north)
            .bind(bounds.west)
            .bind(bounds.east)
            .bind(t.to_string())
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query(
                r#"SELECT * FROM places
                   WHERE deleted_at IS NULL
                     AND latitude BETWEEN ? AND ?
                     AND longitude BETWEEN ? AND ?"#,
            )
            .bind(bounds.south)
            .bind(bounds.north)
            .bind(bounds.west)
            .bind(bounds.east)
            .fetch_all(pool)
            .await?
        }
    };

    rows.iter().map(place_from_mysql_row).collect()
}

async fn exists_mysql(pool: &MySqlPool, name: &str, address: &str) -> Result<bool> {
    let row = sqlx::query(
        "SELECT COUNT(*) as count FROM places WHERE name = ? AND address = ? AND deleted_at IS NULL",
    )
        .bind(name)
        .bind(address)
        .fetch_one(pool)
        .await?;
    let count: i64 = row.get("count");
    Ok(count > 0)
}

async fn update_mysql(pool: &MySqlPool, id: i64, input: UpdatePlaceInput) -> Result<Option<Place>> {
    let existing = match get_by_id_mysql(pool, id).await? {
        Some(p) => p,
        None => return Ok(None),
    };

    let updated = merge_update(existing, input);
    let now = Utc::now();

    sqlx::query(
        r#"UPDATE places
           SET name = ?, place_type = ?, address = ?, latitude = ?, longitude = ?,
               description = ?, image_url = ?, updated_at = ?
           WHERE id = ?"#,
    )
    .bind(&updated.name)
    .bind(updated.place_type.to_string())
    .bind(&updated.address)
    .bind(updated.latitude)
    .bind(updated.longitude)
    .bind(&updated.description)
    .bind(&updated.image_url)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(Some(Place {
        updated_at: now,
        ..updated
    }))
}

async fn delete_mysql(pool: &MySqlPool, id: i64) -> Result<bool> {
    let result = sqlx::query("UPDATE places SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL")
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

fn place_from_mysql_row(r: &sqlx::mysql::MySqlRow) -> Result<Place> {
    Ok(Place {
        id: r.get("id"),
        name: r.get("name"),
        place_type: r
            .get::<String, _>("place_type")
            .parse()
            .map_err(anyhow::Error::msg)?,
        address: r.get("address"),
        latitude: r.get("latitude"),
        longitude: r.get("longitude"),
        description: r.get("description"),
        image_url: r.get("image_url"),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
        deleted_at: r.get("deleted_at"),
    })
}

/// Apply partial update fields onto an existing place
fn merge_update(existing: Place, input: UpdatePlaceInput) -> Place {
    Place {
        name: input.name.unwrap_or(existing.name),
        place_type: input.place_type.unwrap_or(existing.place_type),
        address: input.address.unwrap_or(existing.address),
        latitude: input.latitude.unwrap_or(existing.latitude),
        longitude: input.longitude.unwrap_or(existing.longitude),
        description: input.description.or(existing.description),
        image_url: input.image_url.or(existing.image_url),
        ..existing
    }
}
