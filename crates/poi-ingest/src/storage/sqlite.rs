//! SQLite-backed store
//!
//! Uses an sqlx pool; SQLite's single writer lock serializes concurrent
//! inserts from parallel workers.

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::{debug, info};

use super::StorageSink;
use crate::error::StorageError;
use crate::record::Record;

/// Store for points of interest in the `points_of_interest` table
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connect to `database_url`, creating the file if needed, and apply migrations
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        // every connection to an in-memory database is a separate database,
        // so keep exactly one alive for the lifetime of the pool
        let pool = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(4)
        }
        .connect_with(options)
        .await?;

        let store = Self::from_pool(pool);
        store.migrate().await?;

        info!(database_url, "Connected to POI store");
        Ok(store)
    }

    /// Wrap an existing pool; the caller is responsible for migrations
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Apply the embedded schema migrations
    pub async fn migrate(&self) -> Result<(), StorageError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Number of stored points of interest
    pub async fn count(&self) -> Result<i64, StorageError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM points_of_interest")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Timestamps stored for `source_id`, oldest first
    pub async fn timestamps_for(&self, source_id: &str) -> Result<Vec<i64>, StorageError> {
        let timestamps = sqlx::query_scalar(
            r#"
            SELECT timestamp FROM points_of_interest
            WHERE phone_number = ?1
            ORDER BY timestamp ASC
            "#,
        )
        .bind(source_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(timestamps)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl StorageSink for SqliteStore {
    async fn latest_timestamp(&self, source_id: &str) -> Result<Option<i64>, StorageError> {
        let latest = sqlx::query_scalar(
            r#"
            SELECT timestamp FROM points_of_interest
            WHERE phone_number = ?1
            ORDER BY timestamp DESC
            LIMIT 1
            "#,
        )
        .bind(source_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(latest)
    }

    async fn insert(&self, record: &Record) -> Result<i64, StorageError> {
        let hash = record.content_hash();

        let result = sqlx::query(
            r#"
            INSERT INTO points_of_interest (
                phone_number, subscriber_id, latitude, longitude, timestamp,
                timezone, title, description, category, photo, hash
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&record.source_id)
        .bind(&record.subscriber_id)
        .bind(record.latitude)
        .bind(record.longitude)
        .bind(record.timestamp)
        .bind(&record.timezone)
        .bind(&record.title)
        .bind(&record.description)
        .bind(&record.category)
        .bind(&record.photo)
        .bind(&hash)
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => {
                let id = done.last_insert_rowid();
                debug!(id, hash = %hash, "Stored point of interest");
                Ok(id)
            },
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(StorageError::Duplicate { hash })
            },
            Err(err) => Err(err.into()),
        }
    }
}
