//! SQLite storage adapter
//!
//! Relational deployment: every document is one row in `collection_rows`,
//! the per-collection revision lives in `collections`. A collection write
//! replaces all of its rows inside a single transaction.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};
use std::time::Duration;
use tracing::{debug, info};

use super::{CollectionKey, StorageAdapter, StorageError, StoredCollection};

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connect and create the schema.
    ///
    /// In-memory URLs are pinned to a single connection, since every SQLite
    /// connection would otherwise see its own empty database.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StorageError> {
        let in_memory = url.contains(":memory:");
        let mut options = SqlitePoolOptions::new().max_connections(if in_memory { 1 } else { max_connections.max(1) });
        if in_memory {
            options = options
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>);
        }

        let pool = options.connect(url).await?;
        let store = Self::from_pool(pool).await?;
        info!(url = %url, "SQLite storage initialized");
        Ok(store)
    }

    /// Wrap an existing pool and create the schema
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StorageError> {
        let store = Self { pool };
        store.create_schema().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn create_schema(&self) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS collections (
                name TEXT PRIMARY KEY,
                revision INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS collection_rows (
                collection TEXT NOT NULL,
                position INTEGER NOT NULL,
                doc_id TEXT,
                partner_code TEXT,
                data TEXT NOT NULL,
                PRIMARY KEY (collection, position)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Tenant-scoped lookups
        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_collection_rows_partner
            ON collection_rows (collection, partner_code)
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn string_field<'a>(doc: &'a Value, field: &str) -> Option<&'a str> {
    doc.get(field).and_then(Value::as_str)
}

#[async_trait]
impl StorageAdapter for SqliteStore {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn read(&self, key: CollectionKey) -> Result<Option<StoredCollection>, StorageError> {
        let revision: Option<i64> = sqlx::query_scalar("SELECT revision FROM collections WHERE name = ?")
            .bind(key.as_str())
            .fetch_optional(&self.pool)
            .await?;

        let Some(revision) = revision else {
            return Ok(None);
        };
        let revision = revision as u64;

        let rows = sqlx::query("SELECT data FROM collection_rows WHERE collection = ? ORDER BY position")
            .bind(key.as_str())
            .fetch_all(&self.pool)
            .await?;

        let mut documents = Vec::with_capacity(rows.len());
        for row in rows {
            let data: String = row.get("data");
            let doc = serde_json::from_str(&data).map_err(|e| StorageError::Corrupt {
                key: key.to_string(),
                revision,
                message: e.to_string(),
            })?;
            documents.push(doc);
        }

        Ok(Some(StoredCollection { revision, documents }))
    }

    async fn write(
        &self,
        key: CollectionKey,
        documents: &[Value],
        expected_revision: Option<u64>,
    ) -> Result<u64, StorageError> {
        let mut tx = self.pool.begin().await?;

        let current: Option<i64> = sqlx::query_scalar("SELECT revision FROM collections WHERE name = ?")
            .bind(key.as_str())
            .fetch_optional(&mut *tx)
            .await?;
        let current = current.unwrap_or(0) as u64;

        if let Some(expected) = expected_revision {
            if expected != current {
                tx.rollback().await?;
                return Err(StorageError::Conflict {
                    key: key.to_string(),
                    expected,
                    actual: current,
                });
            }
        }

        sqlx::query("DELETE FROM collection_rows WHERE collection = ?")
            .bind(key.as_str())
            .execute(&mut *tx)
            .await?;

        for (position, doc) in documents.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO collection_rows (collection, position, doc_id, partner_code, data)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(key.as_str())
            .bind(position as i64)
            .bind(string_field(doc, "id"))
            .bind(string_field(doc, "partnerCode"))
            .bind(serde_json::to_string(doc)?)
            .execute(&mut *tx)
            .await?;
        }

        let revision = current + 1;
        sqlx::query(
            r#"
            INSERT INTO collections (name, revision, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET revision = excluded.revision, updated_at = excluded.updated_at
            "#,
        )
        .bind(key.as_str())
        .bind(revision as i64)
        .bind(Utc::now().timestamp_millis())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(collection = %key, rows = documents.len(), revision, "SQLite collection replaced");
        Ok(revision)
    }
}
