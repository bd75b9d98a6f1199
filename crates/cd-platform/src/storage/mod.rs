//! Storage Adapter
//!
//! Generic persistence of named collections. An adapter knows nothing about
//! entities: it stores an ordered list of JSON documents per collection plus a
//! revision counter that is bumped on every write.
//!
//! [`Storage`] is the typed handle repositories receive. It is cheap to clone
//! and is always injected, never global.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use cd_config::{StorageBackend, StorageConfig};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Persisted collection keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionKey {
    Developers,
    Invoices,
    Agreements,
    Events,
    Campaigns,
    Admins,
    Registry,
    Versions,
    AuditLogs,
}

impl CollectionKey {
    pub const ALL: [CollectionKey; 9] = [
        CollectionKey::Developers,
        CollectionKey::Invoices,
        CollectionKey::Agreements,
        CollectionKey::Events,
        CollectionKey::Campaigns,
        CollectionKey::Admins,
        CollectionKey::Registry,
        CollectionKey::Versions,
        CollectionKey::AuditLogs,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionKey::Developers => "developers",
            CollectionKey::Invoices => "invoices",
            CollectionKey::Agreements => "agreements",
            CollectionKey::Events => "events",
            CollectionKey::Campaigns => "campaigns",
            CollectionKey::Admins => "admins",
            CollectionKey::Registry => "registry",
            CollectionKey::Versions => "versions",
            CollectionKey::AuditLogs => "audit-logs",
        }
    }
}

impl fmt::Display for CollectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage quota exceeded writing '{key}': {required} bytes needed, {limit} allowed")]
    QuotaExceeded { key: String, required: usize, limit: usize },

    #[error("Revision conflict on '{key}': expected {expected}, found {actual}")]
    Conflict { key: String, expected: u64, actual: u64 },

    #[error("Corrupt data under '{key}': {message}")]
    Corrupt { key: String, revision: u64, message: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Raw contents of one collection
#[derive(Debug, Clone, PartialEq)]
pub struct StoredCollection {
    pub revision: u64,
    pub documents: Vec<Value>,
}

/// Backing medium for collections
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &'static str;

    /// Read a collection. `Ok(None)` when it was never written.
    async fn read(&self, key: CollectionKey) -> Result<Option<StoredCollection>, StorageError>;

    /// Replace a collection atomically and return the new revision.
    ///
    /// With `expected_revision`, the write fails with [`StorageError::Conflict`]
    /// unless the stored revision still matches (0 for a missing collection).
    async fn write(
        &self,
        key: CollectionKey,
        documents: &[Value],
        expected_revision: Option<u64>,
    ) -> Result<u64, StorageError>;
}

/// Typed items together with the revision they were read at
#[derive(Debug, Clone)]
pub struct Versioned<T> {
    pub revision: u64,
    pub items: Vec<T>,
}

/// Typed storage handle
#[derive(Clone)]
pub struct Storage {
    adapter: Arc<dyn StorageAdapter>,
}

impl Storage {
    pub fn new(adapter: Arc<dyn StorageAdapter>) -> Self {
        Self { adapter }
    }

    /// Unbounded in-process storage
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Open the adapter selected by configuration
    pub async fn connect(config: &StorageConfig) -> Result<Self, StorageError> {
        let adapter: Arc<dyn StorageAdapter> = match config.backend {
            StorageBackend::Memory if config.quota_bytes > 0 => Arc::new(MemoryStore::with_quota(config.quota_bytes)),
            StorageBackend::Memory => Arc::new(MemoryStore::new()),
            StorageBackend::Sqlite => {
                Arc::new(SqliteStore::connect(&config.database_url, config.max_connections).await?)
            }
        };
        info!(backend = adapter.name(), "Storage ready");
        Ok(Self::new(adapter))
    }

    pub fn backend_name(&self) -> &'static str {
        self.adapter.name()
    }

    /// Load a collection, returning `fallback` when it is missing or corrupt.
    ///
    /// Only backend failures (I/O, database) are returned as errors.
    pub async fn load<T: DeserializeOwned>(&self, key: CollectionKey, fallback: Vec<T>) -> Result<Vec<T>, StorageError> {
        match self.read_typed(key).await {
            Ok(Some(loaded)) => Ok(loaded.items),
            Ok(None) => Ok(fallback),
            Err(StorageError::Corrupt { key, message, .. }) => {
                warn!(collection = %key, error = %message, "Stored collection is unreadable, using fallback");
                Ok(fallback)
            }
            Err(e) => Err(e),
        }
    }

    /// Load a collection with its revision for a read-modify-write.
    ///
    /// A missing collection is empty at revision 0. Unreadable data is a
    /// [`StorageError::Corrupt`] so the caller cannot overwrite it unseen;
    /// a bulk [`save`](Self::save) is the way to replace it.
    pub async fn load_versioned<T: DeserializeOwned>(&self, key: CollectionKey) -> Result<Versioned<T>, StorageError> {
        match self.read_typed(key).await {
            Ok(Some(loaded)) => Ok(loaded),
            Ok(None) => Ok(Versioned {
                revision: 0,
                items: Vec::new(),
            }),
            Err(e) => {
                if let StorageError::Corrupt { key, revision, message } = &e {
                    error!(collection = %key, revision, error = %message, "Refusing to modify an unreadable collection");
                }
                Err(e)
            }
        }
    }

    /// Serialize and persist a whole collection (last write wins)
    pub async fn save<T: Serialize>(&self, key: CollectionKey, items: &[T]) -> Result<u64, StorageError> {
        let documents = to_documents(items)?;
        let revision = self.adapter.write(key, &documents, None).await?;
        debug!(collection = %key, count = documents.len(), revision, "Collection saved");
        Ok(revision)
    }

    /// Persist a whole collection if nobody wrote it since `expected_revision`
    pub async fn save_if<T: Serialize>(
        &self,
        key: CollectionKey,
        items: &[T],
        expected_revision: u64,
    ) -> Result<u64, StorageError> {
        let documents = to_documents(items)?;
        let revision = self.adapter.write(key, &documents, Some(expected_revision)).await?;
        debug!(collection = %key, count = documents.len(), revision, "Collection saved");
        Ok(revision)
    }

    async fn read_typed<T: DeserializeOwned>(&self, key: CollectionKey) -> Result<Option<Versioned<T>>, StorageError> {
        let Some(stored) = self.adapter.read(key).await? else {
            return Ok(None);
        };

        let items = stored
            .documents
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<T>, _>>()
            .map_err(|e| StorageError::Corrupt {
                key: key.to_string(),
                revision: stored.revision,
                message: format!("schema mismatch: {}", e),
            })?;

        Ok(Some(Versioned {
            revision: stored.revision,
            items,
        }))
    }
}

fn to_documents<T: Serialize>(items: &[T]) -> Result<Vec<Value>, StorageError> {
    items
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<_>, _>>()
        .map_err(StorageError::from)
}
