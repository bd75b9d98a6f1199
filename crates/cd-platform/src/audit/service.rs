//! Audit Service
//!
//! Appends are serialized through an async mutex so two concurrent writers
//! cannot drop each other's entries. Recording never fails the caller: any
//! storage error is logged and swallowed.

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error};

use super::entity::{AuditLogEntry, AuditQuery, NewAuditEntry};
use crate::storage::{CollectionKey, Storage, StorageError};

pub const DEFAULT_MAX_ENTRIES: usize = 1000;

#[derive(Clone)]
pub struct AuditService {
    storage: Storage,
    max_entries: usize,
    append_lock: Arc<Mutex<()>>,
}

impl AuditService {
    pub fn new(storage: Storage, max_entries: usize) -> Self {
        Self {
            storage,
            max_entries: max_entries.max(1),
            append_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Record an entry at the head of the log
    pub async fn record(&self, entry: NewAuditEntry) {
        let entry = entry.into_entry();
        let action = entry.action;
        let entity_type = entry.entity_type.clone();

        if let Err(e) = self.append(entry).await {
            error!(error = %e, %action, entity_type = %entity_type, "Failed to record audit entry");
        }
    }

    async fn append(&self, entry: AuditLogEntry) -> Result<(), StorageError> {
        let _guard = self.append_lock.lock().await;

        let mut entries: Vec<AuditLogEntry> = self.storage.load(CollectionKey::AuditLogs, Vec::new()).await?;
        entries.insert(0, entry);
        entries.truncate(self.max_entries);

        self.storage.save(CollectionKey::AuditLogs, &entries).await?;
        debug!(total = entries.len(), "Audit entry recorded");
        Ok(())
    }

    /// All entries matching `query`, newest first
    pub async fn query(&self, query: &AuditQuery) -> Result<Vec<AuditLogEntry>, StorageError> {
        let entries: Vec<AuditLogEntry> = self.storage.load(CollectionKey::AuditLogs, Vec::new()).await?;
        Ok(entries.into_iter().filter(|e| query.matches(e)).collect())
    }
}
