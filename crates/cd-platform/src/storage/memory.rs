//! In-process key-value store
//!
//! Mirrors the browser local-storage deployment: one serialized JSON array per
//! key and an optional byte quota across all keys.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;

use super::{CollectionKey, StorageAdapter, StorageError, StoredCollection};

struct Slot {
    revision: u64,
    raw: String,
}

pub struct MemoryStore {
    slots: RwLock<HashMap<CollectionKey, Slot>>,
    quota_bytes: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            quota_bytes: None,
        }
    }

    /// Reject writes that would push total usage past `quota_bytes`
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            quota_bytes: Some(quota_bytes),
        }
    }

    /// Store a raw string under `key`, bypassing serialization
    pub fn put_raw(&self, key: CollectionKey, raw: impl Into<String>) {
        let mut slots = self.slots.write();
        let revision = slots.get(&key).map(|s| s.revision).unwrap_or(0) + 1;
        slots.insert(key, Slot { revision, raw: raw.into() });
    }

    /// Bytes currently held across all keys
    pub fn usage_bytes(&self) -> usize {
        self.slots.read().values().map(|s| s.raw.len()).sum()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageAdapter for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn read(&self, key: CollectionKey) -> Result<Option<StoredCollection>, StorageError> {
        let slots = self.slots.read();
        let Some(slot) = slots.get(&key) else {
            return Ok(None);
        };

        match serde_json::from_str::<Vec<Value>>(&slot.raw) {
            Ok(documents) => Ok(Some(StoredCollection {
                revision: slot.revision,
                documents,
            })),
            Err(e) => Err(StorageError::Corrupt {
                key: key.to_string(),
                revision: slot.revision,
                message: e.to_string(),
            }),
        }
    }

    async fn write(
        &self,
        key: CollectionKey,
        documents: &[Value],
        expected_revision: Option<u64>,
    ) -> Result<u64, StorageError> {
        let raw = serde_json::to_string(documents)?;

        let mut slots = self.slots.write();
        let current = slots.get(&key).map(|s| s.revision).unwrap_or(0);

        if let Some(expected) = expected_revision {
            if expected != current {
                return Err(StorageError::Conflict {
                    key: key.to_string(),
                    expected,
                    actual: current,
                });
            }
        }

        if let Some(limit) = self.quota_bytes {
            let others: usize = slots
                .iter()
                .filter(|(k, _)| **k != key)
                .map(|(_, s)| s.raw.len())
                .sum();
            let required = others + raw.len();
            if required > limit {
                warn!(collection = %key, required, limit, "Storage quota exceeded");
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                    required,
                    limit,
                });
            }
        }

        let revision = current + 1;
        slots.insert(key, Slot { revision, raw });
        Ok(revision)
    }
}
