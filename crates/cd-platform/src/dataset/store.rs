//! Version Store
//!
//! Newest-first list of dataset snapshots, capped at `max_versions`.

use tracing::info;

use super::entity::DatasetVersion;
use crate::audit::{Actor, AuditAction, AuditService, NewAuditEntry};
use crate::collection::Record;
use crate::developer::DeveloperRepository;
use crate::shared::error::{PlatformError, Result};
use crate::storage::Storage;

/// Upper bound on retained versions, whatever the configuration asks for
pub const MAX_VERSIONS: usize = 5;

#[derive(Clone)]
pub struct VersionStore {
    storage: Storage,
    audit: AuditService,
    developers: DeveloperRepository,
    max_versions: usize,
}

impl VersionStore {
    pub fn new(storage: Storage, audit: AuditService, developers: DeveloperRepository, max_versions: usize) -> Self {
        Self {
            storage,
            audit,
            developers,
            max_versions: max_versions.clamp(1, MAX_VERSIONS),
        }
    }

    /// Retained versions, newest first
    pub async fn list(&self) -> Result<Vec<DatasetVersion>> {
        Ok(self.storage.load(DatasetVersion::COLLECTION, Vec::new()).await?)
    }

    pub async fn get(&self, id: &str) -> Result<Option<DatasetVersion>> {
        Ok(self.list().await?.into_iter().find(|v| v.id == id))
    }

    /// Prepend a version, evicting the oldest beyond the cap
    pub async fn add(&self, mut version: DatasetVersion, actor: &Actor) -> Result<DatasetVersion> {
        let loaded = self.storage.load_versioned::<DatasetVersion>(DatasetVersion::COLLECTION).await?;
        let mut versions = loaded.items;

        if versions.iter().any(|v| v.id == version.id) {
            return Err(PlatformError::duplicate(DatasetVersion::ENTITY_TYPE, "id", &version.id));
        }
        version.record_count = version.records.len();
        if version.uploaded_by.is_empty() {
            version.uploaded_by = actor.user_name.clone();
        }

        versions.insert(0, version.clone());
        let evicted = versions.len().saturating_sub(self.max_versions);
        versions.truncate(self.max_versions);

        self.storage
            .save_if(DatasetVersion::COLLECTION, &versions, loaded.revision)
            .await?;

        info!(version_id = %version.id, records = version.record_count, evicted, "Dataset version stored");
        self.audit
            .record(
                NewAuditEntry::new(actor, AuditAction::Upload, DatasetVersion::ENTITY_TYPE)
                    .entity_id(&version.id)
                    .details(format!("Uploaded {} with {} records", version.file_name, version.record_count)),
            )
            .await;
        Ok(version)
    }

    pub async fn delete(&self, id: &str, actor: &Actor) -> Result<DatasetVersion> {
        let loaded = self.storage.load_versioned::<DatasetVersion>(DatasetVersion::COLLECTION).await?;
        let mut versions = loaded.items;

        let index = versions
            .iter()
            .position(|v| v.id == id)
            .ok_or_else(|| PlatformError::not_found(DatasetVersion::ENTITY_TYPE, id))?;
        let removed = versions.remove(index);

        self.storage
            .save_if(DatasetVersion::COLLECTION, &versions, loaded.revision)
            .await?;

        self.audit
            .record(
                NewAuditEntry::new(actor, AuditAction::Delete, DatasetVersion::ENTITY_TYPE)
                    .entity_id(id)
                    .details(format!("Deleted {}", removed.file_name)),
            )
            .await;
        Ok(removed)
    }

    /// Replace the developers collection with the snapshot of version `id`
    pub async fn restore(&self, id: &str, actor: &Actor) -> Result<DatasetVersion> {
        let version = self
            .get(id)
            .await?
            .ok_or_else(|| PlatformError::not_found(DatasetVersion::ENTITY_TYPE, id))?;

        self.developers.save(&version.records).await?;

        info!(version_id = %id, records = version.record_count, "Dataset version restored");
        self.audit
            .record(
                NewAuditEntry::new(actor, AuditAction::Update, DatasetVersion::ENTITY_TYPE)
                    .entity_id(id)
                    .details(format!("Restored {} ({} records)", version.file_name, version.record_count)),
            )
            .await;
        Ok(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::developer::DeveloperRecord;

    fn store() -> VersionStore {
        let storage = Storage::in_memory();
        let audit = AuditService::new(storage.clone(), 100);
        let developers = DeveloperRepository::new(storage.clone(), audit.clone());
        VersionStore::new(storage, audit, developers, MAX_VERSIONS)
    }

    fn snapshot(n: usize) -> DatasetVersion {
        let records = (0..n)
            .map(|i| DeveloperRecord::new(format!("dev{}@x.io", i), "Dev", "P1", format!("0x{}", i)))
            .collect();
        DatasetVersion::new(format!("upload-{}.csv", n), "", records)
    }

    #[tokio::test]
    async fn test_sixth_version_evicts_oldest() {
        let store = store();
        let mut ids = Vec::new();
        for n in 1..=6 {
            ids.push(store.add(snapshot(n), &Actor::system()).await.unwrap().id);
        }

        let versions = store.list().await.unwrap();
        assert_eq!(versions.len(), 5);
        assert_eq!(versions[0].id, ids[5]);
        assert!(versions.iter().all(|v| v.id != ids[0]));
        assert!(store.get(&ids[0]).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_configured_cap_never_exceeds_five() {
        let storage = Storage::in_memory();
        let audit = AuditService::new(storage.clone(), 100);
        let developers = DeveloperRepository::new(storage.clone(), audit.clone());
        let store = VersionStore::new(storage, audit, developers, 10);
        for n in 1..=7 {
            store.add(snapshot(n), &Actor::system()).await.unwrap();
        }
        assert_eq!(store.list().await.unwrap().len(), MAX_VERSIONS);
    }

    #[tokio::test]
    async fn test_add_fills_metadata() {
        let store = store();
        let mut version = snapshot(3);
        version.record_count = 99;
        let stored = store.add(version, &Actor::new("a1", "Ana")).await.unwrap();
        assert_eq!(stored.record_count, 3);
        assert_eq!(stored.uploaded_by, "Ana");
    }

    #[tokio::test]
    async fn test_restore_replaces_developers() {
        let store = store();
        store
            .developers
            .save(&[DeveloperRecord::new("old@x.io", "Old", "P9", "0xold")])
            .await
            .unwrap();

        let version = store.add(snapshot(2), &Actor::system()).await.unwrap();
        store.restore(&version.id, &Actor::system()).await.unwrap();

        let developers = store.developers.get_all(None).await.unwrap();
        assert_eq!(developers, version.records);
    }

    #[tokio::test]
    async fn test_delete_and_missing() {
        let store = store();
        let version = store.add(snapshot(1), &Actor::system()).await.unwrap();
        store.delete(&version.id, &Actor::system()).await.unwrap();
        assert!(store.list().await.unwrap().is_empty());

        assert!(matches!(
            store.restore(&version.id, &Actor::system()).await,
            Err(PlatformError::NotFound { .. })
        ));
        assert!(matches!(
            store.delete(&version.id, &Actor::system()).await,
            Err(PlatformError::NotFound { .. })
        ));
    }
}
