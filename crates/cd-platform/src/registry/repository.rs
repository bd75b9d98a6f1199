//! Registry Repository

use super::entity::CommunityMasterRecord;
use crate::collection::{CollectionRepository, Record};
use crate::shared::error::Result;
use crate::storage::{Storage, StorageError};

pub type RegistryRepository = CollectionRepository<CommunityMasterRecord>;

/// Whether `code` has an active registry entry
pub async fn is_registered(storage: &Storage, code: &str) -> std::result::Result<bool, StorageError> {
    let entries: Vec<CommunityMasterRecord> = storage.load(CommunityMasterRecord::COLLECTION, Vec::new()).await?;
    Ok(entries.iter().any(|e| e.is_active && e.partner_code == code))
}

impl CollectionRepository<CommunityMasterRecord> {
    pub async fn is_official(&self, code: &str) -> Result<bool> {
        Ok(is_registered(self.storage(), code).await?)
    }

    pub async fn find_by_partner_code(&self, code: &str) -> Result<Option<CommunityMasterRecord>> {
        let entries = self.get_all(Some(code)).await?;
        Ok(entries.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{Actor, AuditService};

    #[tokio::test]
    async fn test_is_official() {
        let storage = Storage::in_memory();
        let repo = RegistryRepository::new(storage.clone(), AuditService::new(storage, 100));

        let mut retired = CommunityMasterRecord::new("OLD", "Retired Guild", "EU");
        retired.is_active = false;
        repo.save(&[CommunityMasterRecord::new("P1", "Lagos Builders", "Africa"), retired])
            .await
            .unwrap();

        assert!(repo.is_official("P1").await.unwrap());
        assert!(!repo.is_official("OLD").await.unwrap());
        assert!(!repo.is_official("P9").await.unwrap());
    }

    #[tokio::test]
    async fn test_find_by_partner_code() {
        let storage = Storage::in_memory();
        let repo = RegistryRepository::new(storage.clone(), AuditService::new(storage, 100));
        let entry = repo
            .create(CommunityMasterRecord::new("P1", "Lagos Builders", "Africa"), &Actor::system())
            .await
            .unwrap();

        assert_eq!(repo.find_by_partner_code("P1").await.unwrap(), Some(entry));
        assert!(repo.find_by_partner_code("P2").await.unwrap().is_none());
    }
}
