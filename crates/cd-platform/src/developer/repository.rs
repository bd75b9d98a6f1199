//! Developer Repository

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;
use utoipa::ToSchema;

use super::entity::DeveloperRecord;
use crate::audit::{Actor, AuditAction, NewAuditEntry};
use crate::collection::{CollectionRepository, Record};
use crate::shared::error::Result;

pub type DeveloperRepository = CollectionRepository<DeveloperRecord>;

/// Wallet shared by more than one developer
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateWallet {
    pub wallet_address: String,
    pub developer_ids: Vec<String>,
}

fn duplicate_wallets(developers: &[DeveloperRecord]) -> Vec<DuplicateWallet> {
    let mut by_wallet: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for dev in developers {
        if let Some(wallet) = dev.wallet_key() {
            by_wallet.entry(wallet).or_default().push(dev.id.clone());
        }
    }

    by_wallet
        .into_iter()
        .filter(|(_, ids)| ids.len() > 1)
        .map(|(wallet_address, developer_ids)| DuplicateWallet {
            wallet_address,
            developer_ids,
        })
        .collect()
}

impl CollectionRepository<DeveloperRecord> {
    /// Wallets used by more than one developer, across all partners
    pub async fn find_duplicate_wallets(&self) -> Result<Vec<DuplicateWallet>> {
        let developers = self.get_all(None).await?;
        Ok(duplicate_wallets(&developers))
    }

    /// Recompute `sybilFlagged` for every developer. Returns how many are flagged.
    pub async fn flag_sybils(&self, actor: &Actor) -> Result<usize> {
        let loaded = self.storage().load_versioned::<DeveloperRecord>(DeveloperRecord::COLLECTION).await?;
        let mut developers = loaded.items;

        let duplicates = duplicate_wallets(&developers);
        let flagged_ids: Vec<&String> = duplicates.iter().flat_map(|d| d.developer_ids.iter()).collect();

        let mut changed = 0;
        for dev in developers.iter_mut() {
            let flag = flagged_ids.contains(&&dev.id);
            if dev.sybil_flagged != flag {
                dev.sybil_flagged = flag;
                dev.touch();
                changed += 1;
            }
        }
        let flagged = developers.iter().filter(|d| d.sybil_flagged).count();

        if changed > 0 {
            self.storage()
                .save_if(DeveloperRecord::COLLECTION, &developers, loaded.revision)
                .await?;
        }

        info!(flagged, changed, "Sybil flags recomputed");
        self.audit()
            .record(
                NewAuditEntry::new(actor, AuditAction::Update, DeveloperRecord::ENTITY_TYPE)
                    .details(format!("Sybil scan: {} flagged, {} changed", flagged, changed)),
            )
            .await;
        Ok(flagged)
    }

    /// `Pass` developers of `partner_code` certified within `from..=to`
    pub async fn passed_in_period(
        &self,
        partner_code: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<DeveloperRecord>> {
        let developers = self.get_all(Some(partner_code)).await?;
        Ok(developers
            .into_iter()
            .filter(|d| d.certified_at().is_some_and(|at| at >= from && at <= to))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditService;
    use crate::developer::entity::Grade;
    use crate::storage::Storage;
    use chrono::Duration;

    fn repo() -> DeveloperRepository {
        let storage = Storage::in_memory();
        DeveloperRepository::new(storage.clone(), AuditService::new(storage, 100))
    }

    fn actor() -> Actor {
        Actor::new("admin-1", "Ana")
    }

    #[tokio::test]
    async fn test_create_flags_duplicate_wallet() {
        let repo = repo();
        let first = repo
            .create(DeveloperRecord::new("a@x.io", "A", "P1", "0xAAA"), &actor())
            .await
            .unwrap();
        let second = repo
            .create(DeveloperRecord::new("b@x.io", "B", "P2", "0xaaa"), &actor())
            .await
            .unwrap();

        assert!(!first.sybil_flagged);
        assert!(second.sybil_flagged);

        let duplicates = repo.find_duplicate_wallets().await.unwrap();
        assert_eq!(duplicates.len(), 1);
        assert_eq!(duplicates[0].wallet_address, "0xaaa");
        assert_eq!(duplicates[0].developer_ids, vec![first.id, second.id]);
    }

    #[tokio::test]
    async fn test_flag_sybils_marks_all_holders() {
        let repo = repo();
        let a = DeveloperRecord::new("a@x.io", "A", "P1", "0xAAA");
        let b = DeveloperRecord::new("b@x.io", "B", "P1", "0xaaa");
        let mut c = DeveloperRecord::new("c@x.io", "C", "P1", "0xccc");
        c.sybil_flagged = true;
        repo.save(&[a, b, c.clone()]).await.unwrap();

        let flagged = repo.flag_sybils(&actor()).await.unwrap();
        assert_eq!(flagged, 2);

        let c_after = repo.get_by_id(&c.id).await.unwrap().unwrap();
        assert!(!c_after.sybil_flagged);
    }

    #[tokio::test]
    async fn test_passed_in_period() {
        let repo = repo();
        let now = Utc::now();
        let passed = DeveloperRecord::new("a@x.io", "A", "P1", "0x1").with_grade(Grade::Pass);
        let failed = DeveloperRecord::new("b@x.io", "B", "P1", "0x2").with_grade(Grade::Fail);
        let other = DeveloperRecord::new("c@x.io", "C", "P2", "0x3").with_grade(Grade::Pass);
        repo.save(&[passed.clone(), failed, other]).await.unwrap();

        let result = repo
            .passed_in_period("P1", now - Duration::days(1), now + Duration::days(1))
            .await
            .unwrap();
        assert_eq!(result, vec![passed]);

        let earlier = repo
            .passed_in_period("P1", now - Duration::days(30), now - Duration::days(10))
            .await
            .unwrap();
        assert!(earlier.is_empty());
    }

    #[tokio::test]
    async fn test_later_edits_do_not_move_pass_into_new_period() {
        let repo = repo();
        let now = Utc::now();
        let mut veteran = DeveloperRecord::new("a@x.io", "A", "P1", "0xAAA").with_grade(Grade::Pass);
        veteran.created_at = now - Duration::days(90);
        veteran.passed_at = Some(now - Duration::days(60));
        let twin = DeveloperRecord::new("b@x.io", "B", "P2", "0xaaa");
        repo.save(&[veteran.clone(), twin]).await.unwrap();

        repo.flag_sybils(&actor()).await.unwrap();
        let mut fields = serde_json::Map::new();
        fields.insert("score".to_string(), serde_json::json!(91));
        repo.update(&veteran.id, &fields, &actor()).await.unwrap();

        let stored = repo.get_by_id(&veteran.id).await.unwrap().unwrap();
        assert!(stored.sybil_flagged);
        assert_eq!(stored.passed_at, veteran.passed_at);

        let recent = repo
            .passed_in_period("P1", now - Duration::days(7), now + Duration::days(1))
            .await
            .unwrap();
        assert!(recent.is_empty());

        let at_pass = repo
            .passed_in_period("P1", now - Duration::days(61), now - Duration::days(59))
            .await
            .unwrap();
        assert_eq!(at_pass.len(), 1);
    }
}
