//! Admin Repository

use chrono::Utc;
use tracing::warn;

use super::entity::{AdminStatus, AdminUser};
use crate::audit::{Actor, AuditAction, NewAuditEntry};
use crate::collection::{CollectionRepository, Record};
use crate::shared::error::{PlatformError, Result};
use crate::storage::StorageError;

const LOGIN_STAMP_ATTEMPTS: usize = 3;

pub type AdminRepository = CollectionRepository<AdminUser>;

impl CollectionRepository<AdminUser> {
    /// Case-insensitive email lookup
    pub async fn find_by_email(&self, email: &str) -> Result<Option<AdminUser>> {
        let email = email.trim();
        let admins = self.get_all(None).await?;
        Ok(admins.into_iter().find(|a| a.email.eq_ignore_ascii_case(email)))
    }

    /// Stamp `lastLoginAt` and record a `LOGIN` entry. A first login activates
    /// an invited admin.
    ///
    /// The stamp is bookkeeping: a write that keeps losing to concurrent
    /// writers is logged and the login still succeeds with `admin` as read.
    pub async fn record_login(&self, admin: &AdminUser) -> AdminUser {
        let stamped = self.stamp_login(&admin.id).await;
        let admin = match stamped {
            Ok(stamped) => stamped,
            Err(e) => {
                warn!(admin_id = %admin.id, error = %e, "Could not record last login");
                admin.clone()
            }
        };

        let actor = Actor::new(&admin.id, &admin.name);
        self.audit()
            .record(
                NewAuditEntry::new(&actor, AuditAction::Login, AdminUser::ENTITY_TYPE)
                    .entity_id(&admin.id)
                    .details(format!("Login as {}", admin.role.as_str())),
            )
            .await;
        admin
    }

    async fn stamp_login(&self, id: &str) -> Result<AdminUser> {
        let mut attempt = 1;
        loop {
            let result = self
                .modify_silently(id, |admin| {
                    admin.last_login_at = Some(Utc::now());
                    if admin.status == AdminStatus::Invited {
                        admin.status = AdminStatus::Active;
                    }
                    Ok(())
                })
                .await;

            match result {
                Err(PlatformError::Storage(StorageError::Conflict { .. })) if attempt < LOGIN_STAMP_ATTEMPTS => {
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admin::entity::AdminRole;
    use crate::audit::{AuditQuery, AuditService};
    use crate::storage::{CollectionKey, MemoryStore, Storage, StorageAdapter, StoredCollection};
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn repo() -> AdminRepository {
        let storage = Storage::in_memory();
        AdminRepository::new(storage.clone(), AuditService::new(storage, 100))
    }

    /// Memory store whose next revision-checked admin writes lose to another writer
    struct ContendedStore {
        inner: MemoryStore,
        conflicts: AtomicUsize,
    }

    #[async_trait]
    impl StorageAdapter for ContendedStore {
        fn name(&self) -> &'static str {
            "contended"
        }

        async fn read(&self, key: CollectionKey) -> std::result::Result<Option<StoredCollection>, StorageError> {
            self.inner.read(key).await
        }

        async fn write(
            &self,
            key: CollectionKey,
            documents: &[Value],
            expected_revision: Option<u64>,
        ) -> std::result::Result<u64, StorageError> {
            if key == CollectionKey::Admins && expected_revision.is_some() {
                let left = self.conflicts.load(Ordering::SeqCst);
                if left > 0 {
                    self.conflicts.store(left - 1, Ordering::SeqCst);
                    return Err(StorageError::Conflict {
                        key: key.to_string(),
                        expected: expected_revision.unwrap_or(0),
                        actual: expected_revision.unwrap_or(0) + 1,
                    });
                }
            }
            self.inner.write(key, documents, expected_revision).await
        }
    }

    fn contended() -> (AdminRepository, Arc<ContendedStore>) {
        let store = Arc::new(ContendedStore {
            inner: MemoryStore::new(),
            conflicts: AtomicUsize::new(0),
        });
        let storage = Storage::new(store.clone());
        (AdminRepository::new(storage.clone(), AuditService::new(storage, 100)), store)
    }

    #[tokio::test]
    async fn test_find_by_email_ignores_case() {
        let repo = repo();
        let admin = AdminUser::new("Ana@HQ.org", "Ana", AdminRole::SuperAdmin);
        repo.create(admin.clone(), &Actor::system()).await.unwrap();

        assert_eq!(repo.find_by_email("ana@hq.org").await.unwrap(), Some(admin));
        assert!(repo.find_by_email("ben@hq.org").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_record_login() {
        let repo = repo();
        let mut invited = AdminUser::new("ana@hq.org", "Ana", AdminRole::SuperAdmin);
        invited.status = AdminStatus::Invited;
        let admin = repo.create(invited, &Actor::system()).await.unwrap();

        let logged_in = repo.record_login(&admin).await;
        assert!(logged_in.last_login_at.is_some());
        assert_eq!(logged_in.status, AdminStatus::Active);

        let query = AuditQuery {
            user_id: Some(admin.id.clone()),
            action: Some(AuditAction::Login),
            ..Default::default()
        };
        assert_eq!(repo.audit().query(&query).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_record_login_retries_conflicts() {
        let (repo, store) = contended();
        let admin = repo
            .create(AdminUser::new("ana@hq.org", "Ana", AdminRole::SuperAdmin), &Actor::system())
            .await
            .unwrap();

        store.conflicts.store(1, Ordering::SeqCst);
        let logged_in = repo.record_login(&admin).await;
        assert!(logged_in.last_login_at.is_some());
        assert_eq!(repo.get_by_id(&admin.id).await.unwrap(), Some(logged_in));
    }

    #[tokio::test]
    async fn test_record_login_survives_persistent_conflict() {
        let (repo, store) = contended();
        let admin = repo
            .create(AdminUser::new("ana@hq.org", "Ana", AdminRole::SuperAdmin), &Actor::system())
            .await
            .unwrap();

        store.conflicts.store(LOGIN_STAMP_ATTEMPTS, Ordering::SeqCst);
        let logged_in = repo.record_login(&admin).await;
        assert_eq!(logged_in, admin);

        let query = AuditQuery {
            user_id: Some(admin.id.clone()),
            action: Some(AuditAction::Login),
            ..Default::default()
        };
        assert_eq!(repo.audit().query(&query).await.unwrap().len(), 1);
    }
}
