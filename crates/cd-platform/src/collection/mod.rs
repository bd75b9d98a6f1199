//! Collection Repository
//!
//! One generic repository instantiated per entity. A collection is always
//! read and written as a whole; single-record writes carry the revision they
//! read so a concurrent writer surfaces as a `Conflict` instead of a lost
//! update.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use std::marker::PhantomData;
use tracing::{debug, warn};

use crate::audit::{Actor, AuditAction, AuditService, NewAuditEntry};
use crate::registry;
use crate::shared::error::{PlatformError, Result};
use crate::storage::{CollectionKey, Storage};

/// A persisted entity
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const COLLECTION: CollectionKey;

    /// Name used in audit entries and error messages
    const ENTITY_TYPE: &'static str;

    /// Entities owned by exactly one partner code
    const TENANT_SCOPED: bool = false;

    fn id(&self) -> &str;

    fn partner_code(&self) -> Option<&str> {
        None
    }

    /// Refresh modification timestamps before a write
    fn touch(&mut self) {}

    /// Adjust a new record against the current collection before it is inserted
    fn before_insert(&mut self, _existing: &[Self]) -> Result<()> {
        Ok(())
    }

    /// Check and adjust a changed record against the stored version it replaces
    fn before_replace(&mut self, _previous: &Self) -> Result<()> {
        Ok(())
    }
}

pub struct CollectionRepository<T: Record> {
    storage: Storage,
    audit: AuditService,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Record> Clone for CollectionRepository<T> {
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.clone(),
            audit: self.audit.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: Record> CollectionRepository<T> {
    pub fn new(storage: Storage, audit: AuditService) -> Self {
        Self {
            storage,
            audit,
            _marker: PhantomData,
        }
    }

    pub(crate) fn storage(&self) -> &Storage {
        &self.storage
    }

    pub(crate) fn audit(&self) -> &AuditService {
        &self.audit
    }

    /// All records, or only those owned by `partner_code`
    pub async fn get_all(&self, partner_code: Option<&str>) -> Result<Vec<T>> {
        let items: Vec<T> = self.storage.load(T::COLLECTION, Vec::new()).await?;
        Ok(match partner_code {
            Some(code) => items.into_iter().filter(|r| r.partner_code() == Some(code)).collect(),
            None => items,
        })
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Option<T>> {
        let items: Vec<T> = self.storage.load(T::COLLECTION, Vec::new()).await?;
        Ok(items.into_iter().find(|r| r.id() == id))
    }

    /// Insert a new record. Fails with `Duplicate` if the id is taken.
    pub async fn create(&self, mut entity: T, actor: &Actor) -> Result<T> {
        let loaded = self.storage.load_versioned::<T>(T::COLLECTION).await?;
        let mut items = loaded.items;

        if items.iter().any(|r| r.id() == entity.id()) {
            return Err(PlatformError::duplicate(T::ENTITY_TYPE, "id", entity.id()));
        }

        entity.before_insert(&items)?;
        self.check_registry(&entity).await;

        items.push(entity.clone());
        self.storage.save_if(T::COLLECTION, &items, loaded.revision).await?;

        debug!(entity_type = T::ENTITY_TYPE, id = %entity.id(), "Record created");
        self.record_audit(actor, AuditAction::Create, &entity, "Created").await;
        Ok(entity)
    }

    /// Merge top-level `fields` into the stored record. The id never changes.
    pub async fn update(&self, id: &str, fields: &Map<String, Value>, actor: &Actor) -> Result<T> {
        self.update_guarded(id, fields, actor, |_, _| Ok(())).await
    }

    /// Like [`update`](Self::update), but `guard` sees the record before and
    /// after the merge and can veto the write
    pub async fn update_guarded<G>(&self, id: &str, fields: &Map<String, Value>, actor: &Actor, guard: G) -> Result<T>
    where
        G: FnOnce(&T, &T) -> Result<()>,
    {
        let changed: Vec<&str> = fields.keys().filter(|k| k.as_str() != "id").map(String::as_str).collect();
        let details = format!("Updated fields: {}", changed.join(", "));

        let updated = self
            .apply(id, |current| {
                let before = current.clone();
                let mut doc = serde_json::to_value(&*current).map_err(|e| PlatformError::internal(e.to_string()))?;
                if let Value::Object(target) = &mut doc {
                    for (key, value) in fields.iter().filter(|(k, _)| k.as_str() != "id") {
                        target.insert(key.clone(), value.clone());
                    }
                }
                *current = serde_json::from_value(doc)
                    .map_err(|e| PlatformError::bad_request(format!("Invalid {} fields: {}", T::ENTITY_TYPE, e)))?;
                guard(&before, current)
            })
            .await?;

        self.check_registry(&updated).await;
        self.record_audit(actor, AuditAction::Update, &updated, &details).await;
        Ok(updated)
    }

    /// Apply `change` to one record and audit it as an update
    pub async fn modify<F>(&self, id: &str, change: F, actor: &Actor, details: &str) -> Result<T>
    where
        F: FnOnce(&mut T) -> Result<()>,
    {
        let updated = self.apply(id, change).await?;
        self.record_audit(actor, AuditAction::Update, &updated, details).await;
        Ok(updated)
    }

    /// Apply `change` to one record without an audit entry
    pub(crate) async fn modify_silently<F>(&self, id: &str, change: F) -> Result<T>
    where
        F: FnOnce(&mut T) -> Result<()>,
    {
        self.apply(id, change).await
    }

    async fn apply<F>(&self, id: &str, change: F) -> Result<T>
    where
        F: FnOnce(&mut T) -> Result<()>,
    {
        let loaded = self.storage.load_versioned::<T>(T::COLLECTION).await?;
        let mut items = loaded.items;

        let record = items
            .iter_mut()
            .find(|r| r.id() == id)
            .ok_or_else(|| PlatformError::not_found(T::ENTITY_TYPE, id))?;

        let previous = record.clone();
        change(record)?;
        record.before_replace(&previous)?;
        record.touch();
        let updated = record.clone();

        self.storage.save_if(T::COLLECTION, &items, loaded.revision).await?;
        Ok(updated)
    }

    /// Replace the record with the same id, or insert it
    pub async fn upsert(&self, mut entity: T, actor: &Actor) -> Result<T> {
        let loaded = self.storage.load_versioned::<T>(T::COLLECTION).await?;
        let mut items = loaded.items;

        let action = match items.iter().position(|r| r.id() == entity.id()) {
            Some(index) => {
                entity.before_replace(&items[index])?;
                entity.touch();
                items[index] = entity.clone();
                AuditAction::Update
            }
            None => {
                entity.before_insert(&items)?;
                items.push(entity.clone());
                AuditAction::Create
            }
        };

        self.check_registry(&entity).await;
        self.storage.save_if(T::COLLECTION, &items, loaded.revision).await?;

        let details = if action == AuditAction::Create { "Created" } else { "Replaced" };
        self.record_audit(actor, action, &entity, details).await;
        Ok(entity)
    }

    /// Hard delete
    pub async fn delete(&self, id: &str, actor: &Actor) -> Result<T> {
        let loaded = self.storage.load_versioned::<T>(T::COLLECTION).await?;
        let mut items = loaded.items;

        let index = items
            .iter()
            .position(|r| r.id() == id)
            .ok_or_else(|| PlatformError::not_found(T::ENTITY_TYPE, id))?;
        let removed = items.remove(index);

        self.storage.save_if(T::COLLECTION, &items, loaded.revision).await?;
        self.record_audit(actor, AuditAction::Delete, &removed, "Deleted").await;
        Ok(removed)
    }

    /// Replace the whole collection (last write wins)
    pub async fn save(&self, items: &[T]) -> Result<()> {
        self.storage.save(T::COLLECTION, items).await?;
        Ok(())
    }

    /// Bulk replace on behalf of `actor`, audited as one entry
    pub async fn replace_all(&self, items: &[T], actor: &Actor) -> Result<()> {
        self.save(items).await?;
        self.audit
            .record(
                NewAuditEntry::new(actor, AuditAction::Update, T::ENTITY_TYPE)
                    .details(format!("Replaced collection with {} records", items.len())),
            )
            .await;
        Ok(())
    }

    async fn record_audit(&self, actor: &Actor, action: AuditAction, entity: &T, details: &str) {
        self.audit
            .record(
                NewAuditEntry::new(actor, action, T::ENTITY_TYPE)
                    .entity_id(entity.id())
                    .partner_code(entity.partner_code())
                    .details(details),
            )
            .await;
    }

    async fn check_registry(&self, entity: &T) {
        if !T::TENANT_SCOPED {
            return;
        }
        let Some(code) = entity.partner_code() else {
            return;
        };
        match registry::is_registered(&self.storage, code).await {
            Ok(true) => {}
            Ok(false) => warn!(
                entity_type = T::ENTITY_TYPE,
                id = %entity.id(),
                partner_code = %code,
                "Partner code is not in the registry"
            ),
            Err(e) => warn!(error = %e, "Registry lookup failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditQuery;
    use crate::storage::{MemoryStore, StorageAdapter, StorageError};
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::Arc;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Note {
        id: String,
        partner_code: String,
        text: String,
        #[serde(default)]
        edits: u32,
    }

    impl Record for Note {
        const COLLECTION: CollectionKey = CollectionKey::Events;
        const ENTITY_TYPE: &'static str = "Note";
        const TENANT_SCOPED: bool = true;

        fn id(&self) -> &str {
            &self.id
        }

        fn partner_code(&self) -> Option<&str> {
            Some(&self.partner_code)
        }

        fn touch(&mut self) {
            self.edits += 1;
        }
    }

    fn note(id: &str, code: &str) -> Note {
        Note {
            id: id.to_string(),
            partner_code: code.to_string(),
            text: "hello".to_string(),
            edits: 0,
        }
    }

    fn repo_on(storage: Storage) -> CollectionRepository<Note> {
        let audit = AuditService::new(storage.clone(), 100);
        CollectionRepository::new(storage, audit)
    }

    fn actor() -> Actor {
        Actor::new("admin-1", "Ana")
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let repo = repo_on(Storage::in_memory());
        let created = repo.create(note("n1", "P1"), &actor()).await.unwrap();

        assert_eq!(repo.get_by_id("n1").await.unwrap(), Some(created.clone()));
        assert_eq!(repo.get_all(Some("P1")).await.unwrap(), vec![created]);
        assert!(repo.get_all(Some("P2")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_id() {
        let repo = repo_on(Storage::in_memory());
        repo.create(note("n1", "P1"), &actor()).await.unwrap();

        let result = repo.create(note("n1", "P2"), &actor()).await;
        assert!(matches!(result, Err(PlatformError::Duplicate { .. })));
        assert_eq!(repo.get_all(None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_audits_with_partner_code() {
        let repo = repo_on(Storage::in_memory());
        repo.create(note("n1", "P1"), &actor()).await.unwrap();

        let entries = repo.audit().query(&AuditQuery::default()).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, AuditAction::Create);
        assert_eq!(entries[0].entity_id, "n1");
        assert_eq!(entries[0].partner_code.as_deref(), Some("P1"));
        assert_eq!(entries[0].user_id, "admin-1");
    }

    #[tokio::test]
    async fn test_update_merges_fields_and_keeps_id() {
        let repo = repo_on(Storage::in_memory());
        repo.create(note("n1", "P1"), &actor()).await.unwrap();

        let fields = json!({"id": "other", "text": "changed"});
        let updated = repo.update("n1", fields.as_object().unwrap(), &actor()).await.unwrap();

        assert_eq!(updated.id, "n1");
        assert_eq!(updated.text, "changed");
        assert_eq!(updated.partner_code, "P1");
        assert_eq!(updated.edits, 1);
        assert!(repo.get_by_id("other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let repo = repo_on(Storage::in_memory());
        let fields = json!({"text": "x"});
        let result = repo.update("missing", fields.as_object().unwrap(), &actor()).await;
        assert!(matches!(result, Err(PlatformError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_update_with_wrong_type_is_bad_request() {
        let repo = repo_on(Storage::in_memory());
        repo.create(note("n1", "P1"), &actor()).await.unwrap();

        let fields = json!({"edits": "many"});
        let result = repo.update("n1", fields.as_object().unwrap(), &actor()).await;
        assert!(matches!(result, Err(PlatformError::BadRequest { .. })));
    }

    #[tokio::test]
    async fn test_update_guard_can_veto() {
        let repo = repo_on(Storage::in_memory());
        repo.create(note("n1", "P1"), &actor()).await.unwrap();

        let fields = json!({"partnerCode": "P2"});
        let result = repo
            .update_guarded("n1", fields.as_object().unwrap(), &actor(), |before, after| {
                assert_eq!(before.partner_code, "P1");
                if after.partner_code == "P2" {
                    Err(PlatformError::forbidden("P2"))
                } else {
                    Ok(())
                }
            })
            .await;

        assert!(matches!(result, Err(PlatformError::Forbidden { .. })));
        assert_eq!(repo.get_by_id("n1").await.unwrap().unwrap().partner_code, "P1");
    }

    #[tokio::test]
    async fn test_upsert_inserts_then_replaces() {
        let repo = repo_on(Storage::in_memory());
        repo.upsert(note("n1", "P1"), &actor()).await.unwrap();

        let mut replacement = note("n1", "P1");
        replacement.text = "second".to_string();
        repo.upsert(replacement, &actor()).await.unwrap();

        let all = repo.get_all(None).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].text, "second");

        let actions: Vec<AuditAction> = repo
            .audit()
            .query(&AuditQuery::default())
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.action)
            .collect();
        assert_eq!(actions, vec![AuditAction::Update, AuditAction::Create]);
    }

    #[tokio::test]
    async fn test_delete() {
        let repo = repo_on(Storage::in_memory());
        repo.create(note("n1", "P1"), &actor()).await.unwrap();
        repo.create(note("n2", "P1"), &actor()).await.unwrap();

        repo.delete("n1", &actor()).await.unwrap();
        let ids: Vec<String> = repo.get_all(None).await.unwrap().into_iter().map(|n| n.id).collect();
        assert_eq!(ids, vec!["n2"]);

        assert!(matches!(
            repo.delete("n1", &actor()).await,
            Err(PlatformError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_save_round_trip() {
        let repo = repo_on(Storage::in_memory());
        repo.save(&[]).await.unwrap();
        assert!(repo.get_all(None).await.unwrap().is_empty());

        let notes = vec![note("a", "P1"), note("b", "P2")];
        repo.save(&notes).await.unwrap();
        assert_eq!(repo.get_all(None).await.unwrap(), notes);
    }

    #[tokio::test]
    async fn test_quota_failure_propagates() {
        let storage = Storage::new(Arc::new(MemoryStore::with_quota(16)));
        let repo = repo_on(storage);

        let result = repo.create(note("n1", "P1"), &actor()).await;
        assert!(matches!(
            result,
            Err(PlatformError::Storage(StorageError::QuotaExceeded { .. }))
        ));
    }

    #[tokio::test]
    async fn test_stale_writer_gets_conflict() {
        let storage = Storage::in_memory();
        let repo = repo_on(storage.clone());
        repo.create(note("n1", "P1"), &actor()).await.unwrap();

        let stale = storage.load_versioned::<Note>(CollectionKey::Events).await.unwrap();
        repo.create(note("n2", "P1"), &actor()).await.unwrap();

        let result = storage.save_if(CollectionKey::Events, &stale.items, stale.revision).await;
        assert!(matches!(result, Err(StorageError::Conflict { .. })));
        assert_eq!(repo.get_all(None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unreadable_collection_is_not_overwritten() {
        let store = Arc::new(MemoryStore::new());
        store.put_raw(CollectionKey::Events, r#"[{"id": 7}]"#);
        let storage = Storage::new(store.clone());
        let repo = repo_on(storage.clone());

        assert!(repo.get_all(None).await.unwrap().is_empty());
        let result = repo.create(note("n1", "P1"), &actor()).await;
        assert!(matches!(result, Err(PlatformError::Storage(StorageError::Corrupt { .. }))));

        let raw = store.read(CollectionKey::Events).await.unwrap().unwrap();
        assert_eq!(raw.documents, vec![json!({"id": 7})]);
    }
}
