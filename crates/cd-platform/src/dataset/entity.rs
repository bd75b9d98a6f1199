//! Dataset Version Entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::collection::Record;
use crate::developer::DeveloperRecord;
use crate::storage::CollectionKey;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DatasetVersion {
    #[serde(default = "crate::shared::new_id")]
    pub id: String,
    pub file_name: String,
    #[serde(default)]
    pub uploaded_by: String,
    #[serde(default = "Utc::now")]
    pub uploaded_at: DateTime<Utc>,
    #[serde(default)]
    pub record_count: usize,
    #[serde(default)]
    pub records: Vec<DeveloperRecord>,
}

impl DatasetVersion {
    pub fn new(file_name: impl Into<String>, uploaded_by: impl Into<String>, records: Vec<DeveloperRecord>) -> Self {
        Self {
            id: crate::shared::new_id(),
            file_name: file_name.into(),
            uploaded_by: uploaded_by.into(),
            uploaded_at: Utc::now(),
            record_count: records.len(),
            records,
        }
    }
}

impl Record for DatasetVersion {
    const COLLECTION: CollectionKey = CollectionKey::Versions;
    const ENTITY_TYPE: &'static str = "DatasetVersion";

    fn id(&self) -> &str {
        &self.id
    }
}
