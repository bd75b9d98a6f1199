//! Community Master Record Entity

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::collection::Record;
use crate::storage::CollectionKey;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommunityMasterRecord {
    #[serde(default = "crate::shared::new_id")]
    pub id: String,
    pub partner_code: String,
    pub community_name: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub country: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl CommunityMasterRecord {
    pub fn new(partner_code: impl Into<String>, community_name: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            id: crate::shared::new_id(),
            partner_code: partner_code.into(),
            community_name: community_name.into(),
            region: region.into(),
            country: String::new(),
            is_active: true,
        }
    }
}

// The registry defines partner codes rather than belonging to one, so it is not tenant scoped
impl Record for CommunityMasterRecord {
    const COLLECTION: CollectionKey = CollectionKey::Registry;
    const ENTITY_TYPE: &'static str = "Registry";

    fn id(&self) -> &str {
        &self.id
    }

    fn partner_code(&self) -> Option<&str> {
        Some(&self.partner_code)
    }
}
