//! Outreach Campaign Entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::collection::Record;
use crate::storage::CollectionKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
pub enum CampaignStatus {
    #[default]
    Draft,
    Sending,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OutreachCampaign {
    #[serde(default = "crate::shared::new_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub subject: String,
    /// Unset for campaigns addressed to every partner
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partner_code: Option<String>,
    #[serde(default)]
    pub audience_size: u32,
    #[serde(default)]
    pub sent_count: u32,
    #[serde(default)]
    pub status: CampaignStatus,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub sent_at: Option<DateTime<Utc>>,
}

impl Record for OutreachCampaign {
    const COLLECTION: CollectionKey = CollectionKey::Campaigns;
    const ENTITY_TYPE: &'static str = "Campaign";

    fn id(&self) -> &str {
        &self.id
    }

    fn partner_code(&self) -> Option<&str> {
        self.partner_code.as_deref()
    }
}
