//! Community Event Entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::collection::Record;
use crate::storage::CollectionKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
pub enum EventFormat {
    #[default]
    Online,
    #[serde(rename = "In-Person")]
    InPerson,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommunityEvent {
    #[serde(default = "crate::shared::new_id")]
    pub id: String,
    pub partner_code: String,
    pub title: String,
    pub starts_at: DateTime<Utc>,
    #[serde(default)]
    pub ends_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub format: EventFormat,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub invited_count: u32,
    #[serde(default)]
    pub rsvp_count: u32,
    #[serde(default)]
    pub checked_in_count: u32,
}

impl CommunityEvent {
    /// Checked-in attendees as a share of RSVPs, 0 when nobody replied
    pub fn turnout(&self) -> f64 {
        if self.rsvp_count == 0 {
            0.0
        } else {
            f64::from(self.checked_in_count) / f64::from(self.rsvp_count)
        }
    }
}

impl Record for CommunityEvent {
    const COLLECTION: CollectionKey = CollectionKey::Events;
    const ENTITY_TYPE: &'static str = "Event";
    const TENANT_SCOPED: bool = true;

    fn id(&self) -> &str {
        &self.id
    }

    fn partner_code(&self) -> Option<&str> {
        Some(&self.partner_code)
    }
}
