//! Entity types reachable through the gateway

use std::fmt;
use std::str::FromStr;

use crate::shared::error::PlatformError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityType {
    Developers,
    Invoices,
    Agreements,
    Events,
    Campaigns,
    Admins,
    Registry,
    Versions,
}

impl EntityType {
    pub const ALL: [EntityType; 8] = [
        EntityType::Developers,
        EntityType::Invoices,
        EntityType::Agreements,
        EntityType::Events,
        EntityType::Campaigns,
        EntityType::Admins,
        EntityType::Registry,
        EntityType::Versions,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Developers => "developers",
            EntityType::Invoices => "invoices",
            EntityType::Agreements => "agreements",
            EntityType::Events => "events",
            EntityType::Campaigns => "campaigns",
            EntityType::Admins => "admins",
            EntityType::Registry => "registry",
            EntityType::Versions => "versions",
        }
    }

    /// Hard deletion is limited to invoices and dataset versions
    pub fn allows_delete(&self) -> bool {
        matches!(self, EntityType::Invoices | EntityType::Versions)
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| PlatformError::bad_request(format!("Unknown entity type: '{}'", s)))
    }
}
