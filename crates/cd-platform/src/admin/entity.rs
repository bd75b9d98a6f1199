//! Admin User Entity
//!
//! Dashboard operators. The role decides the partner scope: Super Admins see
//! every partner, everyone else only their assigned codes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::collection::Record;
use crate::storage::CollectionKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum AdminRole {
    #[serde(rename = "Super Admin (HQ)")]
    SuperAdmin,
    #[serde(rename = "Regional Admin (Cluster)")]
    RegionalAdmin,
    #[serde(rename = "Community Admin (Local)")]
    CommunityAdmin,
}

impl AdminRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdminRole::SuperAdmin => "Super Admin (HQ)",
            AdminRole::RegionalAdmin => "Regional Admin (Cluster)",
            AdminRole::CommunityAdmin => "Community Admin (Local)",
        }
    }

    pub fn is_super_admin(&self) -> bool {
        matches!(self, AdminRole::SuperAdmin)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
pub enum AdminStatus {
    #[default]
    Active,
    Invited,
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminUser {
    #[serde(default = "crate::shared::new_id")]
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: String,
    pub role: AdminRole,
    #[serde(default)]
    pub assigned_partner_codes: Vec<String>,
    #[serde(default)]
    pub status: AdminStatus,
    /// Argon2id PHC string; stripped by [`AdminUser::redacted`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    #[serde(default)]
    pub last_login_at: Option<DateTime<Utc>>,
}

impl AdminUser {
    pub fn new(email: impl Into<String>, name: impl Into<String>, role: AdminRole) -> Self {
        Self {
            id: crate::shared::new_id(),
            email: email.into(),
            name: name.into(),
            role,
            assigned_partner_codes: Vec::new(),
            status: AdminStatus::Active,
            password_hash: None,
            last_login_at: None,
        }
    }

    pub fn with_partner_codes(mut self, codes: &[&str]) -> Self {
        self.assigned_partner_codes = codes.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn with_password_hash(mut self, hash: impl Into<String>) -> Self {
        self.password_hash = Some(hash.into());
        self
    }

    pub fn is_active(&self) -> bool {
        self.status != AdminStatus::Disabled
    }

    /// Copy safe to hand to clients
    pub fn redacted(&self) -> Self {
        Self {
            password_hash: None,
            ..self.clone()
        }
    }
}

impl Record for AdminUser {
    const COLLECTION: CollectionKey = CollectionKey::Admins;
    const ENTITY_TYPE: &'static str = "AdminUser";

    fn id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_role_wire_names() {
        let admin: AdminUser = serde_json::from_value(json!({
            "email": "r@hq.org",
            "role": "Regional Admin (Cluster)",
            "assignedPartnerCodes": ["P1", "P2"]
        }))
        .unwrap();
        assert_eq!(admin.role, AdminRole::RegionalAdmin);
        assert_eq!(admin.status, AdminStatus::Active);
        assert_eq!(serde_json::to_value(AdminRole::SuperAdmin).unwrap(), json!("Super Admin (HQ)"));
    }

    #[test]
    fn test_redacted_drops_hash() {
        let admin = AdminUser::new("a@hq.org", "Ana", AdminRole::SuperAdmin).with_password_hash("$argon2id$v=19$...");
        let value = serde_json::to_value(admin.redacted()).unwrap();
        assert!(value.get("passwordHash").is_none());
        assert_eq!(value["email"], json!("a@hq.org"));
    }
}
