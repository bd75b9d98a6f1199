//! Per-entity access rules applied by the gateway

use serde_json::{Map, Value};

use crate::admin::AdminUser;
use crate::agreement::CommunityAgreement;
use crate::auth::{AuthContext, PasswordService};
use crate::campaign::OutreachCampaign;
use crate::collection::Record;
use crate::developer::DeveloperRecord;
use crate::event::CommunityEvent;
use crate::invoice::Invoice;
use crate::registry::CommunityMasterRecord;
use crate::shared::error::{PlatformError, Result};

/// How the gateway scopes reads and writes of a record type.
///
/// The defaults key off the record's partner code: records with a code are
/// visible and writable inside the caller's scope, records without one are
/// visible to everyone and writable by Super Admins only.
pub trait ScopedRecord: Record {
    fn visible_to(&self, auth: &AuthContext) -> bool {
        self.partner_code().map_or(true, |code| auth.can_access(code))
    }

    fn check_write(&self, auth: &AuthContext) -> Result<()> {
        match self.partner_code() {
            Some(code) => auth.require_access(code),
            None => auth.require_super_admin(),
        }
    }

    /// Rewrite incoming fields before they are deserialized
    fn prepare_fields(_fields: &mut Map<String, Value>, _passwords: &PasswordService) -> Result<()> {
        Ok(())
    }

    /// Keep server-held values the client never sees when a record is replaced
    fn carry_over(&mut self, _previous: &Self) {}

    fn to_response(&self) -> Result<Value> {
        serde_json::to_value(self).map_err(|e| PlatformError::internal(e.to_string()))
    }
}

impl ScopedRecord for DeveloperRecord {}
impl ScopedRecord for Invoice {}
impl ScopedRecord for CommunityAgreement {}
impl ScopedRecord for CommunityEvent {}
impl ScopedRecord for OutreachCampaign {}

impl ScopedRecord for CommunityMasterRecord {
    fn visible_to(&self, _auth: &AuthContext) -> bool {
        true
    }

    fn check_write(&self, auth: &AuthContext) -> Result<()> {
        auth.require_super_admin()
    }
}

impl ScopedRecord for AdminUser {
    fn visible_to(&self, auth: &AuthContext) -> bool {
        auth.is_super_admin() || self.id == auth.admin_id
    }

    fn check_write(&self, auth: &AuthContext) -> Result<()> {
        auth.require_super_admin()
    }

    /// Clients send `password`; only its hash is stored
    fn prepare_fields(fields: &mut Map<String, Value>, passwords: &PasswordService) -> Result<()> {
        fields.remove("passwordHash");
        match fields.remove("password") {
            Some(Value::String(password)) => {
                let hash = passwords.hash_password(&password)?;
                fields.insert("passwordHash".to_string(), Value::String(hash));
                Ok(())
            }
            Some(_) => Err(PlatformError::bad_request("password must be a string")),
            None => Ok(()),
        }
    }

    fn carry_over(&mut self, previous: &Self) {
        if self.password_hash.is_none() {
            self.password_hash = previous.password_hash.clone();
        }
    }

    fn to_response(&self) -> Result<Value> {
        serde_json::to_value(self.redacted()).map_err(|e| PlatformError::internal(e.to_string()))
    }
}
