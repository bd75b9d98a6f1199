//! Access Control
//!
//! Super Admins reach every partner code. Regional and community admins reach
//! only their assigned codes. Disabled or unknown admins reach nothing.

use std::collections::BTreeSet;
use tracing::debug;

use super::auth_service::AccessTokenClaims;
use crate::admin::{AdminRepository, AdminRole, AdminUser};
use crate::audit::Actor;
use crate::shared::error::{PlatformError, Result};

/// Partner codes an admin may read and write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartnerScope {
    All,
    Codes(BTreeSet<String>),
}

impl PartnerScope {
    pub fn none() -> Self {
        PartnerScope::Codes(BTreeSet::new())
    }

    pub fn for_admin(admin: &AdminUser) -> Self {
        if !admin.is_active() {
            return Self::none();
        }
        if admin.role.is_super_admin() {
            return PartnerScope::All;
        }
        PartnerScope::Codes(admin.assigned_partner_codes.iter().cloned().collect())
    }

    pub fn allows(&self, partner_code: &str) -> bool {
        match self {
            PartnerScope::All => true,
            PartnerScope::Codes(codes) => codes.contains(partner_code),
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, PartnerScope::All)
    }
}

/// The authenticated admin behind a request
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub admin_id: String,
    pub email: String,
    pub name: String,
    pub role: AdminRole,
    pub scope: PartnerScope,
}

impl AuthContext {
    pub fn from_admin(admin: &AdminUser) -> Self {
        Self {
            admin_id: admin.id.clone(),
            email: admin.email.clone(),
            name: admin.name.clone(),
            role: admin.role,
            scope: PartnerScope::for_admin(admin),
        }
    }

    pub fn actor(&self) -> Actor {
        Actor::new(&self.admin_id, &self.name)
    }

    pub fn is_super_admin(&self) -> bool {
        self.role.is_super_admin()
    }

    pub fn can_access(&self, partner_code: &str) -> bool {
        self.scope.allows(partner_code)
    }

    pub fn require_super_admin(&self) -> Result<()> {
        if self.is_super_admin() {
            Ok(())
        } else {
            Err(PlatformError::forbidden("Super Admin role required"))
        }
    }

    pub fn require_access(&self, partner_code: &str) -> Result<()> {
        if self.can_access(partner_code) {
            Ok(())
        } else {
            Err(PlatformError::forbidden(format!("No access to partner code {}", partner_code)))
        }
    }
}

/// Resolves admins to their partner scope
#[derive(Clone)]
pub struct AccessControl {
    admins: AdminRepository,
}

impl AccessControl {
    pub fn new(admins: AdminRepository) -> Self {
        Self { admins }
    }

    /// Whether `actor_id` may act on `partner_code`
    pub async fn has_access(&self, actor_id: &str, partner_code: &str) -> Result<bool> {
        Ok(self.accessible_codes(actor_id).await?.allows(partner_code))
    }

    /// `All` for Super Admins, otherwise the assigned codes (empty when unknown or disabled)
    pub async fn accessible_codes(&self, actor_id: &str) -> Result<PartnerScope> {
        Ok(match self.admins.get_by_id(actor_id).await? {
            Some(admin) => PartnerScope::for_admin(&admin),
            None => PartnerScope::none(),
        })
    }

    /// Build the request context from validated claims.
    ///
    /// The admin is re-read so role changes and disabling apply immediately.
    pub async fn build_context(&self, claims: &AccessTokenClaims) -> Result<AuthContext> {
        let admin = self
            .admins
            .get_by_id(&claims.sub)
            .await?
            .filter(AdminUser::is_active)
            .ok_or_else(|| {
                debug!(admin_id = %claims.sub, "Token subject is unknown or disabled");
                PlatformError::unauthorized("Account is disabled or no longer exists")
            })?;

        Ok(AuthContext::from_admin(&admin))
    }
}
