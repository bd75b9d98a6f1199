//! Development Data Seeder
//!
//! Seeds an admin roster and partner registry when the store has no admins.
//!
//! Default credentials:
//!   Super Admin:    admin@certdash.local / DevPassword123!
//!   Regional Admin: apac@certdash.local  / DevPassword123!

use tracing::info;

use crate::admin::{AdminRepository, AdminRole, AdminUser};
use crate::audit::Actor;
use crate::auth::password_service::{Argon2Config, PasswordPolicy, PasswordService};
use crate::registry::{CommunityMasterRecord, RegistryRepository};
use crate::shared::error::Result;

const DEV_PASSWORD: &str = "DevPassword123!";

pub struct DevDataSeeder {
    admins: AdminRepository,
    registry: RegistryRepository,
    password_service: PasswordService,
}

impl DevDataSeeder {
    pub fn new(admins: AdminRepository, registry: RegistryRepository) -> Self {
        let password_service = PasswordService::new(Argon2Config::testing(), PasswordPolicy::lenient());
        Self {
            admins,
            registry,
            password_service,
        }
    }

    /// Seed when no admins exist. Returns whether anything was written.
    pub async fn seed(&self) -> Result<bool> {
        if !self.admins.get_all(None).await?.is_empty() {
            info!("Admins already present, skipping dev seed");
            return Ok(false);
        }

        info!("=== DEV DATA SEEDER ===");
        let actor = Actor::system();

        for (code, name, region) in [
            ("SG-DEV", "Singapore Developers", "APAC"),
            ("IN-BLR", "Bangalore Builders", "APAC"),
            ("UK-LDN", "London Web3 Guild", "EMEA"),
        ] {
            if self.registry.find_by_partner_code(code).await?.is_none() {
                self.registry
                    .create(CommunityMasterRecord::new(code, name, region), &actor)
                    .await?;
                info!("Created partner: {}", code);
            }
        }

        let hash = self.password_service.hash_password(DEV_PASSWORD)?;
        let super_admin = AdminUser::new("admin@certdash.local", "HQ Admin", AdminRole::SuperAdmin)
            .with_password_hash(hash.clone());
        let regional = AdminUser::new("apac@certdash.local", "APAC Lead", AdminRole::RegionalAdmin)
            .with_partner_codes(&["SG-DEV", "IN-BLR"])
            .with_password_hash(hash);

        self.admins.create(super_admin, &actor).await?;
        self.admins.create(regional, &actor).await?;

        info!("Default logins:");
        info!("  Super Admin:    admin@certdash.local / {}", DEV_PASSWORD);
        info!("  Regional Admin: apac@certdash.local / {}", DEV_PASSWORD);
        info!("=======================");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditService;
    use crate::storage::Storage;

    #[tokio::test]
    async fn test_seeds_once() {
        let storage = Storage::in_memory();
        let audit = AuditService::new(storage.clone(), 100);
        let admins = AdminRepository::new(storage.clone(), audit.clone());
        let registry = RegistryRepository::new(storage, audit);
        let seeder = DevDataSeeder::new(admins.clone(), registry.clone());

        assert!(seeder.seed().await.unwrap());
        assert!(!seeder.seed().await.unwrap());

        assert_eq!(admins.get_all(None).await.unwrap().len(), 2);
        assert!(registry.is_official("SG-DEV").await.unwrap());

        let admin = admins.find_by_email("ADMIN@certdash.local").await.unwrap().unwrap();
        let hash = admin.password_hash.unwrap();
        assert!(PasswordService::for_testing().verify_password(DEV_PASSWORD, &hash).unwrap());
    }
}
