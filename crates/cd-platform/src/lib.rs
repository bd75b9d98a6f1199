//! CertDash Platform
//!
//! Backend for the certification program dashboard:
//! - Storage adapters (in-process key-value, SQLite) with per-collection revisions
//! - Capped audit log
//! - Per-entity collection repositories with partner-code scoping
//! - Password login issuing HS256 tokens
//! - The `/api/data` gateway plus billing, dataset and campaign endpoints
//!
//! ## Module Organization (Aggregate-based)
//!
//! Each aggregate contains:
//! - `entity` - Domain entities
//! - `repository` - Data access
//! - `api` - REST endpoints (where applicable)

// Persistence
pub mod storage;
pub mod collection;

// Domain aggregates
pub mod developer;
pub mod invoice;
pub mod agreement;
pub mod event;
pub mod campaign;
pub mod admin;
pub mod registry;
pub mod dataset;

// Authentication, authorization and audit
pub mod auth;
pub mod audit;

// HTTP surface
pub mod gateway;

// Shared infrastructure
pub mod shared;
pub mod seed;

use axum::Router;
use std::sync::Arc;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::openapi::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_swagger_ui::SwaggerUi;

pub use shared::error::{PlatformError, Result};
pub use storage::{CollectionKey, MemoryStore, SqliteStore, Storage, StorageAdapter, StorageError};

pub use admin::{AdminRepository, AdminRole, AdminStatus, AdminUser};
pub use agreement::{AgreementRepository, CommunityAgreement};
pub use audit::{Actor, AuditAction, AuditLogEntry, AuditService};
pub use auth::{AccessControl, AuthContext, AuthService, PartnerScope, PasswordService};
pub use campaign::{CampaignRepository, OutreachCampaign};
pub use dataset::{DatasetVersion, VersionStore};
pub use developer::{DeveloperRecord, DeveloperRepository, Grade};
pub use event::{CommunityEvent, EventRepository};
pub use invoice::{BillingService, Invoice, InvoiceRepository};
pub use registry::{CommunityMasterRecord, RegistryRepository};
pub use seed::DevDataSeeder;

/// One repository per persisted collection, sharing a storage handle
#[derive(Clone)]
pub struct Repositories {
    pub developers: DeveloperRepository,
    pub invoices: InvoiceRepository,
    pub agreements: AgreementRepository,
    pub events: EventRepository,
    pub campaigns: CampaignRepository,
    pub admins: AdminRepository,
    pub registry: RegistryRepository,
    pub versions: VersionStore,
}

impl Repositories {
    pub fn new(storage: Storage, audit: AuditService, max_versions: usize) -> Self {
        let developers = DeveloperRepository::new(storage.clone(), audit.clone());
        Self {
            versions: VersionStore::new(storage.clone(), audit.clone(), developers.clone(), max_versions),
            developers,
            invoices: InvoiceRepository::new(storage.clone(), audit.clone()),
            agreements: AgreementRepository::new(storage.clone(), audit.clone()),
            events: EventRepository::new(storage.clone(), audit.clone()),
            campaigns: CampaignRepository::new(storage.clone(), audit.clone()),
            admins: AdminRepository::new(storage.clone(), audit.clone()),
            registry: RegistryRepository::new(storage, audit),
        }
    }
}

/// Wired services behind the HTTP surface
#[derive(Clone)]
pub struct Platform {
    pub storage: Storage,
    pub audit: AuditService,
    pub repos: Repositories,
    pub auth_service: Arc<AuthService>,
    pub password_service: Arc<PasswordService>,
}

impl Platform {
    /// Build services over `storage`. Fails when the signing configuration is unusable.
    pub fn new(storage: Storage, config: &cd_config::AppConfig) -> Result<Self> {
        let audit = AuditService::new(storage.clone(), config.audit.max_entries);
        let repos = Repositories::new(storage.clone(), audit.clone(), config.datasets.max_versions);
        let auth_service = Arc::new(AuthService::new(&config.auth)?);

        Ok(Self {
            storage,
            audit,
            repos,
            auth_service,
            password_service: Arc::new(PasswordService::default()),
        })
    }

    /// Replace the password service (tests use cheaper Argon2 parameters)
    pub fn with_password_service(mut self, password_service: PasswordService) -> Self {
        self.password_service = Arc::new(password_service);
        self
    }

    /// Seed the development roster when no admins exist
    pub async fn seed_dev_data(&self) -> Result<bool> {
        DevDataSeeder::new(self.repos.admins.clone(), self.repos.registry.clone())
            .seed()
            .await
    }

    /// API routes with their OpenAPI document
    pub fn api_router(&self) -> (Router, OpenApi) {
        let access = AccessControl::new(self.repos.admins.clone());

        let api = OpenApiRouter::new()
            .merge(gateway::gateway_router(gateway::GatewayState {
                repos: self.repos.clone(),
                passwords: self.password_service.clone(),
            }))
            .merge(audit::audit_logs_router(audit::AuditLogsState {
                audit: self.audit.clone(),
            }))
            .merge(developer::developers_router(developer::DevelopersState {
                developers: self.repos.developers.clone(),
            }))
            .merge(invoice::billing_router(invoice::BillingState {
                billing: BillingService::new(
                    self.repos.agreements.clone(),
                    self.repos.developers.clone(),
                    self.repos.invoices.clone(),
                ),
                agreements: self.repos.agreements.clone(),
                invoices: self.repos.invoices.clone(),
            }))
            .merge(campaign::campaigns_router(campaign::CampaignsState {
                campaigns: self.repos.campaigns.clone(),
            }))
            .merge(dataset::datasets_router(dataset::DatasetsState {
                versions: self.repos.versions.clone(),
                audit: self.audit.clone(),
            }));

        let (router, mut openapi) = OpenApiRouter::new()
            .nest(
                "/api/auth",
                auth::auth_router(auth::AuthApiState {
                    auth_service: self.auth_service.clone(),
                    password_service: self.password_service.clone(),
                    admins: self.repos.admins.clone(),
                }),
            )
            .nest("/api", api)
            .merge(shared::health_api::health_router(shared::health_api::HealthState::new(
                self.storage.clone(),
            )))
            .split_for_parts();

        openapi.info.title = "CertDash API".to_string();
        openapi.info.version = env!("CARGO_PKG_VERSION").to_string();
        openapi.info.description = Some("Certification program dashboard backend".to_string());
        openapi
            .components
            .get_or_insert_with(Default::default)
            .add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).bearer_format("JWT").build()),
            );

        let router = router.layer(shared::AuthLayer::new(shared::AuthState {
            auth_service: self.auth_service.clone(),
            access,
        }));
        (router, openapi)
    }

    /// Full application router including Swagger UI
    pub fn router(&self) -> Router {
        let (router, openapi) = self.api_router();
        Router::new()
            .merge(router)
            .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi))
    }
}
