//! CertDash Configuration System
//!
//! TOML-based configuration with environment variable overrides. `validate()`
//! enforces the startup preconditions the server refuses to run without.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

mod loader;

pub use loader::ConfigLoader;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    #[error("Missing required configuration: {0}")]
    Missing(String),
}

/// Root application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub audit: AuditConfig,
    pub datasets: DatasetConfig,

    /// Seed a default admin roster when the store is empty
    pub dev_mode: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            storage: StorageConfig::default(),
            auth: AuthConfig::default(),
            audit: AuditConfig::default(),
            datasets: DatasetConfig::default(),
            dev_mode: false,
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub port: u16,
    pub host: String,
    pub cors_origins: Vec<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "0.0.0.0".to_string(),
            cors_origins: vec!["http://localhost:3000".to_string()],
        }
    }
}

/// Which storage adapter backs the collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// In-process key-value store (local-storage deployment)
    Memory,
    /// Relational rows in SQLite
    Sqlite,
}

impl std::str::FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "sqlite" => Ok(StorageBackend::Sqlite),
            other => Err(ConfigError::ValidationError(format!(
                "unknown storage backend '{}' (expected memory or sqlite)",
                other
            ))),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Connection string, e.g. `sqlite://./data/certdash.db?mode=rwc`
    pub database_url: String,
    pub max_connections: u32,
    /// Byte quota for the memory backend (0 = unlimited)
    pub quota_bytes: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Sqlite,
            database_url: String::new(),
            max_connections: 5,
            quota_bytes: 0,
        }
    }
}

/// Token signing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub issuer: String,
    pub token_expiry_hours: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            issuer: "certdash".to_string(),
            token_expiry_hours: 8,
        }
    }
}

/// Audit log configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    pub max_entries: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self { max_entries: 1000 }
    }
}

/// Most dataset snapshots the platform will retain
pub const MAX_DATASET_VERSIONS: usize = 5;

/// Dataset snapshot configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    pub max_versions: usize,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            max_versions: MAX_DATASET_VERSIONS,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration with environment variable override
    pub fn load() -> Result<Self, ConfigError> {
        ConfigLoader::new().load()
    }

    /// Check the startup preconditions.
    ///
    /// A missing signing secret, or a missing database URL for the SQLite
    /// backend, is fatal.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.jwt_secret.trim().is_empty() {
            return Err(ConfigError::Missing("auth.jwt_secret (CERTDASH_JWT_SECRET)".to_string()));
        }
        if self.storage.backend == StorageBackend::Sqlite && self.storage.database_url.trim().is_empty() {
            return Err(ConfigError::Missing(
                "storage.database_url (CERTDASH_DATABASE_URL)".to_string(),
            ));
        }
        if !(1..=24).contains(&self.auth.token_expiry_hours) {
            return Err(ConfigError::ValidationError(format!(
                "auth.token_expiry_hours must be between 1 and 24, got {}",
                self.auth.token_expiry_hours
            )));
        }
        if self.audit.max_entries == 0 {
            return Err(ConfigError::ValidationError("audit.max_entries must be positive".to_string()));
        }
        if !(1..=MAX_DATASET_VERSIONS).contains(&self.datasets.max_versions) {
            return Err(ConfigError::ValidationError(format!(
                "datasets.max_versions must be between 1 and {}, got {}",
                MAX_DATASET_VERSIONS, self.datasets.max_versions
            )));
        }
        Ok(())
    }

    /// Generate an example TOML configuration
    pub fn example_toml() -> String {
        r#"# CertDash Configuration
# Environment variables override these settings

dev_mode = false

[http]
port = 8080
host = "0.0.0.0"
cors_origins = ["http://localhost:3000"]

[storage]
backend = "sqlite"  # sqlite or memory
database_url = "sqlite://./data/certdash.db?mode=rwc"
max_connections = 5
quota_bytes = 0

[auth]
jwt_secret = ""
issuer = "certdash"
token_expiry_hours = 8

[audit]
max_entries = 1000

[datasets]
max_versions = 5
"#
        .to_string()
    }
}
