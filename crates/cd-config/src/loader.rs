//! Configuration loader with file and environment variable support

use crate::{AppConfig, ConfigError};
use std::env;
use std::path::PathBuf;
use tracing::{info, warn};

/// Standard config file search paths
const CONFIG_PATHS: &[&str] = &[
    "config.toml",
    "certdash.toml",
    "./config/config.toml",
    "./config/certdash.toml",
    "/etc/certdash/config.toml",
];

/// Configuration loader
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Create a loader with a specific config file path
    pub fn with_path<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            config_path: Some(path.into()),
        }
    }

    /// Load configuration from file (if found) with environment variable overrides
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        self.load_with(|key| env::var(key).ok())
    }

    /// Same as [`load`](Self::load), reading overrides through `lookup`
    pub fn load_with<F>(&self, lookup: F) -> Result<AppConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = AppConfig::default();

        if let Some(path) = self.find_config_file(&lookup) {
            info!(?path, "Loading configuration from file");
            config = AppConfig::from_file(&path)?;
        }

        apply_overrides(&mut config, &lookup)?;

        Ok(config)
    }

    fn find_config_file<F>(&self, lookup: &F) -> Option<PathBuf>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = &self.config_path {
            if path.exists() {
                return Some(path.clone());
            }
            warn!(?path, "Configured file does not exist, searching defaults");
        }

        if let Some(path) = lookup("CERTDASH_CONFIG").map(PathBuf::from) {
            if path.exists() {
                return Some(path);
            }
        }

        CONFIG_PATHS
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::ValidationError(format!("{} has an invalid value: {}", key, raw))),
        None => Ok(None),
    }
}

fn apply_overrides<F>(config: &mut AppConfig, lookup: &F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    // HTTP
    if let Some(port) = parse_var(lookup, "CERTDASH_HTTP_PORT")? {
        config.http.port = port;
    }
    if let Some(val) = lookup("CERTDASH_HTTP_HOST") {
        config.http.host = val;
    }
    if let Some(val) = lookup("CERTDASH_CORS_ORIGINS") {
        config.http.cors_origins = val
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
    }

    // Storage
    if let Some(backend) = parse_var(lookup, "CERTDASH_STORAGE_BACKEND")? {
        config.storage.backend = backend;
    }
    if let Some(val) = lookup("CERTDASH_DATABASE_URL") {
        config.storage.database_url = val;
    }
    if let Some(quota) = parse_var(lookup, "CERTDASH_STORAGE_QUOTA_BYTES")? {
        config.storage.quota_bytes = quota;
    }

    // Auth
    if let Some(val) = lookup("CERTDASH_JWT_SECRET") {
        config.auth.jwt_secret = val;
    }
    if let Some(val) = lookup("CERTDASH_JWT_ISSUER") {
        config.auth.issuer = val;
    }
    if let Some(hours) = parse_var(lookup, "CERTDASH_TOKEN_EXPIRY_HOURS")? {
        config.auth.token_expiry_hours = hours;
    }

    // Audit
    if let Some(max) = parse_var(lookup, "CERTDASH_AUDIT_MAX_ENTRIES")? {
        config.audit.max_entries = max;
    }

    // General
    if let Some(val) = lookup("CERTDASH_DEV_MODE") {
        config.dev_mode = val == "true" || val == "1";
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StorageBackend;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_load_from_file_with_env_override() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[http]\nport = 9100\n\n[auth]\njwt_secret = \"from-file\"\n"
        )
        .unwrap();

        let loader = ConfigLoader::with_path(file.path());
        let config = loader
            .load_with(lookup_from(&[
                ("CERTDASH_JWT_SECRET", "from-env"),
                ("CERTDASH_STORAGE_BACKEND", "memory"),
            ]))
            .unwrap();

        assert_eq!(config.http.port, 9100);
        assert_eq!(config.auth.jwt_secret, "from-env");
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let loader = ConfigLoader::with_path("/nonexistent/certdash.toml");
        let config = loader
            .load_with(lookup_from(&[
                ("CERTDASH_HTTP_PORT", "7000"),
                ("CERTDASH_CORS_ORIGINS", "http://a.test, http://b.test,"),
                ("CERTDASH_DATABASE_URL", "sqlite::memory:"),
                ("CERTDASH_TOKEN_EXPIRY_HOURS", "2"),
                ("CERTDASH_AUDIT_MAX_ENTRIES", "50"),
                ("CERTDASH_DEV_MODE", "1"),
            ]))
            .unwrap();

        assert_eq!(config.http.port, 7000);
        assert_eq!(config.http.cors_origins, vec!["http://a.test", "http://b.test"]);
        assert_eq!(config.storage.database_url, "sqlite::memory:");
        assert_eq!(config.auth.token_expiry_hours, 2);
        assert_eq!(config.audit.max_entries, 50);
        assert!(config.dev_mode);
    }

    #[test]
    fn test_invalid_numeric_override_is_rejected() {
        let loader = ConfigLoader::with_path("/nonexistent/certdash.toml");
        let result = loader.load_with(lookup_from(&[("CERTDASH_HTTP_PORT", "eighty")]));
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }
}
