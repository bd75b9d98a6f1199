//! Authentication Service
//!
//! HS256 token generation and validation.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::admin::AdminUser;
use crate::shared::error::{PlatformError, Result};

/// JWT Claims for access tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Subject (admin id)
    pub sub: String,
    pub email: String,
    #[serde(default)]
    pub name: String,
    /// Role at issue time; the live role is re-read on every request
    pub role: String,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
}

pub struct AuthService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    token_expiry: Duration,
}

impl AuthService {
    /// Fails with `ServerMisconfigured` when no signing secret is configured
    pub fn new(config: &cd_config::AuthConfig) -> Result<Self> {
        if config.jwt_secret.trim().is_empty() {
            return Err(PlatformError::misconfigured("JWT signing secret is not configured"));
        }
        if !(1..=24).contains(&config.token_expiry_hours) {
            return Err(PlatformError::misconfigured(format!(
                "Token expiry must be between 1 and 24 hours, got {}",
                config.token_expiry_hours
            )));
        }

        info!(issuer = %config.issuer, expiry_hours = config.token_expiry_hours, "AuthService initialized with HS256");

        Ok(Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            issuer: config.issuer.clone(),
            token_expiry: Duration::hours(config.token_expiry_hours),
        })
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn token_expiry(&self) -> Duration {
        self.token_expiry
    }

    /// Issue an access token for an admin
    pub fn issue_token(&self, admin: &AdminUser) -> Result<String> {
        let now = Utc::now();
        let claims = AccessTokenClaims {
            sub: admin.id.clone(),
            email: admin.email.clone(),
            name: admin.name.clone(),
            role: admin.role.as_str().to_string(),
            iss: self.issuer.clone(),
            iat: now.timestamp(),
            exp: (now + self.token_expiry).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| PlatformError::internal(format!("Failed to encode JWT: {}", e)))
    }

    /// Validate signature, expiry and issuer, and extract claims
    pub fn validate_token(&self, token: &str) -> Result<AccessTokenClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "sub", "iss"]);

        decode::<AccessTokenClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => PlatformError::TokenExpired,
                _ => PlatformError::InvalidToken { message: e.to_string() },
            })
    }
}

/// Extract bearer token from Authorization header
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admin::AdminRole;

    fn config(secret: &str) -> cd_config::AuthConfig {
        cd_config::AuthConfig {
            jwt_secret: secret.to_string(),
            ..Default::default()
        }
    }

    fn admin() -> AdminUser {
        AdminUser::new("ana@hq.org", "Ana", AdminRole::SuperAdmin)
    }

    #[test]
    fn test_missing_secret_is_misconfiguration() {
        assert!(matches!(
            AuthService::new(&config("  ")),
            Err(PlatformError::ServerMisconfigured { .. })
        ));
    }

    #[test]
    fn test_expiry_bounds() {
        let mut cfg = config("secret");
        cfg.token_expiry_hours = 25;
        assert!(AuthService::new(&cfg).is_err());
        cfg.token_expiry_hours = 1;
        assert!(AuthService::new(&cfg).is_ok());
    }

    #[test]
    fn test_issue_and_validate() {
        let service = AuthService::new(&config("secret")).unwrap();
        let admin = admin();
        let token = service.issue_token(&admin).unwrap();

        let claims = service.validate_token(&token).unwrap();
        assert_eq!(claims.sub, admin.id);
        assert_eq!(claims.email, "ana@hq.org");
        assert_eq!(claims.role, "Super Admin (HQ)");
        assert_eq!(claims.iss, "certdash");
        assert_eq!(claims.exp - claims.iat, 8 * 3600);
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let issuer = AuthService::new(&config("secret-a")).unwrap();
        let verifier = AuthService::new(&config("secret-b")).unwrap();
        let token = issuer.issue_token(&admin()).unwrap();

        assert!(matches!(
            verifier.validate_token(&token),
            Err(PlatformError::InvalidToken { .. })
        ));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let service = AuthService::new(&config("secret")).unwrap();
        let past = Utc::now() - Duration::hours(2);
        let claims = AccessTokenClaims {
            sub: "a1".to_string(),
            email: "ana@hq.org".to_string(),
            name: "Ana".to_string(),
            role: "Super Admin (HQ)".to_string(),
            iss: "certdash".to_string(),
            iat: past.timestamp(),
            exp: (past + Duration::hours(1)).timestamp(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();

        assert!(matches!(service.validate_token(&token), Err(PlatformError::TokenExpired)));
    }

    #[test]
    fn test_wrong_issuer_and_garbage() {
        let service = AuthService::new(&config("secret")).unwrap();
        let other = AuthService::new(&cd_config::AuthConfig {
            jwt_secret: "secret".to_string(),
            issuer: "someone-else".to_string(),
            ..Default::default()
        })
        .unwrap();

        let token = other.issue_token(&admin()).unwrap();
        assert!(service.validate_token(&token).is_err());
        assert!(service.validate_token("not.a.token").is_err());
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc123"), Some("abc123"));
        assert_eq!(extract_bearer_token("bearer abc123"), None);
        assert_eq!(extract_bearer_token("Basic abc123"), None);
        assert_eq!(extract_bearer_token("Bearer "), None);
    }
}
