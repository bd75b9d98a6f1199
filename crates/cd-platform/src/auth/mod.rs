//! Authentication Aggregate
//!
//! Password login, token issuance and partner-code access control.

pub mod auth_service;
pub mod password_service;
pub mod access_control;
pub mod auth_api;

pub use auth_service::{extract_bearer_token, AccessTokenClaims, AuthService};
pub use password_service::{PasswordPolicy, PasswordService};
pub use access_control::{AccessControl, AuthContext, PartnerScope};
pub use auth_api::{auth_router, AuthApiState};
