//! Authentication API
//!
//! Email/password login and the current-admin endpoint.

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

use super::auth_service::AuthService;
use super::password_service::PasswordService;
use crate::admin::{AdminRepository, AdminUser};
use crate::shared::error::{ErrorResponse, PlatformError};
use crate::shared::middleware::Authenticated;

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    /// The admin without credentials
    pub user: AdminUser,
}

#[derive(Clone)]
pub struct AuthApiState {
    pub auth_service: Arc<AuthService>,
    pub password_service: Arc<PasswordService>,
    pub admins: AdminRepository,
}

/// Log in with email and password
#[utoipa::path(
    post,
    path = "/login",
    tag = "auth",
    operation_id = "postAuthLogin",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<AuthApiState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, PlatformError> {
    let admin = state
        .admins
        .find_by_email(&req.email)
        .await?
        .ok_or(PlatformError::InvalidCredentials)?;

    let Some(hash) = admin.password_hash.as_deref() else {
        warn!(admin_id = %admin.id, "Login attempt for an admin without a password");
        return Err(PlatformError::InvalidCredentials);
    };

    if !state.password_service.verify_password(&req.password, hash)? {
        return Err(PlatformError::InvalidCredentials);
    }

    if !admin.is_active() {
        warn!(admin_id = %admin.id, "Login attempt for a disabled admin");
        return Err(PlatformError::unauthorized("Account is disabled"));
    }

    let admin = state.admins.record_login(&admin).await;
    let token = state.auth_service.issue_token(&admin)?;
    let expires_at = Utc::now() + state.auth_service.token_expiry();

    info!(admin_id = %admin.id, role = admin.role.as_str(), "Admin logged in");

    Ok(Json(LoginResponse {
        token,
        expires_at,
        user: admin.redacted(),
    }))
}

/// The admin behind the bearer token
#[utoipa::path(
    get,
    path = "/me",
    tag = "auth",
    operation_id = "getAuthMe",
    responses(
        (status = 200, description = "Current admin", body = AdminUser),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_current_user(
    State(state): State<AuthApiState>,
    auth: Authenticated,
) -> Result<Json<AdminUser>, PlatformError> {
    let admin = state
        .admins
        .get_by_id(&auth.admin_id)
        .await?
        .ok_or_else(|| PlatformError::not_found("AdminUser", &auth.admin_id))?;

    Ok(Json(admin.redacted()))
}

pub fn auth_router(state: AuthApiState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(login))
        .routes(routes!(get_current_user))
        .with_state(state)
}
