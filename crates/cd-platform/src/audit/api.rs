//! Audit Logs API

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::IntoParams;
use utoipa_axum::{router::OpenApiRouter, routes};

use super::entity::{AuditAction, AuditLogEntry, AuditQuery};
use super::service::AuditService;
use crate::shared::error::{ErrorResponse, PlatformError};
use crate::shared::middleware::Authenticated;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct AuditLogsQuery {
    pub user_id: Option<String>,
    pub entity_type: Option<String>,
    /// CREATE, UPDATE, DELETE, VIEW, UPLOAD, EMAIL or LOGIN
    #[param(value_type = Option<String>)]
    pub action: Option<AuditAction>,
    pub partner_code: Option<String>,
    /// Inclusive lower bound (RFC 3339)
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound (RFC 3339)
    pub to: Option<DateTime<Utc>>,
}

impl From<AuditLogsQuery> for AuditQuery {
    fn from(q: AuditLogsQuery) -> Self {
        Self {
            user_id: q.user_id,
            entity_type: q.entity_type,
            action: q.action,
            partner_code: q.partner_code,
            from: q.from,
            to: q.to,
        }
    }
}

#[derive(Clone)]
pub struct AuditLogsState {
    pub audit: AuditService,
}

/// List audit entries, newest first
///
/// Admins without full scope only see entries tagged with one of their
/// partner codes.
#[utoipa::path(
    get,
    path = "/audit-logs",
    tag = "audit-logs",
    operation_id = "getApiAuditLogs",
    params(AuditLogsQuery),
    responses(
        (status = 200, description = "Matching audit entries", body = Vec<AuditLogEntry>),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Partner code outside the caller's scope", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_audit_logs(
    State(state): State<AuditLogsState>,
    auth: Authenticated,
    Query(query): Query<AuditLogsQuery>,
) -> Result<Json<Vec<AuditLogEntry>>, PlatformError> {
    if let Some(code) = &query.partner_code {
        auth.require_access(code)?;
    }

    let query: AuditQuery = query.into();
    let entries = state.audit.query(&query).await?;

    let entries = if auth.scope.is_all() {
        entries
    } else {
        entries
            .into_iter()
            .filter(|e| e.partner_code.as_deref().is_some_and(|code| auth.can_access(code)))
            .collect()
    };

    Ok(Json(entries))
}

pub fn audit_logs_router(state: AuditLogsState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(list_audit_logs))
        .with_state(state)
}
