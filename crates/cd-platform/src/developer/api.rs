//! Developers API
//!
//! Sybil detection over the whole developer population.

use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

use super::repository::{DeveloperRepository, DuplicateWallet};
use crate::shared::error::{ErrorResponse, PlatformError};
use crate::shared::middleware::Authenticated;

#[derive(Clone)]
pub struct DevelopersState {
    pub developers: DeveloperRepository,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SybilScanResponse {
    pub flagged: usize,
    pub duplicates: Vec<DuplicateWallet>,
}

/// Wallets shared by more than one developer
///
/// Developer ids outside the caller's partner scope are omitted; a wallet is
/// still reported when the reuse crosses partners.
#[utoipa::path(
    get,
    path = "/developers/sybil",
    tag = "developers",
    operation_id = "getApiDevelopersSybil",
    responses(
        (status = 200, description = "Duplicate wallets", body = Vec<DuplicateWallet>),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_duplicate_wallets(
    State(state): State<DevelopersState>,
    auth: Authenticated,
) -> Result<Json<Vec<DuplicateWallet>>, PlatformError> {
    let duplicates = state.developers.find_duplicate_wallets().await?;
    if auth.scope.is_all() {
        return Ok(Json(duplicates));
    }

    let visible: Vec<String> = state
        .developers
        .get_all(None)
        .await?
        .into_iter()
        .filter(|d| auth.can_access(&d.partner_code))
        .map(|d| d.id)
        .collect();

    let duplicates = duplicates
        .into_iter()
        .filter_map(|mut dup| {
            dup.developer_ids.retain(|id| visible.contains(id));
            (!dup.developer_ids.is_empty()).then_some(dup)
        })
        .collect();
    Ok(Json(duplicates))
}

/// Recompute sybil flags for every developer
#[utoipa::path(
    post,
    path = "/developers/sybil/flag",
    tag = "developers",
    operation_id = "postApiDevelopersSybilFlag",
    responses(
        (status = 200, description = "Flags recomputed", body = SybilScanResponse),
        (status = 403, description = "Super Admin role required", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn flag_sybils(
    State(state): State<DevelopersState>,
    auth: Authenticated,
) -> Result<Json<SybilScanResponse>, PlatformError> {
    auth.require_super_admin()?;

    let flagged = state.developers.flag_sybils(&auth.actor()).await?;
    let duplicates = state.developers.find_duplicate_wallets().await?;
    Ok(Json(SybilScanResponse { flagged, duplicates }))
}

pub fn developers_router(state: DevelopersState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(list_duplicate_wallets))
        .routes(routes!(flag_sybils))
        .with_state(state)
}
