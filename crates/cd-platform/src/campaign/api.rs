//! Campaigns API

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

use super::entity::OutreachCampaign;
use super::repository::CampaignRepository;
use crate::shared::error::{ErrorResponse, PlatformError};
use crate::shared::middleware::Authenticated;

#[derive(Clone)]
pub struct CampaignsState {
    pub campaigns: CampaignRepository,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompleteSendRequest {
    pub sent_count: u32,
}

/// Record a finished campaign send
#[utoipa::path(
    post,
    path = "/campaigns/{id}/complete",
    tag = "campaigns",
    operation_id = "postApiCampaignsComplete",
    params(("id" = String, Path, description = "Campaign ID")),
    request_body = CompleteSendRequest,
    responses(
        (status = 200, description = "Campaign completed", body = OutreachCampaign),
        (status = 400, description = "Already sent or count exceeds audience", body = ErrorResponse),
        (status = 403, description = "Campaign outside the caller's scope", body = ErrorResponse),
        (status = 404, description = "Campaign not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn complete_send(
    State(state): State<CampaignsState>,
    auth: Authenticated,
    Path(id): Path<String>,
    Json(req): Json<CompleteSendRequest>,
) -> Result<Json<OutreachCampaign>, PlatformError> {
    let campaign = state
        .campaigns
        .get_by_id(&id)
        .await?
        .ok_or_else(|| PlatformError::not_found("Campaign", &id))?;
    match &campaign.partner_code {
        Some(code) => auth.require_access(code)?,
        None => auth.require_super_admin()?,
    }

    let campaign = state.campaigns.complete_send(&id, req.sent_count, &auth.actor()).await?;
    Ok(Json(campaign))
}

pub fn campaigns_router(state: CampaignsState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(complete_send))
        .with_state(state)
}
