//! Datasets API
//!
//! Upload, inspect, restore and delete dataset snapshots. Super Admin only.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

use super::entity::DatasetVersion;
use super::store::VersionStore;
use crate::audit::{AuditAction, AuditService, NewAuditEntry};
use crate::collection::Record;
use crate::developer::DeveloperRecord;
use crate::shared::error::{ErrorResponse, PlatformError};
use crate::shared::middleware::Authenticated;

#[derive(Clone)]
pub struct DatasetsState {
    pub versions: VersionStore,
    pub audit: AuditService,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadDatasetRequest {
    pub file_name: String,
    pub records: Vec<DeveloperRecord>,
}

/// Version metadata without the record snapshot
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DatasetVersionSummary {
    pub id: String,
    pub file_name: String,
    pub uploaded_by: String,
    pub uploaded_at: DateTime<Utc>,
    pub record_count: usize,
}

impl From<&DatasetVersion> for DatasetVersionSummary {
    fn from(v: &DatasetVersion) -> Self {
        Self {
            id: v.id.clone(),
            file_name: v.file_name.clone(),
            uploaded_by: v.uploaded_by.clone(),
            uploaded_at: v.uploaded_at,
            record_count: v.record_count,
        }
    }
}

/// Store an uploaded dataset as the newest version
#[utoipa::path(
    post,
    path = "/datasets",
    tag = "datasets",
    operation_id = "postApiDatasets",
    request_body = UploadDatasetRequest,
    responses(
        (status = 201, description = "Version stored", body = DatasetVersionSummary),
        (status = 403, description = "Super Admin role required", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn upload_dataset(
    State(state): State<DatasetsState>,
    auth: Authenticated,
    Json(req): Json<UploadDatasetRequest>,
) -> Result<(StatusCode, Json<DatasetVersionSummary>), PlatformError> {
    auth.require_super_admin()?;
    if req.file_name.trim().is_empty() {
        return Err(PlatformError::validation("fileName is required"));
    }

    let version = DatasetVersion::new(req.file_name, &auth.name, req.records);
    let stored = state.versions.add(version, &auth.actor()).await?;
    Ok((StatusCode::CREATED, Json(DatasetVersionSummary::from(&stored))))
}

/// Retained versions, newest first
#[utoipa::path(
    get,
    path = "/datasets",
    tag = "datasets",
    operation_id = "getApiDatasets",
    responses(
        (status = 200, description = "Retained versions", body = Vec<DatasetVersionSummary>),
        (status = 403, description = "Super Admin role required", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_datasets(
    State(state): State<DatasetsState>,
    auth: Authenticated,
) -> Result<Json<Vec<DatasetVersionSummary>>, PlatformError> {
    auth.require_super_admin()?;
    let versions = state.versions.list().await?;
    Ok(Json(versions.iter().map(DatasetVersionSummary::from).collect()))
}

/// Full version including its records
#[utoipa::path(
    get,
    path = "/datasets/{id}",
    tag = "datasets",
    operation_id = "getApiDatasetsById",
    params(("id" = String, Path, description = "Version ID")),
    responses(
        (status = 200, description = "Version found", body = DatasetVersion),
        (status = 404, description = "Version not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_dataset(
    State(state): State<DatasetsState>,
    auth: Authenticated,
    Path(id): Path<String>,
) -> Result<Json<DatasetVersion>, PlatformError> {
    auth.require_super_admin()?;
    let version = state
        .versions
        .get(&id)
        .await?
        .ok_or_else(|| PlatformError::not_found(DatasetVersion::ENTITY_TYPE, &id))?;

    state
        .audit
        .record(
            NewAuditEntry::new(&auth.actor(), AuditAction::View, DatasetVersion::ENTITY_TYPE)
                .entity_id(&version.id)
                .details(format!("Viewed {}", version.file_name)),
        )
        .await;
    Ok(Json(version))
}

/// Replace the developers collection with a stored snapshot
#[utoipa::path(
    post,
    path = "/datasets/{id}/restore",
    tag = "datasets",
    operation_id = "postApiDatasetsRestore",
    params(("id" = String, Path, description = "Version ID")),
    responses(
        (status = 200, description = "Version restored", body = DatasetVersionSummary),
        (status = 404, description = "Version not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn restore_dataset(
    State(state): State<DatasetsState>,
    auth: Authenticated,
    Path(id): Path<String>,
) -> Result<Json<DatasetVersionSummary>, PlatformError> {
    auth.require_super_admin()?;
    let version = state.versions.restore(&id, &auth.actor()).await?;
    Ok(Json(DatasetVersionSummary::from(&version)))
}

#[utoipa::path(
    delete,
    path = "/datasets/{id}",
    tag = "datasets",
    operation_id = "deleteApiDatasets",
    params(("id" = String, Path, description = "Version ID")),
    responses(
        (status = 204, description = "Version deleted"),
        (status = 404, description = "Version not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_dataset(
    State(state): State<DatasetsState>,
    auth: Authenticated,
    Path(id): Path<String>,
) -> Result<StatusCode, PlatformError> {
    auth.require_super_admin()?;
    state.versions.delete(&id, &auth.actor()).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn datasets_router(state: DatasetsState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(upload_dataset, list_datasets))
        .routes(routes!(get_dataset, delete_dataset))
        .routes(routes!(restore_dataset))
        .with_state(state)
}
