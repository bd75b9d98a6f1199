//! Gateway API
//!
//! `/api/data` dispatches by entity type:
//! - GET    `?type=` returns the caller-visible collection
//! - POST   `{type, data}` creates a record
//! - PUT    `{type, data}` replaces the collection (array) or upserts one record (object)
//! - PATCH  `{type, data}` merges fields into the record named by `data.id`
//! - DELETE `?type=&id=` hard-deletes an invoice or dataset version

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::{router::OpenApiRouter, routes};

use super::access::ScopedRecord;
use super::entity_type::EntityType;
use crate::auth::{AuthContext, PasswordService};
use crate::collection::CollectionRepository;
use crate::dataset::DatasetVersion;
use crate::shared::error::{ErrorResponse, PlatformError, Result};
use crate::shared::middleware::Authenticated;
use crate::shared::validation::validate_field_names;
use crate::Repositories;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DataQuery {
    /// Entity type, e.g. `invoices`
    #[serde(rename = "type")]
    pub entity_type: Option<String>,
    /// Record id (DELETE only)
    pub id: Option<String>,
    /// Restrict a read to one partner code
    #[serde(rename = "partnerCode")]
    pub partner_code: Option<String>,
}

impl DataQuery {
    fn entity_type(&self) -> Result<EntityType> {
        self.entity_type
            .as_deref()
            .ok_or_else(|| PlatformError::bad_request("Missing entity type"))?
            .parse()
    }
}

/// Write request body
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DataRequest {
    #[serde(rename = "type")]
    pub entity_type: String,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub data: Value,
}

impl DataRequest {
    fn parse(payload: std::result::Result<Json<DataRequest>, JsonRejection>) -> Result<(EntityType, Value)> {
        let Json(request) = payload.map_err(|e| PlatformError::bad_request(e.body_text()))?;
        let entity_type = request.entity_type.parse()?;
        validate_field_names(&request.data)?;
        Ok((entity_type, request.data))
    }
}

#[derive(Clone)]
pub struct GatewayState {
    pub repos: Repositories,
    pub passwords: Arc<PasswordService>,
}

fn parse_record<T: ScopedRecord>(data: Value, passwords: &PasswordService) -> Result<T> {
    let Value::Object(mut fields) = data else {
        return Err(PlatformError::bad_request(format!("{} data must be a JSON object", T::ENTITY_TYPE)));
    };
    T::prepare_fields(&mut fields, passwords)?;
    serde_json::from_value(Value::Object(fields))
        .map_err(|e| PlatformError::bad_request(format!("Invalid {} record: {}", T::ENTITY_TYPE, e)))
}

fn to_responses<T: ScopedRecord>(records: &[T]) -> Result<Value> {
    records
        .iter()
        .map(ScopedRecord::to_response)
        .collect::<Result<Vec<_>>>()
        .map(Value::Array)
}

async fn list_records<T: ScopedRecord>(
    repo: &CollectionRepository<T>,
    auth: &AuthContext,
    partner_code: Option<&str>,
) -> Result<Value> {
    let records = repo.get_all(partner_code).await?;
    let visible: Vec<T> = records.into_iter().filter(|r| r.visible_to(auth)).collect();
    to_responses(&visible)
}

async fn create_record<T: ScopedRecord>(
    repo: &CollectionRepository<T>,
    auth: &AuthContext,
    data: Value,
    passwords: &PasswordService,
) -> Result<Value> {
    let record: T = parse_record(data, passwords)?;
    record.check_write(auth)?;
    repo.create(record, &auth.actor()).await?.to_response()
}

async fn replace_records<T: ScopedRecord>(
    repo: &CollectionRepository<T>,
    auth: &AuthContext,
    data: Value,
    passwords: &PasswordService,
) -> Result<Value> {
    match data {
        Value::Array(items) => {
            // A bulk replace rewrites every partner's records
            auth.require_super_admin()?;

            let existing = repo.get_all(None).await?;
            let mut seen = HashSet::new();
            let mut records = Vec::with_capacity(items.len());
            for item in items {
                let mut record: T = parse_record(item, passwords)?;
                if !seen.insert(record.id().to_string()) {
                    return Err(PlatformError::bad_request(format!("Duplicate id in request: {}", record.id())));
                }
                if let Some(previous) = existing.iter().find(|e| e.id() == record.id()) {
                    record.carry_over(previous);
                }
                records.push(record);
            }

            repo.replace_all(&records, &auth.actor()).await?;
            to_responses(&records)
        }
        Value::Object(_) => {
            let mut record: T = parse_record(data, passwords)?;
            record.check_write(auth)?;
            if let Some(previous) = repo.get_by_id(record.id()).await? {
                previous.check_write(auth)?;
                record.carry_over(&previous);
            }
            repo.upsert(record, &auth.actor()).await?.to_response()
        }
        _ => Err(PlatformError::bad_request("PUT data must be an object or an array")),
    }
}

async fn patch_record<T: ScopedRecord>(
    repo: &CollectionRepository<T>,
    auth: &AuthContext,
    data: Value,
    passwords: &PasswordService,
) -> Result<Value> {
    let Value::Object(mut fields) = data else {
        return Err(PlatformError::bad_request("PATCH data must be a JSON object"));
    };
    let id = fields
        .get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| PlatformError::bad_request("data.id is required"))?;

    T::prepare_fields(&mut fields, passwords)?;

    let updated = repo
        .update_guarded(&id, &fields, &auth.actor(), |before, after| {
            before.check_write(auth)?;
            after.check_write(auth)
        })
        .await?;
    updated.to_response()
}

async fn delete_record<T: ScopedRecord>(repo: &CollectionRepository<T>, auth: &AuthContext, id: &str) -> Result<Value> {
    let existing = repo
        .get_by_id(id)
        .await?
        .ok_or_else(|| PlatformError::not_found(T::ENTITY_TYPE, id))?;
    existing.check_write(auth)?;
    repo.delete(id, &auth.actor()).await?.to_response()
}

fn versions_value(versions: &[DatasetVersion]) -> Result<Value> {
    serde_json::to_value(versions).map_err(|e| PlatformError::internal(e.to_string()))
}

/// Read a collection
#[utoipa::path(
    get,
    path = "/data",
    tag = "gateway",
    operation_id = "getApiData",
    params(DataQuery),
    responses(
        (status = 200, description = "Records visible to the caller"),
        (status = 400, description = "Unknown entity type", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_data(
    State(state): State<GatewayState>,
    auth: Authenticated,
    Query(query): Query<DataQuery>,
) -> Result<Json<Value>> {
    let entity_type = query.entity_type()?;
    let code = query.partner_code.as_deref();
    let repos = &state.repos;

    let body = match entity_type {
        EntityType::Developers => list_records(&repos.developers, &auth, code).await?,
        EntityType::Invoices => list_records(&repos.invoices, &auth, code).await?,
        EntityType::Agreements => list_records(&repos.agreements, &auth, code).await?,
        EntityType::Events => list_records(&repos.events, &auth, code).await?,
        EntityType::Campaigns => list_records(&repos.campaigns, &auth, code).await?,
        EntityType::Admins => list_records(&repos.admins, &auth, code).await?,
        EntityType::Registry => list_records(&repos.registry, &auth, code).await?,
        EntityType::Versions => {
            auth.require_super_admin()?;
            versions_value(&repos.versions.list().await?)?
        }
    };

    debug!(entity_type = %entity_type, admin_id = %auth.admin_id, "Gateway read");
    Ok(Json(body))
}

/// Create a record
#[utoipa::path(
    post,
    path = "/data",
    tag = "gateway",
    operation_id = "postApiData",
    request_body = DataRequest,
    responses(
        (status = 201, description = "Record created"),
        (status = 400, description = "Unknown type or invalid field name", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 403, description = "Partner code outside the caller's scope", body = ErrorResponse),
        (status = 409, description = "Duplicate id or concurrent write", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn post_data(
    State(state): State<GatewayState>,
    auth: Authenticated,
    payload: std::result::Result<Json<DataRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>)> {
    let (entity_type, data) = DataRequest::parse(payload)?;
    let repos = &state.repos;
    let pw = state.passwords.as_ref();

    let body = match entity_type {
        EntityType::Developers => create_record(&repos.developers, &auth, data, pw).await?,
        EntityType::Invoices => create_record(&repos.invoices, &auth, data, pw).await?,
        EntityType::Agreements => create_record(&repos.agreements, &auth, data, pw).await?,
        EntityType::Events => create_record(&repos.events, &auth, data, pw).await?,
        EntityType::Campaigns => create_record(&repos.campaigns, &auth, data, pw).await?,
        EntityType::Admins => create_record(&repos.admins, &auth, data, pw).await?,
        EntityType::Registry => create_record(&repos.registry, &auth, data, pw).await?,
        EntityType::Versions => {
            auth.require_super_admin()?;
            let version: DatasetVersion = serde_json::from_value(data)
                .map_err(|e| PlatformError::bad_request(format!("Invalid dataset version: {}", e)))?;
            let stored = repos.versions.add(version, &auth.actor()).await?;
            serde_json::to_value(stored).map_err(|e| PlatformError::internal(e.to_string()))?
        }
    };

    Ok((StatusCode::CREATED, Json(body)))
}

/// Replace a collection or upsert one record
#[utoipa::path(
    put,
    path = "/data",
    tag = "gateway",
    operation_id = "putApiData",
    request_body = DataRequest,
    responses(
        (status = 200, description = "Stored record or collection"),
        (status = 400, description = "Unknown type or invalid field name", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 403, description = "Not permitted for the caller", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn put_data(
    State(state): State<GatewayState>,
    auth: Authenticated,
    payload: std::result::Result<Json<DataRequest>, JsonRejection>,
) -> Result<Json<Value>> {
    let (entity_type, data) = DataRequest::parse(payload)?;
    let repos = &state.repos;
    let pw = state.passwords.as_ref();

    let body = match entity_type {
        EntityType::Developers => replace_records(&repos.developers, &auth, data, pw).await?,
        EntityType::Invoices => replace_records(&repos.invoices, &auth, data, pw).await?,
        EntityType::Agreements => replace_records(&repos.agreements, &auth, data, pw).await?,
        EntityType::Events => replace_records(&repos.events, &auth, data, pw).await?,
        EntityType::Campaigns => replace_records(&repos.campaigns, &auth, data, pw).await?,
        EntityType::Admins => replace_records(&repos.admins, &auth, data, pw).await?,
        EntityType::Registry => replace_records(&repos.registry, &auth, data, pw).await?,
        EntityType::Versions => {
            return Err(PlatformError::bad_request("Dataset versions are immutable; upload a new version"));
        }
    };

    Ok(Json(body))
}

/// Merge fields into one record
#[utoipa::path(
    patch,
    path = "/data",
    tag = "gateway",
    operation_id = "patchApiData",
    request_body = DataRequest,
    responses(
        (status = 200, description = "Updated record"),
        (status = 400, description = "Unknown type, invalid field name or missing id", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 403, description = "Not permitted for the caller", body = ErrorResponse),
        (status = 404, description = "Record not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn patch_data(
    State(state): State<GatewayState>,
    auth: Authenticated,
    payload: std::result::Result<Json<DataRequest>, JsonRejection>,
) -> Result<Json<Value>> {
    let (entity_type, data) = DataRequest::parse(payload)?;
    let repos = &state.repos;
    let pw = state.passwords.as_ref();

    let body = match entity_type {
        EntityType::Developers => patch_record(&repos.developers, &auth, data, pw).await?,
        EntityType::Invoices => patch_record(&repos.invoices, &auth, data, pw).await?,
        EntityType::Agreements => patch_record(&repos.agreements, &auth, data, pw).await?,
        EntityType::Events => patch_record(&repos.events, &auth, data, pw).await?,
        EntityType::Campaigns => patch_record(&repos.campaigns, &auth, data, pw).await?,
        EntityType::Admins => patch_record(&repos.admins, &auth, data, pw).await?,
        EntityType::Registry => patch_record(&repos.registry, &auth, data, pw).await?,
        EntityType::Versions => {
            return Err(PlatformError::bad_request("Dataset versions are immutable; upload a new version"));
        }
    };

    Ok(Json(body))
}

/// Hard-delete an invoice or dataset version
#[utoipa::path(
    delete,
    path = "/data",
    tag = "gateway",
    operation_id = "deleteApiData",
    params(DataQuery),
    responses(
        (status = 200, description = "Deleted record"),
        (status = 400, description = "Type does not support deletion or id missing", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 404, description = "Record not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_data(
    State(state): State<GatewayState>,
    auth: Authenticated,
    Query(query): Query<DataQuery>,
) -> Result<Json<Value>> {
    let entity_type = query.entity_type()?;
    if !entity_type.allows_delete() {
        return Err(PlatformError::bad_request(format!(
            "{} cannot be deleted; use a status transition instead",
            entity_type
        )));
    }
    let id = query
        .id
        .as_deref()
        .ok_or_else(|| PlatformError::bad_request("Missing id"))?;

    let body = match entity_type {
        EntityType::Invoices => delete_record(&state.repos.invoices, &auth, id).await?,
        _ => {
            auth.require_super_admin()?;
            let removed = state.repos.versions.delete(id, &auth.actor()).await?;
            serde_json::to_value(removed).map_err(|e| PlatformError::internal(e.to_string()))?
        }
    };

    Ok(Json(body))
}

pub fn gateway_router(state: GatewayState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(get_data, post_data, put_data, patch_data, delete_data))
        .with_state(state)
}
