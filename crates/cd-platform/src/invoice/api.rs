//! Billing API

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use utoipa_axum::{router::OpenApiRouter, routes};

use super::billing::{BillingService, DraftInvoiceRequest};
use super::entity::Invoice;
use super::repository::InvoiceRepository;
use crate::agreement::AgreementRepository;
use crate::shared::error::{ErrorResponse, PlatformError};
use crate::shared::middleware::Authenticated;

#[derive(Clone)]
pub struct BillingState {
    pub billing: BillingService,
    pub agreements: AgreementRepository,
    pub invoices: InvoiceRepository,
}

/// Draft an invoice from an agreement
#[utoipa::path(
    post,
    path = "/billing/draft-invoice",
    tag = "billing",
    operation_id = "postApiBillingDraftInvoice",
    request_body = DraftInvoiceRequest,
    responses(
        (status = 201, description = "Draft invoice created", body = Invoice),
        (status = 400, description = "Invalid period or inactive agreement", body = ErrorResponse),
        (status = 403, description = "Agreement outside the caller's scope", body = ErrorResponse),
        (status = 404, description = "Agreement not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn draft_invoice(
    State(state): State<BillingState>,
    auth: Authenticated,
    Json(req): Json<DraftInvoiceRequest>,
) -> Result<(StatusCode, Json<Invoice>), PlatformError> {
    let agreement = state
        .agreements
        .get_by_id(&req.agreement_id)
        .await?
        .ok_or_else(|| PlatformError::not_found("Agreement", &req.agreement_id))?;
    auth.require_access(&agreement.partner_code)?;

    let invoice = state.billing.draft_for(&agreement, &req, &auth.actor()).await?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

/// Void an invoice
#[utoipa::path(
    post,
    path = "/invoices/{id}/void",
    tag = "billing",
    operation_id = "postApiInvoicesVoid",
    params(("id" = String, Path, description = "Invoice ID")),
    responses(
        (status = 200, description = "Invoice voided", body = Invoice),
        (status = 400, description = "Invoice already paid", body = ErrorResponse),
        (status = 404, description = "Invoice not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn void_invoice(
    State(state): State<BillingState>,
    auth: Authenticated,
    Path(id): Path<String>,
) -> Result<Json<Invoice>, PlatformError> {
    let invoice = state
        .invoices
        .get_by_id(&id)
        .await?
        .ok_or_else(|| PlatformError::not_found("Invoice", &id))?;
    auth.require_access(&invoice.partner_code)?;

    Ok(Json(state.invoices.void(&id, &auth.actor()).await?))
}

pub fn billing_router(state: BillingState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(draft_invoice))
        .routes(routes!(void_invoice))
        .with_state(state)
}
