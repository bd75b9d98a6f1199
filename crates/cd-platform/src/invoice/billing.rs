//! Billing Service
//!
//! Drafts invoices from an agreement's payment model. `Per_Certification`
//! bills every developer of the partner who reached `Pass` within the period;
//! `Fixed_Recurring` bills the agreed flat amount.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::Deserialize;
use tracing::info;
use utoipa::ToSchema;

use super::entity::{Invoice, LineItem};
use super::repository::InvoiceRepository;
use crate::agreement::{AgreementRepository, CommunityAgreement, PaymentModel};
use crate::audit::Actor;
use crate::developer::DeveloperRepository;
use crate::shared::error::{PlatformError, Result};

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DraftInvoiceRequest {
    pub agreement_id: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    /// Percentage, defaults to 0
    #[serde(default)]
    pub tax_rate: f64,
}

#[derive(Clone)]
pub struct BillingService {
    agreements: AgreementRepository,
    developers: DeveloperRepository,
    invoices: InvoiceRepository,
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    start_of_day(date) + Duration::days(1) - Duration::milliseconds(1)
}

impl BillingService {
    pub fn new(agreements: AgreementRepository, developers: DeveloperRepository, invoices: InvoiceRepository) -> Self {
        Self {
            agreements,
            developers,
            invoices,
        }
    }

    pub async fn draft_invoice(&self, request: &DraftInvoiceRequest, actor: &Actor) -> Result<Invoice> {
        let agreement = self
            .agreements
            .get_by_id(&request.agreement_id)
            .await?
            .ok_or_else(|| PlatformError::not_found("Agreement", &request.agreement_id))?;
        self.draft_for(&agreement, request, actor).await
    }

    /// Build and store a `Draft` invoice for an already loaded agreement
    pub async fn draft_for(
        &self,
        agreement: &CommunityAgreement,
        request: &DraftInvoiceRequest,
        actor: &Actor,
    ) -> Result<Invoice> {
        if request.period_end < request.period_start {
            return Err(PlatformError::validation("periodEnd is before periodStart"));
        }
        if !(0.0..=100.0).contains(&request.tax_rate) {
            return Err(PlatformError::validation("taxRate must be between 0 and 100"));
        }
        if !agreement.is_active {
            return Err(PlatformError::validation(format!("Agreement {} is not active", agreement.id)));
        }

        let line = match agreement.payment_model {
            PaymentModel::PerCertification => {
                let passed = self
                    .developers
                    .passed_in_period(
                        &agreement.partner_code,
                        start_of_day(request.period_start),
                        end_of_day(request.period_end),
                    )
                    .await?;
                LineItem::new(
                    format!("Certifications {} to {}", request.period_start, request.period_end),
                    passed.len() as f64,
                    agreement.unit_price,
                )
            }
            PaymentModel::FixedRecurring => LineItem::new(
                format!("{:?} fee {} to {}", agreement.billing_cycle, request.period_start, request.period_end),
                1.0,
                agreement.fixed_amount,
            ),
        };

        let mut invoice = Invoice::draft(&agreement.partner_code, agreement.currency);
        invoice.period_start = Some(request.period_start);
        invoice.period_end = Some(request.period_end);
        invoice.tax_rate = request.tax_rate;
        invoice.line_items = vec![line];
        invoice.due_date = Some(request.period_end + Duration::days(agreement.payment_terms_days()));
        invoice.recalculate();

        let invoice = self.invoices.create(invoice, actor).await?;
        info!(
            invoice_id = %invoice.id,
            partner_code = %invoice.partner_code,
            total = invoice.total_amount,
            "Draft invoice created"
        );
        Ok(invoice)
    }
}
