//! Invoice Entity

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::collection::Record;
use crate::shared::error::{PlatformError, Result};
use crate::storage::CollectionKey;

const NUMBER_PREFIX: &str = "INV-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
pub enum InvoiceStatus {
    #[default]
    Draft,
    Sent,
    Paid,
    Overdue,
    Void,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Usd,
    Eur,
    Gbp,
    Sgd,
    Inr,
    Idr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
    #[serde(default)]
    pub total: f64,
}

impl LineItem {
    pub fn new(description: impl Into<String>, quantity: f64, unit_price: f64) -> Self {
        Self {
            description: description.into(),
            quantity,
            unit_price,
            total: round_cents(quantity * unit_price),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    #[serde(default = "crate::shared::new_id")]
    pub id: String,
    #[serde(default)]
    pub invoice_number: String,
    pub partner_code: String,
    #[serde(default)]
    pub period_start: Option<NaiveDate>,
    #[serde(default)]
    pub period_end: Option<NaiveDate>,
    #[serde(default)]
    pub line_items: Vec<LineItem>,
    #[serde(default)]
    pub subtotal: f64,
    /// Percentage, e.g. 10 for 10%
    #[serde(default)]
    pub tax_rate: f64,
    #[serde(default)]
    pub tax_amount: f64,
    #[serde(default)]
    pub total_amount: f64,
    #[serde(default)]
    pub status: InvoiceStatus,
    #[serde(default)]
    pub currency: Currency,
    #[serde(default)]
    pub issued_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn number_sequence(invoice_number: &str) -> Option<u32> {
    invoice_number.strip_prefix(NUMBER_PREFIX)?.parse().ok()
}

/// Next free `INV-NNNNN` number. Numbers of deleted invoices are never reused
/// while a higher number is still held.
fn next_invoice_number(existing: &[Invoice]) -> String {
    let last = existing
        .iter()
        .filter_map(|i| number_sequence(&i.invoice_number))
        .max()
        .unwrap_or(0);
    format!("{}{:05}", NUMBER_PREFIX, last + 1)
}

impl Invoice {
    pub fn draft(partner_code: impl Into<String>, currency: Currency) -> Self {
        Self {
            id: crate::shared::new_id(),
            invoice_number: String::new(),
            partner_code: partner_code.into(),
            period_start: None,
            period_end: None,
            line_items: Vec::new(),
            subtotal: 0.0,
            tax_rate: 0.0,
            tax_amount: 0.0,
            total_amount: 0.0,
            status: InvoiceStatus::Draft,
            currency,
            issued_at: None,
            due_date: None,
            created_at: Utc::now(),
        }
    }

    /// Recompute line totals, subtotal, tax and total from the line items.
    ///
    /// An invoice without line items keeps its totals as given.
    pub fn recalculate(&mut self) {
        if self.line_items.is_empty() {
            return;
        }
        for item in self.line_items.iter_mut() {
            item.total = round_cents(item.quantity * item.unit_price);
        }
        self.subtotal = round_cents(self.line_items.iter().map(|i| i.total).sum());
        self.tax_amount = round_cents(self.subtotal * self.tax_rate / 100.0);
        self.total_amount = round_cents(self.subtotal + self.tax_amount);
    }
}

impl Record for Invoice {
    const COLLECTION: CollectionKey = CollectionKey::Invoices;
    const ENTITY_TYPE: &'static str = "Invoice";
    const TENANT_SCOPED: bool = true;

    fn id(&self) -> &str {
        &self.id
    }

    fn partner_code(&self) -> Option<&str> {
        Some(&self.partner_code)
    }

    fn before_insert(&mut self, existing: &[Self]) -> Result<()> {
        if self.invoice_number.is_empty() {
            self.invoice_number = next_invoice_number(existing);
        } else if existing.iter().any(|i| i.invoice_number == self.invoice_number) {
            return Err(PlatformError::duplicate("Invoice", "invoiceNumber", &self.invoice_number));
        }
        self.recalculate();
        Ok(())
    }

    fn before_replace(&mut self, previous: &Self) -> Result<()> {
        if self.invoice_number.is_empty() {
            self.invoice_number = previous.invoice_number.clone();
        } else if self.invoice_number != previous.invoice_number {
            return Err(PlatformError::validation("Invoice number cannot be changed"));
        }
        if previous.status == InvoiceStatus::Paid && self.status == InvoiceStatus::Void {
            return Err(PlatformError::validation("A paid invoice cannot be voided"));
        }
        self.recalculate();
        Ok(())
    }
}
