//! Invoice Aggregate

pub mod entity;
pub mod repository;
pub mod billing;
pub mod api;

pub use entity::{Currency, Invoice, InvoiceStatus, LineItem};
pub use repository::InvoiceRepository;
pub use billing::{BillingService, DraftInvoiceRequest};
pub use api::{billing_router, BillingState};
