//! Community Agreement Aggregate

pub mod entity;
pub mod repository;

pub use entity::{BillingCycle, CommunityAgreement, PaymentModel};
pub use repository::AgreementRepository;
