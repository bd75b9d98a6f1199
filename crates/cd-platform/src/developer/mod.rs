//! Developer Aggregate
//!
//! Certification records per developer, scoped by partner code.

pub mod entity;
pub mod repository;
pub mod api;

pub use entity::{DeveloperRecord, Grade};
pub use repository::{DeveloperRepository, DuplicateWallet};
pub use api::{developers_router, DevelopersState};
