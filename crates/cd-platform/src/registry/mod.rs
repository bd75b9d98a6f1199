//! Community Registry Aggregate
//!
//! The canonical list of partner codes. Other aggregates only consult it
//! (a missing code is logged, never rejected).

pub mod entity;
pub mod repository;

pub use entity::CommunityMasterRecord;
pub use repository::{is_registered, RegistryRepository};
