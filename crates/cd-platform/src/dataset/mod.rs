//! Dataset Version Aggregate
//!
//! Snapshots of uploaded developer datasets. Only the most recent versions
//! are retained.

pub mod entity;
pub mod store;
pub mod api;

pub use entity::DatasetVersion;
pub use store::{VersionStore, MAX_VERSIONS};
pub use api::{datasets_router, DatasetsState};
