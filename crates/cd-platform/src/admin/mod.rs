//! Admin User Aggregate

pub mod entity;
pub mod repository;

pub use entity::{AdminRole, AdminStatus, AdminUser};
pub use repository::AdminRepository;
