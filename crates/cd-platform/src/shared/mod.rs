//! Shared Module
//!
//! Cross-cutting concerns and shared utilities.

pub mod error;
pub mod middleware;
pub mod validation;
pub mod health_api;

pub use error::{PlatformError, Result};
pub use middleware::{AuthLayer, AuthState, Authenticated};

/// Generate an id for a record the client did not name
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
