//! API Gateway
//!
//! The single `/api/data` entry point. Requests name an entity type and are
//! dispatched to the matching repository after authentication, field-name
//! validation and partner-scope checks.

pub mod entity_type;
pub mod access;
pub mod api;

pub use entity_type::EntityType;
pub use api::{gateway_router, GatewayState};
