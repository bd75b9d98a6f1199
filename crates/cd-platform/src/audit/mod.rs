//! Audit Log Aggregate
//!
//! Capped, newest-first record of actions taken through the platform.

pub mod entity;
pub mod service;
pub mod api;

pub use entity::{Actor, AuditAction, AuditLogEntry, AuditQuery, NewAuditEntry};
pub use service::AuditService;
pub use api::{audit_logs_router, AuditLogsState};
