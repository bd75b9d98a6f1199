//! CertDash Common
//!
//! Utilities shared by every CertDash crate and binary.

pub mod logging;

pub use logging::{init_logging, init_default_logging};
