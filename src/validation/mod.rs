//! Four-level validation of preparation configs.
//!
//! Findings are returned as data and never abort the caller. Nothing here
//! writes to disk.

pub mod result;
pub mod validator;

pub use result::{ValidationIssue, ValidationLevel, ValidationResult};
pub use validator::Validator;
