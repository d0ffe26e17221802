//! Capability-based authorization
//!
//! There are no sessions or accounts: every request carries its own signed
//! grant, checked by `access::validate_access`.

pub mod access;

pub use access::{validate_access, AccessDenied, AccessQuery, ValidatedAccess};
