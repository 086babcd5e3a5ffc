//! Audit event domain types.

pub mod model;

pub use model::{AuditAction, AuditEvent};
