//! # extensa-auth
//!
//! Graded, per-entity authorization for Extensa.
//!
//! ## Modules
//!
//! - `acl`: the permission engine with checks, grants, revocations, listings,
//!   and extension-scoped checks that consult the extension registry
//! - `audit`: the audit sink collaborator interface and its default
//!   implementations

pub mod acl;
pub mod audit;

pub use acl::PermissionEngine;
pub use audit::{AuditSink, MemoryAuditSink, TracingAuditSink};
