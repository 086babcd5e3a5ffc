//! Audit event sinks.

pub mod sink;

pub use sink::{AuditSink, MemoryAuditSink, TracingAuditSink};
