//! Audit sink trait and implementations.

use std::sync::{Arc, Mutex};

use tracing::info;

use extensa_entity::audit::{AuditAction, AuditEvent};

/// Side-effect sink for audit events.
///
/// Recording is infallible from the caller's point of view; a sink that
/// persists events handles its own failures.
pub trait AuditSink: Send + Sync + std::fmt::Debug {
    /// Record an event.
    fn record(&self, event: AuditEvent);
}

/// Emits audit events as structured `tracing` events on the `audit` target.
#[derive(Debug, Clone, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: AuditEvent) {
        info!(
            target: "audit",
            action = %event.action,
            actor_id = %event.actor_id,
            target_type = %event.target_type,
            target_id = %event.target_id,
            details = %event.details,
            "Audit event"
        );
    }
}

/// Keeps audit events in memory for inspection.
#[derive(Debug, Clone, Default)]
pub struct MemoryAuditSink {
    events: Arc<Mutex<Vec<AuditEvent>>>,
}

impl MemoryAuditSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a copy of every recorded event.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Return the recorded actions in order.
    pub fn actions(&self) -> Vec<AuditAction> {
        self.events().into_iter().map(|e| e.action).collect()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, event: AuditEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
