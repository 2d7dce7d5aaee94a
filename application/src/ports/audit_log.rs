//! Port for the structured audit journal.
//!
//! Defines the [`AuditLog`] trait for recording reasoning traces, consensus
//! results and decisions in a machine-readable format (JSONL).
//!
//! This is separate from `tracing`-based operation logs: tracing handles
//! human-readable diagnostics, while this port captures the audit trail of
//! every decision.

use serde_json::Value;

/// A structured audit event.
pub struct AuditEvent {
    /// Event type identifier (e.g. "reasoning_trace", "consensus_result").
    pub event_type: &'static str,
    /// JSON payload with event-specific data.
    pub payload: Value,
}

impl AuditEvent {
    pub fn new(event_type: &'static str, payload: Value) -> Self {
        Self {
            event_type,
            payload,
        }
    }

    /// Serialize `value` as the payload; unserializable values become `null`.
    pub fn from_serializable(event_type: &'static str, value: &impl serde::Serialize) -> Self {
        Self::new(event_type, serde_json::to_value(value).unwrap_or(Value::Null))
    }
}

/// Port for logging audit events.
///
/// `log` is synchronous and non-fallible so it can never disrupt a cycle;
/// write failures are ignored by implementations.
pub trait AuditLog: Send + Sync {
    fn log(&self, event: AuditEvent);
}

/// No-op implementation for tests and when auditing is disabled.
pub struct NoAuditLog;

impl AuditLog for NoAuditLog {
    fn log(&self, _event: AuditEvent) {}
}
