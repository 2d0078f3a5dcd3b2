//! audit::memory
//!
//! In-memory audit sink.
//!
//! Records are kept in arrival order behind an `Arc<Mutex<...>>`, so a
//! clone handed to the service and a clone kept by the caller see the same
//! trail.

use std::sync::{Arc, Mutex};

use super::traits::{AuditError, AuditEvent, AuditSink, AuditTrail};
use crate::core::types::ResourceId;

/// In-memory audit sink.
#[derive(Debug, Clone, Default)]
pub struct MemoryAuditSink {
    inner: Arc<Mutex<MemorySinkInner>>,
}

#[derive(Debug, Default)]
struct MemorySinkInner {
    records: Vec<(AuditTrail, AuditEvent)>,
    fail_after: Option<usize>,
}

impl MemoryAuditSink {
    /// Create a new empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `n` records, then fail every later one.
    pub fn fail_after(self, n: usize) -> Self {
        if let Ok(mut inner) = self.inner.lock() {
            inner.fail_after = Some(n);
        }
        self
    }

    /// All records, oldest first.
    pub fn records(&self) -> Vec<(AuditTrail, AuditEvent)> {
        self.inner
            .lock()
            .map(|inner| inner.records.clone())
            .unwrap_or_default()
    }

    /// Records in one trail, oldest first.
    pub fn records_in(&self, trail: &AuditTrail) -> Vec<AuditEvent> {
        self.records()
            .into_iter()
            .filter(|(t, _)| t == trail)
            .map(|(_, event)| event)
            .collect()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.inner.lock().map(|i| i.records.len()).unwrap_or(0)
    }

    /// Check if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&self, trail: AuditTrail, event: AuditEvent) -> Result<(), AuditError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| AuditError::WriteError("memory sink mutex poisoned".into()))?;

        if let Some(limit) = inner.fail_after {
            if inner.records.len() >= limit {
                return Err(AuditError::WriteError("injected audit failure".into()));
            }
        }
        inner.records.push((trail, event));
        Ok(())
    }
}

impl AuditSink for MemoryAuditSink {
    fn record_global(&self, event: AuditEvent) -> Result<(), AuditError> {
        self.push(AuditTrail::Global, event)
    }

    fn record_for_resource(
        &self,
        resource_id: &ResourceId,
        event: AuditEvent,
    ) -> Result<(), AuditError> {
        self.push(AuditTrail::Resource(resource_id.clone()), event)
    }
}
