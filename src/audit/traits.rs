//! audit::traits
//!
//! Audit sink trait and event types.
//!
//! # Design
//!
//! Every committed mutation produces one [`AuditEvent`] carrying the state
//! before and after the change. Events land either in the global trail
//! or in the trail of the resource that owned the changed entry.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::metadata::MetadataEntry;
use crate::core::types::{MetadataKey, ResourceId, UtcTimestamp};

/// Errors from audit sink operations.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Failed to write the audit record.
    #[error("failed to write audit record: {0}")]
    WriteError(String),

    /// Failed to read audit records back.
    #[error("failed to read audit records: {0}")]
    ReadError(String),

    /// Sink not available or not configured.
    #[error("audit sink not available: {0}")]
    ProviderNotAvailable(String),
}

/// What happened to the subject entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditEventKind {
    MetadataCreated,
    MetadataUpdated,
    MetadataDeleted,
}

impl std::fmt::Display for AuditEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AuditEventKind::MetadataCreated => "METADATA_CREATED",
            AuditEventKind::MetadataUpdated => "METADATA_UPDATED",
            AuditEventKind::MetadataDeleted => "METADATA_DELETED",
        };
        f.write_str(s)
    }
}

/// A single audit event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Key of the entry the event is about.
    pub subject_key: MetadataKey,
    pub kind: AuditEventKind,
    pub timestamp: UtcTimestamp,
    /// State before the change, `None` for creations.
    pub before: Option<MetadataEntry>,
    /// State after the change, `None` for deletions.
    pub after: Option<MetadataEntry>,
}

impl AuditEvent {
    pub fn created(entry: &MetadataEntry, timestamp: UtcTimestamp) -> Self {
        Self {
            subject_key: entry.key.clone(),
            kind: AuditEventKind::MetadataCreated,
            timestamp,
            before: None,
            after: Some(entry.clone()),
        }
    }

    pub fn updated(
        before: Option<MetadataEntry>,
        after: &MetadataEntry,
        timestamp: UtcTimestamp,
    ) -> Self {
        Self {
            subject_key: after.key.clone(),
            kind: AuditEventKind::MetadataUpdated,
            timestamp,
            before,
            after: Some(after.clone()),
        }
    }

    pub fn deleted(entry: &MetadataEntry, timestamp: UtcTimestamp) -> Self {
        Self {
            subject_key: entry.key.clone(),
            kind: AuditEventKind::MetadataDeleted,
            timestamp,
            before: Some(entry.clone()),
            after: None,
        }
    }
}

/// Which audit trail an event belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "trail", content = "resource_id", rename_all = "snake_case")]
pub enum AuditTrail {
    Global,
    Resource(ResourceId),
}

/// Trait for audit sinks.
///
/// Implementations must be thread-safe (Send + Sync). A record is
/// considered durable once the call returns `Ok`.
pub trait AuditSink: Send + Sync {
    /// Record an event in the global trail.
    fn record_global(&self, event: AuditEvent) -> Result<(), AuditError>;

    /// Record an event in a resource's trail.
    fn record_for_resource(
        &self,
        resource_id: &ResourceId,
        event: AuditEvent,
    ) -> Result<(), AuditError>;
}
