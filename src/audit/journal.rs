//! audit::journal
//!
//! Append-only audit journal on disk.
//!
//! # Durability Contract
//!
//! Every `record_*` call appends one JSON line and fsyncs the file before
//! returning. A crash leaves the journal holding every record whose call
//! returned `Ok`; a torn trailing line is skipped when reading back.
//!
//! # Format
//!
//! One [`AuditRecord`] per line (JSON Lines):
//!
//! ```text
//! {"id":"4f0c...","trail":{"trail":"global"},"event":{...}}
//! {"id":"9a1e...","trail":{"trail":"resource","resource_id":"api-1"},"event":{...}}
//! ```
//!
//! # Example
//!
//! ```ignore
//! use metatier::audit::{AuditSink, JournalAuditSink};
//!
//! let sink = JournalAuditSink::with_path("/var/lib/metatier/audit.jsonl".into());
//! sink.record_global(event)?;
//! for record in sink.read_all()? {
//!     println!("{} {}", record.id, record.event.kind);
//! }
//! ```

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::traits::{AuditError, AuditEvent, AuditSink, AuditTrail};
use crate::core::types::ResourceId;

/// A journaled audit event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Unique record id (UUID v4).
    pub id: String,
    pub trail: AuditTrail,
    pub event: AuditEvent,
}

/// Append-only JSON Lines audit sink.
#[derive(Debug, Clone)]
pub struct JournalAuditSink {
    path: PathBuf,
}

impl JournalAuditSink {
    /// Create a journal sink at the default location.
    ///
    /// The default location is `~/.metatier/audit.jsonl`.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn new() -> Result<Self, AuditError> {
        let home = dirs::home_dir()
            .ok_or_else(|| AuditError::WriteError("cannot determine home directory".into()))?;
        Ok(Self::with_path(home.join(".metatier").join("audit.jsonl")))
    }

    /// Create a journal sink at a custom path.
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    /// Get the path to the journal file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, trail: AuditTrail, event: AuditEvent) -> Result<(), AuditError> {
        #[cfg(any(test, feature = "fault_injection"))]
        if fault_injection::should_fail() {
            return Err(AuditError::WriteError(
                "simulated failure for fault injection testing".into(),
            ));
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| AuditError::WriteError(format!("cannot create directory: {}", e)))?;
        }

        let record = AuditRecord {
            id: Uuid::new_v4().to_string(),
            trail,
            event,
        };
        let mut line = serde_json::to_string(&record)
            .map_err(|e| AuditError::WriteError(format!("cannot serialize record: {}", e)))?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| AuditError::WriteError(format!("cannot open journal: {}", e)))?;

        file.write_all(line.as_bytes())
            .map_err(|e| AuditError::WriteError(format!("cannot append record: {}", e)))?;
        file.sync_all()
            .map_err(|e| AuditError::WriteError(format!("cannot sync to disk: {}", e)))?;

        Ok(())
    }

    /// Read every complete record, oldest first.
    ///
    /// A missing journal reads as empty. An unparseable final line is
    /// treated as a torn write and skipped; an unparseable line anywhere
    /// else is an error.
    pub fn read_all(&self) -> Result<Vec<AuditRecord>, AuditError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path)
            .map_err(|e| AuditError::ReadError(format!("cannot read journal: {}", e)))?;

        let lines: Vec<&str> = content.lines().filter(|l| !l.trim().is_empty()).collect();
        let mut records: Vec<AuditRecord> = Vec::with_capacity(lines.len());
        for (i, line) in lines.iter().enumerate() {
            match serde_json::from_str(line) {
                Ok(record) => records.push(record),
                Err(_) if i + 1 == lines.len() && !content.ends_with('\n') => {
                    tracing::warn!(path = %self.path.display(), "skipping torn audit record");
                }
                Err(e) => {
                    return Err(AuditError::ReadError(format!(
                        "invalid record on line {}: {}",
                        i + 1,
                        e
                    )));
                }
            }
        }
        Ok(records)
    }

    /// Records in one trail, oldest first.
    pub fn read_trail(&self, trail: &AuditTrail) -> Result<Vec<AuditRecord>, AuditError> {
        Ok(self
            .read_all()?
            .into_iter()
            .filter(|r| &r.trail == trail)
            .collect())
    }
}

impl AuditSink for JournalAuditSink {
    fn record_global(&self, event: AuditEvent) -> Result<(), AuditError> {
        self.append(AuditTrail::Global, event)
    }

    fn record_for_resource(
        &self,
        resource_id: &ResourceId,
        event: AuditEvent,
    ) -> Result<(), AuditError> {
        self.append(AuditTrail::Resource(resource_id.clone()), event)
    }
}

/// Fault injection for testing append failures.
///
/// Only available in test builds or with the `fault_injection` feature.
#[cfg(any(test, feature = "fault_injection"))]
pub mod fault_injection {
    use std::cell::Cell;

    // Thread-local so parallel tests do not interfere.
    thread_local! {
        /// Fail on the n-th append. 0 disables.
        static FAIL_ON_APPEND: Cell<usize> = const { Cell::new(0) };

        static APPEND_COUNT: Cell<usize> = const { Cell::new(0) };
    }

    /// Fail the `n`-th append from now on (1-based). 0 disables.
    pub fn set_fail_on(n: usize) {
        FAIL_ON_APPEND.with(|c| c.set(n));
        APPEND_COUNT.with(|c| c.set(0));
    }

    /// Check if the current append should fail.
    pub fn should_fail() -> bool {
        FAIL_ON_APPEND.with(|threshold_cell| {
            let threshold = threshold_cell.get();
            if threshold == 0 {
                return false;
            }
            APPEND_COUNT.with(|count_cell| {
                let count = count_cell.get() + 1;
                count_cell.set(count);
                count == threshold
            })
        })
    }

    /// Reset fault injection state.
    pub fn reset() {
        FAIL_ON_APPEND.with(|c| c.set(0));
        APPEND_COUNT.with(|c| c.set(0));
    }
}
