//! audit
//!
//! Audit trail abstraction for metadata mutations.
//!
//! # Architecture
//!
//! Events are written through the [`AuditSink`] trait, which has two
//! implementations:
//!
//! - [`MemoryAuditSink`]: in-process list (default)
//! - [`JournalAuditSink`]: append-only JSON Lines file with fsync per record
//!
//! Querying and retention of audit records belong to whoever owns the
//! trail; this crate only writes them.
//!
//! # Provider Selection
//!
//! ```
//! use metatier::audit::create_sink;
//!
//! let sink = create_sink("memory", None).unwrap();
//! assert!(create_sink("syslog", None).is_err());
//! ```

mod journal;
mod memory;
mod traits;

use std::path::Path;
use std::sync::Arc;

#[cfg(any(test, feature = "fault_injection"))]
pub use journal::fault_injection;
pub use journal::{AuditRecord, JournalAuditSink};
pub use memory::MemoryAuditSink;
pub use traits::{AuditError, AuditEvent, AuditEventKind, AuditSink, AuditTrail};

/// The default audit provider name.
pub const DEFAULT_PROVIDER: &str = "memory";

/// Valid audit provider names.
pub const PROVIDERS: [&str; 2] = ["memory", "journal"];

/// Create an audit sink based on the provider name.
///
/// `path` is only used by the `journal` provider; when absent the journal
/// uses its default location.
///
/// # Errors
///
/// - Unknown provider name
/// - Initialization errors from the sink
pub fn create_sink(provider: &str, path: Option<&Path>) -> Result<Arc<dyn AuditSink>, AuditError> {
    match provider {
        "memory" => Ok(Arc::new(MemoryAuditSink::new())),
        "journal" => match path {
            Some(path) => Ok(Arc::new(JournalAuditSink::with_path(path.to_path_buf()))),
            None => Ok(Arc::new(JournalAuditSink::new()?)),
        },
        other => Err(AuditError::ProviderNotAvailable(format!(
            "unknown audit provider: '{}' (valid: {})",
            other,
            PROVIDERS.join(", ")
        ))),
    }
}
