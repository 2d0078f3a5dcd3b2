//! core::metadata::store
//!
//! Storage contract for metadata entries.
//!
//! # Design
//!
//! The `MetadataStore` trait is the persistence seam of the crate. The
//! service issues a strict sequence of reads then writes and treats each
//! call as atomic; it adds no compare-and-swap of its own. Locking,
//! transactions and uniqueness constraints belong to the implementation.
//!
//! Implementations live in [`crate::store`].
//!
//! # Example
//!
//! ```ignore
//! use metatier::core::metadata::{MetadataStore, StoreError};
//! use metatier::core::types::Scope;
//!
//! fn count_defaults(store: &dyn MetadataStore) -> Result<usize, StoreError> {
//!     Ok(store.find_by_scope(&Scope::Default)?.len())
//! }
//! ```

use thiserror::Error;

use super::schema::MetadataEntry;
use crate::core::types::{MetadataKey, Scope};

/// Errors from metadata storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No entry exists for the key in that scope.
    #[error("metadata not found: {key} ({scope})")]
    NotFound { key: String, scope: String },

    /// An entry already exists for the key in that scope.
    #[error("metadata already exists: {key} ({scope})")]
    AlreadyExists { key: String, scope: String },

    /// Failed to read from the backing storage.
    #[error("failed to read metadata: {0}")]
    ReadError(String),

    /// Failed to write to the backing storage.
    #[error("failed to write metadata: {0}")]
    WriteError(String),

    /// Could not lock the backing storage.
    #[error("metadata storage is locked: {0}")]
    Locked(String),

    /// Provider not available or not configured.
    #[error("metadata store provider not available: {0}")]
    ProviderNotAvailable(String),
}

impl StoreError {
    pub(crate) fn not_found(key: &MetadataKey, scope: &Scope) -> Self {
        StoreError::NotFound {
            key: key.to_string(),
            scope: scope.to_string(),
        }
    }

    pub(crate) fn already_exists(key: &MetadataKey, scope: &Scope) -> Self {
        StoreError::AlreadyExists {
            key: key.to_string(),
            scope: scope.to_string(),
        }
    }
}

/// Persistence contract required by the metadata service.
///
/// Implementations must be thread-safe (Send + Sync).
pub trait MetadataStore: Send + Sync {
    /// All entries in a scope, in no particular order.
    fn find_by_scope(&self, scope: &Scope) -> Result<Vec<MetadataEntry>, StoreError>;

    /// The entry for `key` in `scope`, if any.
    fn find_by_key_and_scope(
        &self,
        key: &MetadataKey,
        scope: &Scope,
    ) -> Result<Option<MetadataEntry>, StoreError>;

    /// Every resource-scoped entry sharing `key`.
    fn find_overrides_of(&self, key: &MetadataKey) -> Result<Vec<MetadataEntry>, StoreError>;

    /// Persist a new entry.
    ///
    /// Implementations may reject an existing `(key, scope)` with
    /// [`StoreError::AlreadyExists`].
    fn create(&self, entry: &MetadataEntry) -> Result<(), StoreError>;

    /// Replace the stored entry with the same `(key, scope)`.
    ///
    /// Fails with [`StoreError::NotFound`] when there is nothing to replace.
    fn update(&self, entry: &MetadataEntry) -> Result<(), StoreError>;

    /// Remove the entry for `key` in `scope`.
    ///
    /// Returns `Ok(())` even if the entry did not exist.
    fn delete(&self, key: &MetadataKey, scope: &Scope) -> Result<(), StoreError>;
}
