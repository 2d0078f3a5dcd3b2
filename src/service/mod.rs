//! service
//!
//! The metadata service: default entries, their overrides, and the audit
//! trail of every change.
//!
//! # Operations
//!
//! - [`MetadataService::list_defaults`] - default entries sorted by name
//! - [`MetadataService::create`] - create a default entry
//! - [`MetadataService::update`] - update a default entry by key
//! - [`MetadataService::delete`] - delete a default entry and its overrides
//! - [`MetadataService::find_default_by_key`] - direct lookup
//! - [`MetadataService::check_format`] - validate without committing
//!
//! # Invariants
//!
//! 1. No two default entries share a case-insensitive name
//! 2. Values are validated before any write; a failed check writes nothing
//! 3. DATE values are stored truncated to their first ten characters
//! 4. Every committed write is followed by exactly one audit event
//!
//! # Consistency
//!
//! Each operation runs reads then writes with no compare-and-swap. Two
//! racing creates with the same name can both pass the duplicate check;
//! the store's own uniqueness constraint decides, and its rejection comes
//! back as [`ServiceError::StorageFailure`].
//!
//! Cascade delete is not transactional. If deleting an override fails,
//! the default entry and any overrides already processed stay deleted
//! and audited, and the remaining overrides stay in place.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use metatier::audit::MemoryAuditSink;
//! use metatier::core::format::MetadataFormat;
//! use metatier::core::metadata::NewMetadata;
//! use metatier::service::MetadataService;
//! use metatier::store::MemoryMetadataStore;
//!
//! let service = MetadataService::new(
//!     Arc::new(MemoryMetadataStore::new()),
//!     Arc::new(MemoryAuditSink::new()),
//! );
//!
//! let created = service
//!     .create(NewMetadata::new("Release Date")
//!         .with_format(MetadataFormat::Date)
//!         .with_value("2024-05-01T10:00"))
//!     .unwrap();
//!
//! let found = service.find_default_by_key(&created.key).unwrap().unwrap();
//! assert_eq!(found.value.as_deref(), Some("2024-05-01"));
//! ```

mod error;

use std::sync::Arc;

use tracing::{debug, info, warn};

pub use error::{BackendError, ErrorKind, ServiceError};

use crate::audit::{AuditEvent, AuditSink};
use crate::core::format::{self, MetadataFormat};
use crate::core::metadata::{
    compare_names, MetadataEntry, MetadataStore, NewMetadata, StoreError, UpdateMetadata,
};
use crate::core::naming::{IdGenerator, SlugIdGenerator};
use crate::core::types::{MetadataKey, Scope, UtcTimestamp};

/// Orchestrates validation, uniqueness, cascade delete and auditing over a
/// [`MetadataStore`] and an [`AuditSink`].
#[derive(Clone)]
pub struct MetadataService {
    store: Arc<dyn MetadataStore>,
    audit: Arc<dyn AuditSink>,
    ids: Arc<dyn IdGenerator>,
}

impl std::fmt::Debug for MetadataService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataService").finish_non_exhaustive()
    }
}

impl MetadataService {
    /// Create a service using the slug key generator.
    pub fn new(store: Arc<dyn MetadataStore>, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            store,
            audit,
            ids: Arc::new(SlugIdGenerator),
        }
    }

    /// Replace the key generator.
    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    /// All default entries, sorted by name case-insensitively.
    ///
    /// # Errors
    ///
    /// [`ServiceError::StorageFailure`] if the store cannot be read.
    pub fn list_defaults(&self) -> Result<Vec<MetadataEntry>, ServiceError> {
        debug!("listing default metadata");
        let mut entries = self
            .store
            .find_by_scope(&Scope::Default)
            .map_err(|e| ServiceError::storage("failed to find all metadata", e))?;
        entries.sort_by(|a, b| compare_names(&a.name, &b.name));
        Ok(entries)
    }

    /// Create a default entry.
    ///
    /// The format falls back to STRING, the key is derived from the name,
    /// and both timestamps are set to now.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::DuplicateName`] if a default entry has the same
    ///   name, ignoring case
    /// - [`ServiceError::Format`] if the value does not match the format
    /// - [`ServiceError::StorageFailure`] if the store or audit sink fails
    pub fn create(&self, request: NewMetadata) -> Result<MetadataEntry, ServiceError> {
        let format = request.format_or_default();
        let failed = || format!("failed to create metadata {}", request.name);

        let existing = self
            .store
            .find_by_scope(&Scope::Default)
            .map_err(|e| ServiceError::storage(failed(), e))?;
        if let Some(dup) = existing.iter().find(|e| e.has_name(&request.name)) {
            return Err(ServiceError::DuplicateName {
                name: dup.name.clone(),
            });
        }

        format::check_format(format, request.value.as_deref())?;

        let key = self
            .ids
            .generate(&request.name)
            .map_err(|e| ServiceError::storage(failed(), e))?;
        let now = UtcTimestamp::now();
        let entry = MetadataEntry {
            key,
            name: request.name.clone(),
            value: format::normalize_value(format, request.value.clone()),
            format,
            scope: Scope::Default,
            created_at: Some(now.clone()),
            updated_at: Some(now.clone()),
        };

        self.store
            .create(&entry)
            .map_err(|e| ServiceError::storage(failed(), e))?;
        self.audit
            .record_global(AuditEvent::created(&entry, now))
            .map_err(|e| ServiceError::storage(failed(), e))?;

        info!(key = %entry.key, name = %entry.name, format = %entry.format, "created metadata");
        Ok(entry)
    }

    /// Update a default entry identified by key.
    ///
    /// The prior entry is not read back: `created_at` is not carried
    /// forward and the audit event has no before-state.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::DuplicateName`] if another default entry has the
    ///   same name, ignoring case
    /// - [`ServiceError::Format`] if the value does not match the format
    /// - [`ServiceError::StorageFailure`] if the store or audit sink fails,
    ///   including when no entry exists for the key
    pub fn update(&self, request: UpdateMetadata) -> Result<MetadataEntry, ServiceError> {
        let failed = || format!("failed to update metadata {}", request.name);

        let existing = self
            .store
            .find_by_scope(&Scope::Default)
            .map_err(|e| ServiceError::storage(failed(), e))?;
        if let Some(dup) = existing
            .iter()
            .find(|e| e.key != request.key && e.has_name(&request.name))
        {
            return Err(ServiceError::DuplicateName {
                name: dup.name.clone(),
            });
        }

        format::check_format(request.format, request.value.as_deref())?;

        let now = UtcTimestamp::now();
        let entry = MetadataEntry {
            key: request.key.clone(),
            name: request.name.clone(),
            value: format::normalize_value(request.format, request.value.clone()),
            format: request.format,
            scope: Scope::Default,
            created_at: None,
            updated_at: Some(now.clone()),
        };

        self.store
            .update(&entry)
            .map_err(|e| ServiceError::storage(failed(), e))?;
        self.audit
            .record_global(AuditEvent::updated(None, &entry, now))
            .map_err(|e| ServiceError::storage(failed(), e))?;

        info!(key = %entry.key, name = %entry.name, "updated metadata");
        Ok(entry)
    }

    /// Delete a default entry and every override sharing its key.
    ///
    /// Deleting a key with no default entry does nothing and records
    /// nothing.
    ///
    /// # Errors
    ///
    /// [`ServiceError::StorageFailure`] if any read, delete or audit write
    /// fails. Work done before the failure is not undone.
    pub fn delete(&self, key: &MetadataKey) -> Result<(), ServiceError> {
        let failed = || format!("failed to delete metadata {}", key);

        let default = match self
            .store
            .find_by_key_and_scope(key, &Scope::Default)
            .map_err(|e| ServiceError::storage(failed(), e))?
        {
            Some(entry) => entry,
            None => {
                debug!(key = %key, "no default metadata to delete");
                return Ok(());
            }
        };

        self.store
            .delete(key, &Scope::Default)
            .map_err(|e| ServiceError::storage(failed(), e))?;
        self.audit
            .record_global(AuditEvent::deleted(&default, UtcTimestamp::now()))
            .map_err(|e| ServiceError::storage(failed(), e))?;
        info!(key = %key, "deleted default metadata");

        let overrides = self
            .store
            .find_overrides_of(key)
            .map_err(|e| ServiceError::storage(failed(), e))?;

        for (done, entry) in overrides.iter().enumerate() {
            if let Err(e) = self.delete_override(entry) {
                warn!(
                    key = %key,
                    deleted = done,
                    remaining = overrides.len() - done,
                    "cascade delete stopped partway"
                );
                return Err(e);
            }
        }

        Ok(())
    }

    fn delete_override(&self, entry: &MetadataEntry) -> Result<(), ServiceError> {
        let failed = || format!("failed to delete metadata {} ({})", entry.key, entry.scope);

        let resource = match entry.scope.resource_id() {
            Some(id) => id,
            None => {
                warn!(key = %entry.key, "store returned a default entry as an override");
                return Err(ServiceError::storage(
                    failed(),
                    StoreError::ReadError(format!(
                        "override lookup for {} returned a {} entry",
                        entry.key, entry.scope
                    )),
                ));
            }
        };

        self.store
            .delete(&entry.key, &entry.scope)
            .map_err(|e| ServiceError::storage(failed(), e))?;
        self.audit
            .record_for_resource(resource, AuditEvent::deleted(entry, UtcTimestamp::now()))
            .map_err(|e| ServiceError::storage(failed(), e))?;

        debug!(key = %entry.key, resource = %resource, "deleted override");
        Ok(())
    }

    /// Look up a default entry by key. Absence is not an error.
    ///
    /// # Errors
    ///
    /// [`ServiceError::StorageFailure`] if the store cannot be read.
    pub fn find_default_by_key(
        &self,
        key: &MetadataKey,
    ) -> Result<Option<MetadataEntry>, ServiceError> {
        debug!(key = %key, "finding default metadata");
        self.store
            .find_by_key_and_scope(key, &Scope::Default)
            .map_err(|e| ServiceError::storage("failed to find default metadata by key", e))
    }

    /// Validate a value against a format without touching storage.
    ///
    /// # Errors
    ///
    /// [`ServiceError::Format`] if the value does not match the format.
    pub fn check_format(
        &self,
        format: MetadataFormat,
        value: Option<&str>,
    ) -> Result<(), ServiceError> {
        format::check_format(format, value).map_err(|e| {
            debug!(format = %e.format, value = %e.value, "value rejected");
            ServiceError::from(e)
        })
    }
}
