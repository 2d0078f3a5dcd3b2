//! store::memory
//!
//! In-memory metadata store.
//!
//! # Design
//!
//! Entries live in a map keyed by `(key, scope)` behind an
//! `Arc<Mutex<...>>`, so clones share state. Callers hand one clone to the
//! service and keep another to inspect what happened. Failure scenarios
//! can be configured per operation. Calls are only recorded on a store
//! built with [`MemoryMetadataStore::recording`], so a long-lived default
//! store does not accumulate history.
//!
//! # Example
//!
//! ```
//! use metatier::core::metadata::MetadataStore;
//! use metatier::core::types::Scope;
//! use metatier::store::{FailOn, MemoryMetadataStore};
//!
//! let store = MemoryMetadataStore::new();
//! assert!(store.find_by_scope(&Scope::Default).unwrap().is_empty());
//!
//! let failing = MemoryMetadataStore::new().fail_on(FailOn::FindByScope);
//! assert!(failing.find_by_scope(&Scope::Default).is_err());
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::core::metadata::{MetadataEntry, MetadataStore, StoreError};
use crate::core::types::{MetadataKey, Scope};

/// In-memory metadata store.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping.
#[derive(Debug, Clone, Default)]
pub struct MemoryMetadataStore {
    inner: Arc<Mutex<MemoryStoreInner>>,
}

#[derive(Debug, Default)]
struct MemoryStoreInner {
    entries: HashMap<(MetadataKey, Scope), MetadataEntry>,
    fail_on: Option<FailOn>,
    deletes_served: usize,
    recording: bool,
    operations: Vec<StoreOperation>,
}

/// Configuration for which operation should fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailOn {
    FindByScope,
    FindByKeyAndScope,
    FindOverridesOf,
    Create,
    Update,
    /// Fail every delete.
    Delete,
    /// Fail only the n-th delete call (1-based); earlier and later ones succeed.
    NthDelete(usize),
}

/// Recorded operation for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOperation {
    FindByScope { scope: Scope },
    FindByKeyAndScope { key: MetadataKey, scope: Scope },
    FindOverridesOf { key: MetadataKey },
    Create { key: MetadataKey, scope: Scope },
    Update { key: MetadataKey, scope: Scope },
    Delete { key: MetadataKey, scope: Scope },
}

impl StoreOperation {
    /// Check if this operation mutates the store.
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            StoreOperation::Create { .. }
                | StoreOperation::Update { .. }
                | StoreOperation::Delete { .. }
        )
    }
}

fn injected(op: &str) -> StoreError {
    match op {
        "create" | "update" | "delete" => StoreError::WriteError(format!("injected {} failure", op)),
        _ => StoreError::ReadError(format!("injected {} failure", op)),
    }
}

impl MemoryMetadataStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with entries.
    ///
    /// Seeding is not recorded as operations.
    pub fn with_entries(entries: impl IntoIterator<Item = MetadataEntry>) -> Self {
        let store = Self::new();
        if let Ok(mut inner) = store.inner.lock() {
            for entry in entries {
                inner
                    .entries
                    .insert((entry.key.clone(), entry.scope.clone()), entry);
            }
        }
        store
    }

    /// Configure the store to fail on a specific operation.
    pub fn fail_on(self, fail_on: FailOn) -> Self {
        if let Ok(mut inner) = self.inner.lock() {
            inner.fail_on = Some(fail_on);
        }
        self
    }

    /// Record every call served from now on, see [`Self::operations`].
    pub fn recording(self) -> Self {
        if let Ok(mut inner) = self.inner.lock() {
            inner.recording = true;
        }
        self
    }

    /// Clear the failure configuration.
    pub fn clear_fail_on(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.fail_on = None;
        }
    }

    /// All recorded operations, oldest first. Empty unless recording.
    pub fn operations(&self) -> Vec<StoreOperation> {
        self.inner
            .lock()
            .map(|inner| inner.operations.clone())
            .unwrap_or_default()
    }

    /// Recorded mutating operations, oldest first.
    pub fn writes(&self) -> Vec<StoreOperation> {
        self.operations()
            .into_iter()
            .filter(StoreOperation::is_write)
            .collect()
    }

    /// Snapshot of every stored entry.
    pub fn entries(&self) -> Vec<MetadataEntry> {
        self.inner
            .lock()
            .map(|inner| inner.entries.values().cloned().collect())
            .unwrap_or_default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryStoreInner>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Locked("memory store mutex poisoned".into()))
    }
}

impl MemoryStoreInner {
    fn check(&mut self, op: StoreOperation) -> Result<(), StoreError> {
        let failure = match (&self.fail_on, &op) {
            (Some(FailOn::FindByScope), StoreOperation::FindByScope { .. }) => {
                Some(injected("find_by_scope"))
            }
            (Some(FailOn::FindByKeyAndScope), StoreOperation::FindByKeyAndScope { .. }) => {
                Some(injected("find_by_key_and_scope"))
            }
            (Some(FailOn::FindOverridesOf), StoreOperation::FindOverridesOf { .. }) => {
                Some(injected("find_overrides_of"))
            }
            (Some(FailOn::Create), StoreOperation::Create { .. }) => Some(injected("create")),
            (Some(FailOn::Update), StoreOperation::Update { .. }) => Some(injected("update")),
            (Some(FailOn::Delete), StoreOperation::Delete { .. }) => Some(injected("delete")),
            (Some(FailOn::NthDelete(n)), StoreOperation::Delete { .. }) => {
                self.deletes_served += 1;
                (self.deletes_served == *n).then(|| injected("delete"))
            }
            _ => None,
        };

        if self.recording {
            self.operations.push(op);
        }
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl MetadataStore for MemoryMetadataStore {
    fn find_by_scope(&self, scope: &Scope) -> Result<Vec<MetadataEntry>, StoreError> {
        let mut inner = self.lock()?;
        inner.check(StoreOperation::FindByScope {
            scope: scope.clone(),
        })?;
        Ok(inner
            .entries
            .values()
            .filter(|e| &e.scope == scope)
            .cloned()
            .collect())
    }

    fn find_by_key_and_scope(
        &self,
        key: &MetadataKey,
        scope: &Scope,
    ) -> Result<Option<MetadataEntry>, StoreError> {
        let mut inner = self.lock()?;
        inner.check(StoreOperation::FindByKeyAndScope {
            key: key.clone(),
            scope: scope.clone(),
        })?;
        Ok(inner.entries.get(&(key.clone(), scope.clone())).cloned())
    }

    fn find_overrides_of(&self, key: &MetadataKey) -> Result<Vec<MetadataEntry>, StoreError> {
        let mut inner = self.lock()?;
        inner.check(StoreOperation::FindOverridesOf { key: key.clone() })?;
        let mut overrides: Vec<_> = inner
            .entries
            .values()
            .filter(|e| &e.key == key && !e.is_default())
            .cloned()
            .collect();
        overrides.sort_by(|a, b| a.scope.reference_id().cmp(b.scope.reference_id()));
        Ok(overrides)
    }

    fn create(&self, entry: &MetadataEntry) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        inner.check(StoreOperation::Create {
            key: entry.key.clone(),
            scope: entry.scope.clone(),
        })?;
        let id = (entry.key.clone(), entry.scope.clone());
        if inner.entries.contains_key(&id) {
            return Err(StoreError::already_exists(&entry.key, &entry.scope));
        }
        inner.entries.insert(id, entry.clone());
        Ok(())
    }

    fn update(&self, entry: &MetadataEntry) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        inner.check(StoreOperation::Update {
            key: entry.key.clone(),
            scope: entry.scope.clone(),
        })?;
        match inner
            .entries
            .get_mut(&(entry.key.clone(), entry.scope.clone()))
        {
            Some(stored) => {
                *stored = entry.clone();
                Ok(())
            }
            None => Err(StoreError::not_found(&entry.key, &entry.scope)),
        }
    }

    fn delete(&self, key: &MetadataKey, scope: &Scope) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        inner.check(StoreOperation::Delete {
            key: key.clone(),
            scope: scope.clone(),
        })?;
        inner.entries.remove(&(key.clone(), scope.clone()));
        Ok(())
    }
}
