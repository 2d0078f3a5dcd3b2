//! store::file_store
//!
//! File-based metadata storage.
//!
//! # Layout
//!
//! Entries are stored in a single TOML file as an array of `[[entry]]`
//! tables. Each table carries the flat `reference_type`/`reference_id`
//! pair; the default tier is written with [`Scope::DEFAULT_REFERENCE_ID`].
//!
//! # Durability
//!
//! - Every mutation rewrites the whole file atomically (temp file, fsync,
//!   rename)
//! - An OS-level exclusive lock on a sibling `.lock` file is held across
//!   each read-modify-write, so concurrent processes serialize
//! - `create` rejects an existing `(key, scope)` pair; this is the
//!   uniqueness constraint the service relies on for racing creates
//!
//! # Example
//!
//! ```ignore
//! use metatier::store::FileMetadataStore;
//!
//! let store = FileMetadataStore::with_path("/var/lib/metatier/metadata.toml".into());
//! let defaults = store.find_by_scope(&Scope::Default)?;
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde::{Deserialize, Serialize};

use crate::core::format::MetadataFormat;
use crate::core::metadata::{MetadataEntry, MetadataStore, StoreError};
use crate::core::types::{MetadataKey, Scope, UtcTimestamp};

/// On-disk form of a single entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct StoredEntry {
    key: MetadataKey,
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<String>,
    format: MetadataFormat,
    reference_type: String,
    reference_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    created_at: Option<UtcTimestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated_at: Option<UtcTimestamp>,
}

impl From<&MetadataEntry> for StoredEntry {
    fn from(entry: &MetadataEntry) -> Self {
        Self {
            key: entry.key.clone(),
            name: entry.name.clone(),
            value: entry.value.clone(),
            format: entry.format,
            reference_type: entry.scope.reference_type().to_string(),
            reference_id: entry.scope.reference_id().to_string(),
            created_at: entry.created_at.clone(),
            updated_at: entry.updated_at.clone(),
        }
    }
}

impl TryFrom<StoredEntry> for MetadataEntry {
    type Error = StoreError;

    fn try_from(stored: StoredEntry) -> Result<Self, Self::Error> {
        let scope = Scope::from_reference(&stored.reference_type, &stored.reference_id)
            .map_err(|e| StoreError::ReadError(format!("invalid stored entry: {}", e)))?;
        Ok(Self {
            key: stored.key,
            name: stored.name,
            value: stored.value,
            format: stored.format,
            scope,
            created_at: stored.created_at,
            updated_at: stored.updated_at,
        })
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct StoreFile {
    #[serde(default, rename = "entry")]
    entries: Vec<StoredEntry>,
}

/// Exclusive lock on the store, released on drop.
struct StoreLock {
    file: File,
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        // Closing the handle releases the lock as well.
        let _ = self.file.unlock();
    }
}

/// File-based metadata store.
///
/// Stores every entry, in both tiers, in one TOML file.
#[derive(Debug, Clone)]
pub struct FileMetadataStore {
    path: PathBuf,
}

impl FileMetadataStore {
    /// Create a file store at the default location.
    ///
    /// The default location is `~/.metatier/metadata.toml`.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn new() -> Result<Self, StoreError> {
        let home = dirs::home_dir()
            .ok_or_else(|| StoreError::ReadError("cannot determine home directory".into()))?;
        Ok(Self::with_path(home.join(".metatier").join("metadata.toml")))
    }

    /// Create a file store at a custom path.
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    /// Get the path to the store file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        self.path.with_extension("lock")
    }

    /// Acquire the exclusive lock, blocking until it is available.
    fn lock(&self) -> Result<StoreLock, StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| StoreError::WriteError(format!("cannot create directory: {}", e)))?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(self.lock_path())
            .map_err(|e| StoreError::Locked(format!("cannot open lock file: {}", e)))?;

        file.lock_exclusive()
            .map_err(|e| StoreError::Locked(format!("cannot acquire lock: {}", e)))?;

        Ok(StoreLock { file })
    }

    fn read_entries(&self) -> Result<Vec<MetadataEntry>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path)
            .map_err(|e| StoreError::ReadError(format!("cannot read store file: {}", e)))?;

        let file: StoreFile = toml::from_str(&content)
            .map_err(|e| StoreError::ReadError(format!("cannot parse store file: {}", e)))?;

        file.entries
            .into_iter()
            .map(MetadataEntry::try_from)
            .collect()
    }

    fn write_entries(&self, entries: &[MetadataEntry]) -> Result<(), StoreError> {
        let file = StoreFile {
            entries: entries.iter().map(StoredEntry::from).collect(),
        };
        let content = toml::to_string_pretty(&file)
            .map_err(|e| StoreError::WriteError(format!("cannot serialize entries: {}", e)))?;

        let temp_path = self.path.with_extension("toml.tmp");
        {
            let mut temp = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)
                .map_err(|e| StoreError::WriteError(format!("cannot create temp file: {}", e)))?;

            temp.write_all(content.as_bytes())
                .map_err(|e| StoreError::WriteError(format!("cannot write entries: {}", e)))?;

            temp.sync_all()
                .map_err(|e| StoreError::WriteError(format!("cannot sync to disk: {}", e)))?;
        }

        fs::rename(&temp_path, &self.path)
            .map_err(|e| StoreError::WriteError(format!("cannot rename temp file: {}", e)))?;

        Ok(())
    }

    /// Run a read-modify-write cycle under the lock.
    fn modify<F>(&self, f: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Vec<MetadataEntry>) -> Result<(), StoreError>,
    {
        let _lock = self.lock()?;
        let mut entries = self.read_entries()?;
        f(&mut entries)?;
        self.write_entries(&entries)
    }

    fn read_locked(&self) -> Result<Vec<MetadataEntry>, StoreError> {
        let _lock = self.lock()?;
        self.read_entries()
    }
}

fn position(entries: &[MetadataEntry], key: &MetadataKey, scope: &Scope) -> Option<usize> {
    entries
        .iter()
        .position(|e| &e.key == key && &e.scope == scope)
}

impl MetadataStore for FileMetadataStore {
    fn find_by_scope(&self, scope: &Scope) -> Result<Vec<MetadataEntry>, StoreError> {
        Ok(self
            .read_locked()?
            .into_iter()
            .filter(|e| &e.scope == scope)
            .collect())
    }

    fn find_by_key_and_scope(
        &self,
        key: &MetadataKey,
        scope: &Scope,
    ) -> Result<Option<MetadataEntry>, StoreError> {
        Ok(self
            .read_locked()?
            .into_iter()
            .find(|e| &e.key == key && &e.scope == scope))
    }

    fn find_overrides_of(&self, key: &MetadataKey) -> Result<Vec<MetadataEntry>, StoreError> {
        Ok(self
            .read_locked()?
            .into_iter()
            .filter(|e| &e.key == key && !e.is_default())
            .collect())
    }

    fn create(&self, entry: &MetadataEntry) -> Result<(), StoreError> {
        self.modify(|entries| {
            if position(entries, &entry.key, &entry.scope).is_some() {
                return Err(StoreError::already_exists(&entry.key, &entry.scope));
            }
            entries.push(entry.clone());
            Ok(())
        })
    }

    fn update(&self, entry: &MetadataEntry) -> Result<(), StoreError> {
        self.modify(|entries| match position(entries, &entry.key, &entry.scope) {
            Some(i) => {
                entries[i] = entry.clone();
                Ok(())
            }
            None => Err(StoreError::not_found(&entry.key, &entry.scope)),
        })
    }

    fn delete(&self, key: &MetadataKey, scope: &Scope) -> Result<(), StoreError> {
        self.modify(|entries| {
            entries.retain(|e| !(&e.key == key && &e.scope == scope));
            Ok(())
        })
    }
}
