//! store
//!
//! Implementations of the [`MetadataStore`] contract.
//!
//! # Providers
//!
//! - [`MemoryMetadataStore`]: in-process map with failure injection (default)
//! - [`FileMetadataStore`]: a TOML file with atomic writes and an OS lock
//!
//! # Provider Selection
//!
//! Use [`create_store`] to build a store from configuration:
//!
//! ```
//! use metatier::store::create_store;
//!
//! let store = create_store("memory", None).unwrap();
//! assert!(create_store("postgres", None).is_err());
//! ```

mod file_store;
mod memory;

use std::path::Path;
use std::sync::Arc;

pub use file_store::FileMetadataStore;
pub use memory::{FailOn, MemoryMetadataStore, StoreOperation};

use crate::core::metadata::{MetadataStore, StoreError};

/// The default store provider name.
pub const DEFAULT_PROVIDER: &str = "memory";

/// Valid store provider names.
pub const PROVIDERS: [&str; 2] = ["memory", "file"];

/// Create a metadata store based on the provider name.
///
/// `path` is only used by the `file` provider; when absent the file store
/// uses its default location.
///
/// # Errors
///
/// - Unknown provider name
/// - Initialization errors from the store
pub fn create_store(
    provider: &str,
    path: Option<&Path>,
) -> Result<Arc<dyn MetadataStore>, StoreError> {
    match provider {
        "memory" => Ok(Arc::new(MemoryMetadataStore::new())),
        "file" => match path {
            Some(path) => Ok(Arc::new(FileMetadataStore::with_path(path.to_path_buf()))),
            None => Ok(Arc::new(FileMetadataStore::new()?)),
        },
        other => Err(StoreError::ProviderNotAvailable(format!(
            "unknown store provider: '{}' (valid: {})",
            other,
            PROVIDERS.join(", ")
        ))),
    }
}
