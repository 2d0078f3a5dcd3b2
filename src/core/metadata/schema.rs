//! core::metadata::schema
//!
//! Metadata entry types.
//!
//! # Types
//!
//! - [`MetadataEntry`] - A stored entry, default or override
//! - [`NewMetadata`] - Request to create a default entry
//! - [`UpdateMetadata`] - Request to update a default entry
//!
//! # Example
//!
//! ```
//! use metatier::core::format::MetadataFormat;
//! use metatier::core::metadata::schema::NewMetadata;
//!
//! let request = NewMetadata::new("Support Email")
//!     .with_format(MetadataFormat::Mail)
//!     .with_value("support@example.com");
//!
//! assert_eq!(request.format_or_default(), MetadataFormat::Mail);
//! ```

use serde::{Deserialize, Serialize};

use crate::core::format::MetadataFormat;
use crate::core::types::{MetadataKey, ResourceId, Scope, UtcTimestamp};

/// A metadata entry in either tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataEntry {
    /// Stable key; shared by a default and all of its overrides.
    pub key: MetadataKey,
    /// Human-readable label.
    pub name: String,
    /// Raw value, already normalized for its format.
    pub value: Option<String>,
    /// Declared value grammar.
    pub format: MetadataFormat,
    /// Tier the entry lives in.
    pub scope: Scope,
    /// Creation time. Not carried forward by updates.
    pub created_at: Option<UtcTimestamp>,
    /// Last modification time.
    pub updated_at: Option<UtcTimestamp>,
}

impl MetadataEntry {
    /// Build a resource-scoped override of a default entry.
    ///
    /// Overrides are produced by resource configuration outside this
    /// crate; this constructor exists for adapters and tests that need to
    /// seed them.
    pub fn override_of(
        default: &MetadataEntry,
        resource: ResourceId,
        value: Option<String>,
    ) -> Self {
        let now = UtcTimestamp::now();
        Self {
            key: default.key.clone(),
            name: default.name.clone(),
            value,
            format: default.format,
            scope: Scope::Resource(resource),
            created_at: Some(now.clone()),
            updated_at: Some(now),
        }
    }

    /// Check if this entry is in the default tier.
    pub fn is_default(&self) -> bool {
        self.scope.is_default()
    }

    /// Case-insensitive name comparison.
    pub fn has_name(&self, name: &str) -> bool {
        names_equal(&self.name, name)
    }
}

/// Compare two names the way uniqueness is enforced.
pub fn names_equal(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// Order two names case-insensitively.
pub fn compare_names(a: &str, b: &str) -> std::cmp::Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

/// Request to create a default entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMetadata {
    pub name: String,
    /// Falls back to STRING when absent.
    #[serde(default)]
    pub format: Option<MetadataFormat>,
    #[serde(default)]
    pub value: Option<String>,
}

impl NewMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            format: None,
            value: None,
        }
    }

    pub fn with_format(mut self, format: MetadataFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// The declared format, or STRING.
    pub fn format_or_default(&self) -> MetadataFormat {
        self.format.unwrap_or_default()
    }
}

/// Request to update a default entry, identified by key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateMetadata {
    pub key: MetadataKey,
    pub name: String,
    pub format: MetadataFormat,
    #[serde(default)]
    pub value: Option<String>,
}

impl UpdateMetadata {
    pub fn new(key: MetadataKey, name: impl Into<String>, format: MetadataFormat) -> Self {
        Self {
            key,
            name: name.into(),
            format,
            value: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}
