//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`MetadataKey`] - Stable identifier of a metadata entry
//! - [`ResourceId`] - Identifier of a resource that may override defaults
//! - [`Scope`] - The tier an entry lives in (default or per-resource)
//! - [`UtcTimestamp`] - RFC3339 timestamp
//!
//! # Validation
//!
//! Keys and resource ids are validated at construction time. An empty
//! key cannot be represented, and a resource id can never collide with
//! the default tier because the tier is a separate enum variant.
//!
//! # Examples
//!
//! ```
//! use metatier::core::types::{MetadataKey, ResourceId, Scope};
//!
//! let key = MetadataKey::new("support-email").unwrap();
//! let api = ResourceId::new("api-42").unwrap();
//!
//! assert!(Scope::Default.is_default());
//! assert_eq!(Scope::Resource(api).resource_id().unwrap().as_str(), "api-42");
//!
//! assert!(MetadataKey::new("").is_err());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid metadata key: {0}")]
    InvalidKey(String),

    #[error("invalid resource id: {0}")]
    InvalidResourceId(String),

    #[error("invalid reference type: {0}")]
    InvalidReferenceType(String),
}

/// Stable identifier of a metadata entry.
///
/// Default entries get their key from the ID generator when they are
/// created; overrides reuse the key of the default they customize.
///
/// # Example
///
/// ```
/// use metatier::core::types::MetadataKey;
///
/// let key = MetadataKey::new("support-email").unwrap();
/// assert_eq!(key.as_str(), "support-email");
///
/// assert!(MetadataKey::new("").is_err());
/// assert!(MetadataKey::new("   ").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MetadataKey(String);

impl MetadataKey {
    /// Create a new validated key.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidKey` if the key is blank or contains
    /// control characters.
    pub fn new(key: impl Into<String>) -> Result<Self, TypeError> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(TypeError::InvalidKey("key cannot be blank".into()));
        }
        if key.chars().any(|c| c.is_control()) {
            return Err(TypeError::InvalidKey(
                "key cannot contain control characters".into(),
            ));
        }
        Ok(Self(key))
    }

    /// Get the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for MetadataKey {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<MetadataKey> for String {
    fn from(key: MetadataKey) -> Self {
        key.0
    }
}

impl AsRef<str> for MetadataKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MetadataKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a resource (for example an API) that carries overrides.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceId(String);

impl ResourceId {
    /// Create a new validated resource id.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidResourceId` if the id is blank.
    pub fn new(id: impl Into<String>) -> Result<Self, TypeError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(TypeError::InvalidResourceId(
                "resource id cannot be blank".into(),
            ));
        }
        Ok(Self(id))
    }

    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ResourceId {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ResourceId> for String {
    fn from(id: ResourceId) -> Self {
        id.0
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The tier a metadata entry belongs to.
///
/// Default entries are global. Resource entries override a default for a
/// single resource and share the default's key.
///
/// # Persisted Form
///
/// Storage backends that need a flat `(reference_type, reference_id)`
/// pair use [`Scope::reference_type`] and [`Scope::reference_id`]. The
/// default tier is written with [`Scope::DEFAULT_REFERENCE_ID`], but the
/// in-memory model never compares against that string: a resource that is
/// literally named `"_"` is still a resource.
///
/// # Example
///
/// ```
/// use metatier::core::types::{ResourceId, Scope};
///
/// let scope = Scope::Resource(ResourceId::new("_").unwrap());
/// assert!(!scope.is_default());
/// assert_eq!(scope.reference_type(), "RESOURCE");
///
/// let parsed = Scope::from_reference("DEFAULT", Scope::DEFAULT_REFERENCE_ID).unwrap();
/// assert_eq!(parsed, Scope::Default);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "reference_type", content = "reference_id", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Scope {
    /// Global tier.
    Default,
    /// Per-resource override tier.
    Resource(ResourceId),
}

impl Scope {
    /// Reference id written for the default tier in flat storage layouts.
    pub const DEFAULT_REFERENCE_ID: &'static str = "_";

    /// Check if this is the default tier.
    pub fn is_default(&self) -> bool {
        matches!(self, Scope::Default)
    }

    /// Get the resource id for a resource-scoped entry.
    pub fn resource_id(&self) -> Option<&ResourceId> {
        match self {
            Scope::Default => None,
            Scope::Resource(id) => Some(id),
        }
    }

    /// Flat reference type tag.
    pub fn reference_type(&self) -> &'static str {
        match self {
            Scope::Default => "DEFAULT",
            Scope::Resource(_) => "RESOURCE",
        }
    }

    /// Flat reference id.
    pub fn reference_id(&self) -> &str {
        match self {
            Scope::Default => Self::DEFAULT_REFERENCE_ID,
            Scope::Resource(id) => id.as_str(),
        }
    }

    /// Rebuild a scope from its flat `(reference_type, reference_id)` form.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown reference type or a blank
    /// resource id.
    pub fn from_reference(reference_type: &str, reference_id: &str) -> Result<Self, TypeError> {
        match reference_type {
            "DEFAULT" => Ok(Scope::Default),
            "RESOURCE" => Ok(Scope::Resource(ResourceId::new(reference_id)?)),
            other => Err(TypeError::InvalidReferenceType(other.to_string())),
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scope::Default => write!(f, "default"),
            Scope::Resource(id) => write!(f, "resource:{}", id),
        }
    }
}

/// A UTC timestamp in RFC3339 format.
///
/// # Example
///
/// ```
/// use metatier::core::types::UtcTimestamp;
///
/// let now = UtcTimestamp::now();
/// println!("Current time: {}", now);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UtcTimestamp(chrono::DateTime<chrono::Utc>);

impl UtcTimestamp {
    /// Create a timestamp for the current moment.
    pub fn now() -> Self {
        Self(chrono::Utc::now())
    }

    /// Create a timestamp from a chrono DateTime.
    pub fn from_datetime(dt: chrono::DateTime<chrono::Utc>) -> Self {
        Self(dt)
    }

    /// Get the underlying datetime.
    pub fn as_datetime(&self) -> &chrono::DateTime<chrono::Utc> {
        &self.0
    }
}

impl std::fmt::Display for UtcTimestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}
