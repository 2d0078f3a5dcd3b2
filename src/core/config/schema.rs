//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Validation
//!
//! Provider names are checked against the providers the store and audit
//! modules know how to build. Paths are only meaningful for the on-disk
//! providers and must not be empty when given.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Top-level configuration file.
///
/// # Example
///
/// ```toml
/// [store]
/// provider = "file"
/// path = "/var/lib/metatier/metadata.toml"
///
/// [audit]
/// provider = "journal"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    /// Metadata store settings
    pub store: Option<StoreConfig>,

    /// Audit sink settings
    pub audit: Option<AuditConfig>,
}

impl ConfigFile {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(store) = &self.store {
            store.validate()?;
        }
        if let Some(audit) = &self.audit {
            audit.validate()?;
        }
        Ok(())
    }
}

/// `[store]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Provider to use ("memory" or "file")
    pub provider: Option<String>,

    /// Location of the file store
    pub path: Option<PathBuf>,
}

impl StoreConfig {
    /// Validate the store configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_provider("store", self.provider.as_deref(), &crate::store::PROVIDERS)?;
        check_path("store", self.path.as_ref())
    }
}

/// `[audit]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AuditConfig {
    /// Provider to use ("memory" or "journal")
    pub provider: Option<String>,

    /// Location of the audit journal
    pub path: Option<PathBuf>,
}

impl AuditConfig {
    /// Validate the audit configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_provider("audit", self.provider.as_deref(), &crate::audit::PROVIDERS)?;
        check_path("audit", self.path.as_ref())
    }
}

fn check_provider(section: &str, provider: Option<&str>, valid: &[&str]) -> Result<(), ConfigError> {
    match provider {
        Some(p) if !valid.contains(&p) => Err(ConfigError::InvalidValue(format!(
            "invalid {} provider '{}', must be one of: {}",
            section,
            p,
            valid.join(", ")
        ))),
        _ => Ok(()),
    }
}

fn check_path(section: &str, path: Option<&PathBuf>) -> Result<(), ConfigError> {
    match path {
        Some(p) if p.as_os_str().is_empty() => Err(ConfigError::InvalidValue(format!(
            "{} path cannot be empty",
            section
        ))),
        _ => Ok(()),
    }
}
