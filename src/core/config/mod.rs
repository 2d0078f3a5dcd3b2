//! core::config
//!
//! Configuration schema and loading.
//!
//! # Locations
//!
//! Searched in order, first existing file wins:
//! 1. `$METATIER_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/metatier/config.toml`
//! 3. `~/.metatier/config.toml` (canonical write location)
//!
//! A missing file is not an error; every setting has a default.
//!
//! # Example
//!
//! ```no_run
//! use metatier::core::config::Config;
//!
//! let config = Config::load().unwrap();
//! println!("store: {}", config.store_provider());
//!
//! let service = config.build_service().unwrap();
//! let defaults = service.list_defaults().unwrap();
//! ```

pub mod schema;

pub use schema::{AuditConfig, ConfigFile, StoreConfig};

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use crate::audit::{self, AuditError};
use crate::core::metadata::StoreError;
use crate::service::MetadataService;
use crate::store;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "METATIER_CONFIG";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("failed to write config file '{path}': {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("home directory not found")]
    NoHomeDir,

    #[error("cannot build metadata store: {0}")]
    Store(#[from] StoreError),

    #[error("cannot build audit sink: {0}")]
    Audit(#[from] AuditError),
}

/// Loaded configuration.
///
/// Accessor methods apply defaults for anything the file leaves out.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Parsed file contents
    pub file: ConfigFile,
    /// Path the file was loaded from (if any)
    loaded_from: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the standard locations.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be read, parsed
    /// or validated.
    pub fn load() -> Result<Self, ConfigError> {
        match Self::find_config_file() {
            Some(path) => Self::load_from(&path),
            None => {
                debug!("no config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load configuration from an explicit file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let file: ConfigFile = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        file.validate()?;

        debug!(path = %path.display(), "loaded config");
        Ok(Self {
            file,
            loaded_from: Some(path.to_path_buf()),
        })
    }

    fn find_config_file() -> Option<PathBuf> {
        // 1. $METATIER_CONFIG
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
            warn!(path = %path.display(), "{} points to a missing file, ignoring", CONFIG_ENV);
        }

        // 2. $XDG_CONFIG_HOME/metatier/config.toml
        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("metatier/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        // 3. ~/.metatier/config.toml
        let path = dirs::home_dir()?.join(".metatier/config.toml");
        path.exists().then_some(path)
    }

    /// Get the canonical config path, `~/.metatier/config.toml`.
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(home.join(".metatier/config.toml"))
    }

    /// Write a config file atomically.
    ///
    /// Creates parent directories if needed, writes a temp file in the same
    /// directory, syncs it, then renames it over `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid or cannot be written.
    pub fn write_atomic(path: &Path, file: &ConfigFile) -> Result<(), ConfigError> {
        file.validate()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
                path: path.to_path_buf(),
                source: e,
            })?;
        }

        let contents =
            toml::to_string_pretty(file).map_err(|e| ConfigError::InvalidValue(e.to_string()))?;

        let temp_path = path.with_extension("toml.tmp");
        let write_err = |e| ConfigError::WriteError {
            path: temp_path.clone(),
            source: e,
        };
        let mut out = fs::File::create(&temp_path).map_err(write_err)?;
        out.write_all(contents.as_bytes()).map_err(write_err)?;
        out.sync_all().map_err(write_err)?;

        fs::rename(&temp_path, path).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(())
    }

    /// Get the store provider. Defaults to "memory".
    pub fn store_provider(&self) -> &str {
        self.file
            .store
            .as_ref()
            .and_then(|s| s.provider.as_deref())
            .unwrap_or(store::DEFAULT_PROVIDER)
    }

    /// Get the configured store path, if any.
    pub fn store_path(&self) -> Option<&Path> {
        self.file.store.as_ref().and_then(|s| s.path.as_deref())
    }

    /// Get the audit provider. Defaults to "memory".
    pub fn audit_provider(&self) -> &str {
        self.file
            .audit
            .as_ref()
            .and_then(|a| a.provider.as_deref())
            .unwrap_or(audit::DEFAULT_PROVIDER)
    }

    /// Get the configured audit journal path, if any.
    pub fn audit_path(&self) -> Option<&Path> {
        self.file.audit.as_ref().and_then(|a| a.path.as_deref())
    }

    /// Get the path the config was loaded from.
    pub fn loaded_from(&self) -> Option<&Path> {
        self.loaded_from.as_deref()
    }

    /// Assemble a service from the configured providers.
    ///
    /// # Errors
    ///
    /// Returns an error if either provider cannot be initialized.
    pub fn build_service(&self) -> Result<MetadataService, ConfigError> {
        let metadata = store::create_store(self.store_provider(), self.store_path())?;
        let sink = audit::create_sink(self.audit_provider(), self.audit_path())?;
        debug!(
            store = self.store_provider(),
            audit = self.audit_provider(),
            "built metadata service"
        );
        Ok(MetadataService::new(metadata, sink))
    }
}
