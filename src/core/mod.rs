//! core
//!
//! Core domain types, schemas, and validation for metatier.
//!
//! # Modules
//!
//! - [`types`] - Strong types: MetadataKey, ResourceId, Scope, UtcTimestamp
//! - [`format`] - Value formats and their validators
//! - [`naming`] - Key generation from entry names
//! - [`metadata`] - Entry schema and the storage contract
//! - [`config`] - Configuration schema and loading

pub mod config;
pub mod format;
pub mod metadata;
pub mod naming;
pub mod types;
