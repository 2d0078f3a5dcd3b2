//! core::metadata
//!
//! Metadata entry schema and storage contract.
//!
//! # Modules
//!
//! - [`schema`] - Entry and request types
//! - [`store`] - The `MetadataStore` persistence trait
//!
//! # Tiers
//!
//! Entries live either in the default tier (one per case-insensitive
//! name) or in a resource tier, where they override the default entry
//! sharing their key.

pub mod schema;
pub mod store;

// Re-export commonly used types
pub use schema::{compare_names, names_equal, MetadataEntry, NewMetadata, UpdateMetadata};
pub use store::{MetadataStore, StoreError};
