//! metatier - two-tier metadata with audited changes
//!
//! Metadata entries are named, typed values. Default entries apply to
//! every resource; a resource may override a default by holding an entry
//! under the same key in its own scope.
//!
//! # Architecture
//!
//! - [`core`] - Domain types, format validation, schemas and config
//! - [`store`] - Memory and file implementations of the storage contract
//! - [`audit`] - Audit sinks recording every committed change
//! - [`service`] - The metadata service orchestrating the above
//!
//! # Correctness Invariants
//!
//! 1. Default entry names are unique, ignoring case
//! 2. No value is written without passing its format's validator
//! 3. Deleting a default removes and audits every override of it
//! 4. Storage and audit failures surface as errors, never silently

pub mod audit;
pub mod core;
pub mod service;
pub mod store;
