//! service::error
//!
//! Error taxonomy surfaced by the metadata service.

use thiserror::Error;

use crate::audit::AuditError;
use crate::core::format::FormatError;
use crate::core::metadata::StoreError;
use crate::core::types::TypeError;

/// Failure of a collaborator the service depends on.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Audit(#[from] AuditError),

    /// The ID generator could not derive a key.
    #[error(transparent)]
    KeyGeneration(#[from] TypeError),
}

/// Errors returned by [`MetadataService`](super::MetadataService).
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A default entry with the same case-insensitive name already exists.
    #[error("a metadata entry named '{name}' already exists")]
    DuplicateName { name: String },

    /// The value does not match its declared format.
    #[error(transparent)]
    Format(#[from] FormatError),

    /// A storage or audit backend failed.
    #[error("{operation}: {source}")]
    StorageFailure {
        /// Human-readable summary of what was attempted.
        operation: String,
        #[source]
        source: BackendError,
    },
}

/// Response class a presentation layer should map an error to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Conflict,
    BadInput,
    Internal,
}

impl ServiceError {
    pub(crate) fn storage(operation: impl Into<String>, source: impl Into<BackendError>) -> Self {
        let operation = operation.into();
        let source = source.into();
        tracing::error!(error = %source, "{}", operation);
        ServiceError::StorageFailure { operation, source }
    }

    /// Classify the error for a caller that needs a response class.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::DuplicateName { .. } => ErrorKind::Conflict,
            ServiceError::Format(_) => ErrorKind::BadInput,
            ServiceError::StorageFailure { .. } => ErrorKind::Internal,
        }
    }

    /// Check if this is a duplicate-name conflict.
    pub fn is_duplicate_name(&self) -> bool {
        matches!(self, ServiceError::DuplicateName { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::format::{check_format, MetadataFormat};
    use std::error::Error as _;

    #[test]
    fn kinds() {
        let dup = ServiceError::DuplicateName { name: "Email".into() };
        assert_eq!(dup.kind(), ErrorKind::Conflict);
        assert!(dup.is_duplicate_name());
        assert!(dup.to_string().contains("Email"));

        let fmt: ServiceError = check_format(MetadataFormat::Numeric, Some("x"))
            .unwrap_err()
            .into();
        assert_eq!(fmt.kind(), ErrorKind::BadInput);

        let storage = ServiceError::storage(
            "failed to delete metadata email",
            StoreError::WriteError("disk full".into()),
        );
        assert_eq!(storage.kind(), ErrorKind::Internal);
    }

    #[test]
    fn storage_failure_keeps_cause() {
        let err = ServiceError::storage(
            "failed to create metadata Email",
            AuditError::WriteError("journal gone".into()),
        );
        let msg = err.to_string();
        assert!(msg.contains("failed to create metadata Email"));
        assert!(msg.contains("journal gone"));
        assert!(err.source().is_some());
    }
}
