//! Error types for the namespace layer.

use quarry_domain::{CheckError, Permission};
use thiserror::Error;

use crate::store::StoreError;

/// Result type alias for namespace operations.
pub type Result<T> = std::result::Result<T, NamespaceError>;

/// Errors surfaced by namespace operations.
///
/// Every failure inside a transactional block aborts the transaction; the
/// namespace is left exactly as it was before the call.
#[derive(Debug, Error)]
pub enum NamespaceError {
    /// Referenced space, parent, or primary path does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// The authorizer denied the operation, or failed while evaluating it.
    #[error("principal {principal_id} lacks {permission} on '{resource}'")]
    PermissionDenied {
        principal_id: i64,
        permission: Permission,
        resource: String,
    },

    /// Malformed UID or resulting path.
    #[error("validation failed: {0}")]
    Validation(#[from] CheckError),

    /// Parent IDs are store-assigned and never negative.
    #[error("parent id {parent_id} is invalid")]
    InvalidParentId { parent_id: i64 },

    /// The move would nest the space inside its own subtree.
    #[error("moving to '{path}' would create a cyclic hierarchy")]
    CyclicHierarchy { path: String },

    /// A rewritten or alias path value collides with an existing row.
    #[error("path '{value}' already exists")]
    PathConflict { value: String },

    /// Concurrent modification of the space since it was read.
    #[error("space was modified concurrently")]
    VersionConflict,

    /// Any other persistence-layer failure, with the step it happened in.
    #[error("store failure during {step}: {source}")]
    Store {
        step: &'static str,
        source: StoreError,
    },
}

impl From<StoreError> for NamespaceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => NamespaceError::NotFound(what),
            StoreError::VersionConflict => NamespaceError::VersionConflict,
            other => NamespaceError::Store {
                step: "store call",
                source: other,
            },
        }
    }
}

impl NamespaceError {
    /// Wrap a store failure with the step it happened in. `NotFound` and
    /// `VersionConflict` keep their own variants regardless of step.
    pub(crate) fn store(step: &'static str, err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => NamespaceError::NotFound(what),
            StoreError::VersionConflict => NamespaceError::VersionConflict,
            other => NamespaceError::Store { step, source: other },
        }
    }
}
