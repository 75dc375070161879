//! Store contracts consumed by the move engine.
//!
//! The namespace's only mutation primitive is "transactionally rewrite a
//! locked set of path rows plus one optimistically-locked space row", so
//! the contract splits in two: [`NamespaceStore`] for reads and setup
//! outside any transaction, and [`NamespaceTx`] for the operations that
//! are only meaningful inside one.

use quarry_domain::{PathTargetType, Space, SpacePath};
use thiserror::Error;

use crate::error::Result;

/// Errors from a storage backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The named row does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// A unique constraint rejected the written value.
    #[error("duplicate value '{0}'")]
    Duplicate(String),

    /// The row's version no longer matches the caller's copy.
    #[error("version conflict")]
    VersionConflict,

    /// Anything else the backend failed on.
    #[error("storage error: {0}")]
    Storage(String),
}

/// Operations that must run inside a [`NamespaceStore::in_transaction`]
/// scope. The `_locked` variants take an exclusive lock on the returned
/// rows for the remainder of the transaction.
pub trait NamespaceTx {
    /// Compare-and-swap update of a space row.
    ///
    /// Re-reads the stored row, fails with [`StoreError::VersionConflict`]
    /// if its version differs from `space.version`, otherwise applies
    /// `mutate` to a copy, bumps the version, persists, and returns the
    /// updated entity.
    fn update_space_opt_lock(
        &mut self,
        space: &Space,
        mutate: &mut dyn FnMut(&mut Space),
    ) -> std::result::Result<Space, StoreError>;

    /// Locked lookup of a target's primary path.
    fn find_primary_path_locked(
        &mut self,
        target_type: PathTargetType,
        target_id: i64,
    ) -> std::result::Result<SpacePath, StoreError>;

    /// Unlocked lookup of a target's primary path.
    fn find_primary_path(
        &self,
        target_type: PathTargetType,
        target_id: i64,
    ) -> std::result::Result<SpacePath, StoreError>;

    /// Lock and return every primary path strictly below `prefix` in the
    /// tree (value starts with `prefix` + separator), ordered by value.
    /// The prefix path itself is not included; callers fetch it separately
    /// via [`NamespaceTx::find_primary_path_locked`].
    fn list_primary_descendants_locked(
        &mut self,
        prefix: &str,
    ) -> std::result::Result<Vec<SpacePath>, StoreError>;

    /// Persist a path row in place (same identity, new value), bumping its
    /// version. A unique-constraint violation surfaces as
    /// [`StoreError::Duplicate`]; the caller's copy is updated to the
    /// stored state on success.
    fn update_path(&mut self, path: &mut SpacePath) -> std::result::Result<(), StoreError>;

    /// Insert a new path row, assigning its ID.
    fn create_path(&mut self, path: &SpacePath) -> std::result::Result<SpacePath, StoreError>;

    /// Overwrite a space's cached `path` column after its primary path row
    /// was rewritten, bumping the space version. The row lock held on the
    /// primary path serializes this against concurrent moves.
    fn sync_space_path(
        &mut self,
        space_id: i64,
        path: &str,
    ) -> std::result::Result<(), StoreError>;
}

/// A namespace storage backend.
///
/// Implementations are shared across worker threads; all mutable state
/// lives behind the backend's own synchronization.
pub trait NamespaceStore: Send + Sync {
    /// Resolve a space by reference: a ref that parses as an integer
    /// resolves by ID, anything else by primary path value.
    fn find_space_by_ref(&self, space_ref: &str) -> std::result::Result<Space, StoreError>;

    /// Look up a space by ID.
    fn find_space(&self, id: i64) -> std::result::Result<Space, StoreError>;

    /// Unlocked lookup of a target's primary path, outside any transaction.
    fn find_primary_path(
        &self,
        target_type: PathTargetType,
        target_id: i64,
    ) -> std::result::Result<SpacePath, StoreError>;

    /// Create a space together with its primary path row. The path value
    /// derives from the parent's primary path; a collision surfaces as
    /// [`StoreError::Duplicate`].
    fn create_space(
        &self,
        uid: &str,
        parent_id: i64,
        created_by: i64,
    ) -> std::result::Result<Space, StoreError>;

    /// Insert a path row outside a transaction (repository registration,
    /// test setup). Assigns the row ID.
    fn create_path(&self, path: &SpacePath) -> std::result::Result<SpacePath, StoreError>;

    /// All path rows for one target, primaries and aliases, ordered by value.
    fn list_paths(
        &self,
        target_type: PathTargetType,
        target_id: i64,
    ) -> std::result::Result<Vec<SpacePath>, StoreError>;

    /// Every path row in the store, ordered by value. Diagnostic surface,
    /// used to audit the namespace invariants.
    fn all_paths(&self) -> std::result::Result<Vec<SpacePath>, StoreError>;

    /// Run `f` in an atomic scope: either every store call made through
    /// the transaction commits, or none does. Returning an error from `f`
    /// rolls back and propagates the error unchanged.
    fn in_transaction(&self, f: &mut dyn FnMut(&mut dyn NamespaceTx) -> Result<()>) -> Result<()>;
}
