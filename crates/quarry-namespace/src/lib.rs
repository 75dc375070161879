//! Quarry Namespace - the path layer of the quarry source-control host
//!
//! Every space and repository is addressed by a unique, hierarchical,
//! slash-delimited path. This crate owns that namespace:
//!
//! - **store**: contracts for path and space persistence, split into
//!   non-transactional reads and transaction-scoped mutations
//! - **memory / sqlite**: the two storage backends
//! - **authz**: the permission-check contract the engine consumes
//! - **validate**: the name-validation seam
//! - **move_engine**: atomic move/rename of a space and its subtree
//!
//! # Invariants
//!
//! At every transaction boundary: path values are globally unique; each
//! target has exactly one primary path; a space's cached `path` column
//! equals its primary path row; every descendant's path extends its
//! ancestor's; no path nests under its own previous value.

pub mod authz;
pub mod error;
pub mod memory;
pub mod move_engine;
pub mod store;
pub mod validate;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use authz::{Authorizer, AuthzError, MembershipAuthorizer, PermissionCheck, UnrestrictedAuthorizer};
pub use error::{NamespaceError, Result};
pub use memory::MemoryNamespaceStore;
pub use move_engine::{MoveEngine, MoveInput};
pub use store::{NamespaceStore, NamespaceTx, StoreError};
pub use validate::{DefaultNameValidator, NameValidator};

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteNamespaceStore;
