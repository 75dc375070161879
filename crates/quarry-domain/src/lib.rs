//! Quarry Domain - shared types for the quarry namespace layer
//!
//! This crate holds the entities and value types that every layer of the
//! quarry source-control host agrees on:
//!
//! - **Space**: an organizational container in the hierarchical namespace
//! - **SpacePath**: a canonical or alias binding from a path string to a target
//! - **Principal**: the authenticated actor behind a request
//! - **Permission / Resource / Scope**: the vocabulary of authorization checks
//! - **paths**: canonical path string manipulation (concatenation, dissection)
//! - **check**: syntactic validation of space names and path depth

pub mod check;
pub mod path;
pub mod paths;
pub mod permission;
pub mod principal;
pub mod space;

pub use check::CheckError;
pub use path::{PathTargetType, SpacePath};
pub use permission::{Permission, Resource, ResourceKind, Scope};
pub use principal::{Principal, PrincipalType};
pub use space::{Space, ROOT_PARENT_ID};
