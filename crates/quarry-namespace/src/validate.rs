//! Name validation seam.
//!
//! The syntactic rules live in `quarry_domain::check`; this trait lets the
//! surrounding platform swap them (e.g. stricter enterprise naming) without
//! touching the engine.

use quarry_domain::{check, CheckError};

/// Validates proposed UIDs and resulting path values.
pub trait NameValidator: Send + Sync {
    /// Validate a space UID under root-level or child-level rules.
    fn check_uid(&self, uid: &str, is_root: bool) -> Result<(), CheckError>;

    /// Validate the structural depth of a full path value.
    fn check_path_depth(&self, path: &str, is_space: bool) -> Result<(), CheckError>;
}

/// The platform's standard rules.
#[derive(Debug, Default)]
pub struct DefaultNameValidator;

impl NameValidator for DefaultNameValidator {
    fn check_uid(&self, uid: &str, is_root: bool) -> Result<(), CheckError> {
        check::uid(uid, is_root)
    }

    fn check_path_depth(&self, path: &str, is_space: bool) -> Result<(), CheckError> {
        check::path_depth(path, is_space)
    }
}
