//! Syntactic validation of space UIDs and path depth.
//!
//! Root spaces share the URL top level with the service's own routes, so
//! they carry stricter rules than nested spaces: a longer minimum length
//! and a reserved-word list.

use thiserror::Error;

use crate::paths;

/// Minimum UID length for a nested space.
pub const MIN_UID_LENGTH: usize = 2;
/// Minimum UID length for a root space.
pub const MIN_ROOT_UID_LENGTH: usize = 3;
/// Maximum UID length for any space.
pub const MAX_UID_LENGTH: usize = 100;

/// Maximum number of segments for a space path.
pub const MAX_SPACE_PATH_DEPTH: usize = 9;
/// Maximum number of segments for a repository path (a repository adds one
/// segment under its owning space).
pub const MAX_REPO_PATH_DEPTH: usize = 10;

/// Maximum total length of any path value.
pub const MAX_PATH_LENGTH: usize = 700;

/// Top-level names reserved for the service's own routes.
const RESERVED_ROOT_UIDS: &[&str] = &[
    "api", "git", "admin", "login", "logout", "register", "settings",
];

/// Validation failures for UIDs and path values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckError {
    #[error("uid '{uid}' must be between {min} and {max} characters")]
    UidLength { uid: String, min: usize, max: usize },

    #[error(
        "uid '{uid}' must start with a letter or underscore and contain only \
         letters, digits, '-', '_' and '.'"
    )]
    UidInvalid { uid: String },

    #[error("uid '{uid}' is reserved at the top level")]
    UidReserved { uid: String },

    #[error("path must not be empty")]
    PathEmpty,

    #[error("path '{path}' exceeds the maximum depth of {max} segments")]
    PathDepthExceeded { path: String, max: usize },

    #[error("path '{path}' exceeds the maximum length of {max} characters")]
    PathLengthExceeded { path: String, max: usize },
}

fn is_uid_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_uid_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')
}

/// Validate a space UID. Root spaces get the stricter rule set.
pub fn uid(uid: &str, is_root: bool) -> Result<(), CheckError> {
    let min = if is_root {
        MIN_ROOT_UID_LENGTH
    } else {
        MIN_UID_LENGTH
    };
    if uid.len() < min || uid.len() > MAX_UID_LENGTH {
        return Err(CheckError::UidLength {
            uid: uid.to_string(),
            min,
            max: MAX_UID_LENGTH,
        });
    }

    let mut chars = uid.chars();
    let valid = chars.next().is_some_and(is_uid_start) && chars.all(is_uid_char);
    if !valid {
        return Err(CheckError::UidInvalid {
            uid: uid.to_string(),
        });
    }

    if is_root && RESERVED_ROOT_UIDS.contains(&uid.to_ascii_lowercase().as_str()) {
        return Err(CheckError::UidReserved {
            uid: uid.to_string(),
        });
    }

    Ok(())
}

/// Validate the structural depth and length of a full path value.
pub fn path_depth(path: &str, is_space: bool) -> Result<(), CheckError> {
    if path.is_empty() {
        return Err(CheckError::PathEmpty);
    }
    if path.len() > MAX_PATH_LENGTH {
        return Err(CheckError::PathLengthExceeded {
            path: path.to_string(),
            max: MAX_PATH_LENGTH,
        });
    }
    let max = if is_space {
        MAX_SPACE_PATH_DEPTH
    } else {
        MAX_REPO_PATH_DEPTH
    };
    let depth = paths::segments(path).len();
    if depth > max {
        return Err(CheckError::PathDepthExceeded {
            path: path.to_string(),
            max,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_uids() {
        assert!(uid("eng", false).is_ok());
        assert!(uid("team-1", false).is_ok());
        assert!(uid("_internal.v2", false).is_ok());
    }

    #[test]
    fn rejects_bad_characters() {
        assert!(matches!(
            uid("eng/team", false),
            Err(CheckError::UidInvalid { .. })
        ));
        assert!(matches!(
            uid("1team", false),
            Err(CheckError::UidInvalid { .. })
        ));
        assert!(matches!(
            uid("-lead", false),
            Err(CheckError::UidInvalid { .. })
        ));
    }

    #[test]
    fn length_bounds_depend_on_level() {
        // two characters pass as a child but not as a root
        assert!(uid("ab", false).is_ok());
        assert!(matches!(
            uid("ab", true),
            Err(CheckError::UidLength { min: 3, .. })
        ));
        let long = "a".repeat(MAX_UID_LENGTH + 1);
        assert!(matches!(
            uid(&long, false),
            Err(CheckError::UidLength { .. })
        ));
    }

    #[test]
    fn reserved_names_blocked_at_root_only() {
        assert!(matches!(
            uid("api", true),
            Err(CheckError::UidReserved { .. })
        ));
        assert!(matches!(
            uid("Admin", true),
            Err(CheckError::UidReserved { .. })
        ));
        assert!(uid("api", false).is_ok());
    }

    #[test]
    fn depth_limits_differ_by_target() {
        let nine = vec!["seg"; 9].join("/");
        let ten = vec!["seg"; 10].join("/");
        assert!(path_depth(&nine, true).is_ok());
        assert!(matches!(
            path_depth(&ten, true),
            Err(CheckError::PathDepthExceeded { max: 9, .. })
        ));
        assert!(path_depth(&ten, false).is_ok());
    }

    #[test]
    fn empty_and_oversized_paths_rejected() {
        assert_eq!(path_depth("", true), Err(CheckError::PathEmpty));
        let long = "a".repeat(MAX_PATH_LENGTH + 1);
        assert!(matches!(
            path_depth(&long, true),
            Err(CheckError::PathLengthExceeded { .. })
        ));
    }
}
