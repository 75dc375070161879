//! Canonical path string manipulation.
//!
//! A path is a sequence of UIDs joined by [`PATH_SEPARATOR`]. Root spaces
//! have a path equal to their bare UID with no leading separator.

/// The reserved separator between path segments.
pub const PATH_SEPARATOR: char = '/';

/// Join a parent path and a child UID into a full path.
pub fn concatenate(parent: &str, uid: &str) -> String {
    format!("{}{}{}", parent, PATH_SEPARATOR, uid)
}

/// Split a path into its segments, ignoring empty segments caused by
/// leading, trailing, or doubled separators.
pub fn segments(path: &str) -> Vec<&str> {
    path.split(PATH_SEPARATOR).filter(|s| !s.is_empty()).collect()
}

/// Split a path into its parent path and leaf UID. Returns `None` for the
/// parent if the path is a single root-level segment.
pub fn disect_leaf(path: &str) -> (Option<&str>, &str) {
    match path.rfind(PATH_SEPARATOR) {
        Some(idx) => (Some(&path[..idx]), &path[idx + 1..]),
        None => (None, path),
    }
}

/// Whether `ancestor` strictly contains `other` in the namespace tree.
/// A path is not its own ancestor.
pub fn is_ancestor_of(ancestor: &str, other: &str) -> bool {
    other.len() > ancestor.len() + 1
        && other.starts_with(ancestor)
        && other.as_bytes()[ancestor.len()] == PATH_SEPARATOR as u8
}
