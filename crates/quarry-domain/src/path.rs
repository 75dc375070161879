//! The path record - a named binding from a canonical string to a target.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The kind of entity a path points at. Spaces and repositories share one
/// global namespace, so a single table of path rows covers both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathTargetType {
    Space,
    Repo,
}

impl PathTargetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PathTargetType::Space => "space",
            PathTargetType::Repo => "repo",
        }
    }

    /// Parse from the store column representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "space" => Some(PathTargetType::Space),
            "repo" => Some(PathTargetType::Repo),
            _ => None,
        }
    }
}

impl std::fmt::Display for PathTargetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A binding from a slash-delimited path string to a space or repository.
///
/// `value` is globally unique across all targets and target types. Exactly
/// one row per target is primary at any time; any number of non-primary
/// alias rows may exist alongside it. The primary row is rewritten in place
/// on a move so that references keyed by row ID stay valid; alias rows are
/// only ever inserted, never mutated, by this layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpacePath {
    /// Row identity, assigned by the store at creation.
    pub id: i64,
    /// Monotonically increasing row version, bumped on every write.
    pub version: i64,
    /// Full slash-delimited path string.
    pub value: String,
    /// Whether this row is the target's canonical path.
    pub is_primary: bool,
    pub target_type: PathTargetType,
    pub target_id: i64,
    /// Principal that created the row.
    pub created_by: i64,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}
