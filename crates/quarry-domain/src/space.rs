//! The space entity - an organizational container in the namespace tree.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Parent ID of a root space. A space whose `parent_id` equals this value
/// sits at the top level of the namespace and its path is its bare UID.
pub const ROOT_PARENT_ID: i64 = 0;

/// A node in the hierarchical namespace that can hold child spaces and
/// repositories.
///
/// The `path` field is a denormalized cache of the space's primary path
/// value. It is kept in sync with the paths table transactionally by the
/// move engine; code that mutates the namespace must derive the old path
/// from the locked primary path row, never from this cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Space {
    /// Immutable numeric identity, assigned by the store at creation.
    pub id: i64,
    /// Short name segment, unique among siblings under the same parent.
    pub uid: String,
    /// ID of the parent space, or [`ROOT_PARENT_ID`] for a root space.
    pub parent_id: i64,
    /// Cached primary path value (see type-level docs).
    pub path: String,
    /// Free-form description shown in listings.
    pub description: String,
    /// Principal that created the space.
    pub created_by: i64,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    /// Optimistic-concurrency token, incremented on every update.
    pub version: i64,
}

impl Space {
    /// Whether the space sits at the top level of the namespace.
    pub fn is_root(&self) -> bool {
        self.parent_id == ROOT_PARENT_ID
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(parent_id: i64) -> Space {
        Space {
            id: 7,
            uid: "eng".to_string(),
            parent_id,
            path: "eng".to_string(),
            description: String::new(),
            created_by: 1,
            created: Utc::now(),
            updated: Utc::now(),
            version: 0,
        }
    }

    #[test]
    fn root_detection() {
        assert!(sample(ROOT_PARENT_ID).is_root());
        assert!(!sample(3).is_root());
    }

    #[test]
    fn serde_round_trip() {
        let space = sample(3);
        let json = serde_json::to_string(&space).unwrap();
        let back: Space = serde_json::from_str(&json).unwrap();
        assert_eq!(space, back);
    }
}
