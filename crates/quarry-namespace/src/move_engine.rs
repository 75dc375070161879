//! Atomic move/rename of a space and its whole subtree.
//!
//! A move rewrites the primary path of the space and of every descendant
//! (spaces and repositories alike) in one transaction, optionally leaving
//! the old values behind as non-primary alias rows. Concurrent moves that
//! touch overlapping subtrees are serialized by the locks taken on the
//! affected path rows; a concurrent plain edit of the space itself is
//! caught by the optimistic version check.

use std::sync::Arc;

use chrono::Utc;
use quarry_domain::{
    paths, PathTargetType, Permission, Principal, Resource, ResourceKind, Scope, Space, SpacePath,
    ROOT_PARENT_ID,
};
use serde::{Deserialize, Serialize};

use crate::authz::Authorizer;
use crate::error::{NamespaceError, Result};
use crate::store::{NamespaceStore, NamespaceTx, StoreError};
use crate::validate::{DefaultNameValidator, NameValidator};

/// Desired new name and/or location for a space. Absent fields keep their
/// current value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MoveInput {
    pub uid: Option<String>,
    pub parent_id: Option<i64>,
    #[serde(default)]
    pub keep_as_alias: bool,
}

impl MoveInput {
    fn has_changes(&self, space: &Space) -> bool {
        self.uid.as_ref().is_some_and(|uid| *uid != space.uid)
            || self.parent_id.is_some_and(|id| id != space.parent_id)
    }
}

/// Executes space moves against a [`NamespaceStore`], leaving the
/// namespace either fully updated or fully unchanged.
///
/// The engine itself is stateless and reentrant; all mutable state lives
/// in the backing store.
pub struct MoveEngine {
    store: Arc<dyn NamespaceStore>,
    authorizer: Arc<dyn Authorizer>,
    validator: Arc<dyn NameValidator>,
}

impl MoveEngine {
    pub fn new(store: Arc<dyn NamespaceStore>, authorizer: Arc<dyn Authorizer>) -> Self {
        Self::with_validator(store, authorizer, Arc::new(DefaultNameValidator))
    }

    pub fn with_validator(
        store: Arc<dyn NamespaceStore>,
        authorizer: Arc<dyn Authorizer>,
        validator: Arc<dyn NameValidator>,
    ) -> Self {
        Self {
            store,
            authorizer,
            validator,
        }
    }

    /// Move and/or rename the space identified by `space_ref`.
    ///
    /// Returns the updated space. If neither the UID nor the parent
    /// actually changes, returns the space unchanged without opening a
    /// transaction.
    pub fn move_space(
        &self,
        principal: &Principal,
        space_ref: &str,
        input: &MoveInput,
    ) -> Result<Space> {
        let space = self.store.find_space_by_ref(space_ref)?;

        let mut permission = Permission::SpaceEdit;
        if let Some(new_parent) = input.parent_id {
            if new_parent != space.parent_id {
                // the new-parent id is caller-supplied and unverified;
                // authorize against it before trusting it for anything
                self.check_space_creation(principal, new_parent)?;
                permission = Permission::SpaceDelete;
            }
        }
        self.check_space(principal, &space, permission)?;

        if !input.has_changes(&space) {
            tracing::debug!(space_id = space.id, "move is a no-op");
            return Ok(space);
        }

        self.sanitize_input(input, space.is_root())?;

        let mut moved = space.clone();
        self.store.in_transaction(&mut |tx| {
            moved = tx
                .update_space_opt_lock(&space, &mut |s| {
                    if let Some(uid) = &input.uid {
                        s.uid = uid.clone();
                    }
                    if let Some(parent_id) = input.parent_id {
                        s.parent_id = parent_id;
                    }
                })
                .map_err(|e| NamespaceError::store("space update", e))?;

            // lock the primary path so no overlapping move can slip in
            let primary = tx
                .find_primary_path_locked(PathTargetType::Space, moved.id)
                .map_err(|e| NamespaceError::store("primary path lookup", e))?;
            let old_path_value = primary.value.clone();

            let new_path_value = if moved.parent_id == ROOT_PARENT_ID {
                moved.uid.clone()
            } else {
                // the parent row itself is not mutated, no lock needed
                let parent = tx
                    .find_primary_path(PathTargetType::Space, moved.parent_id)
                    .map_err(|e| NamespaceError::store("parent path lookup", e))?;
                paths::concatenate(&parent.value, &moved.uid)
            };

            // must run before any row is rewritten
            if paths::is_ancestor_of(&old_path_value, &new_path_value) {
                tracing::debug!(
                    space_id = moved.id,
                    from = %old_path_value,
                    to = %new_path_value,
                    "rejecting move into own subtree"
                );
                return Err(NamespaceError::CyclicHierarchy {
                    path: new_path_value,
                });
            }

            let mut to_move = tx
                .list_primary_descendants_locked(&old_path_value)
                .map_err(|e| NamespaceError::store("descendant listing", e))?;
            to_move.push(primary);

            self.rewrite_paths(
                tx,
                principal.id,
                moved.id,
                &mut to_move,
                &old_path_value,
                &new_path_value,
                input.keep_as_alias,
            )?;

            // keep the cached path column in sync within the same transaction
            let synced = tx
                .update_space_opt_lock(&moved, &mut |s| s.path = new_path_value.clone())
                .map_err(|e| NamespaceError::store("space path sync", e))?;
            moved = synced;
            Ok(())
        })?;

        tracing::debug!(space_id = moved.id, path = %moved.path, "space moved");
        Ok(moved)
    }

    /// Rewrite each locked row from `old_prefix` to `new_prefix`, keeping
    /// row identity, and optionally insert an alias row per old value.
    /// Descendant spaces get their cached `path` column synced alongside
    /// their primary row; the moved space itself is synced by the caller.
    fn rewrite_paths(
        &self,
        tx: &mut dyn NamespaceTx,
        principal_id: i64,
        moved_space_id: i64,
        rows: &mut [SpacePath],
        old_prefix: &str,
        new_prefix: &str,
        keep_as_alias: bool,
    ) -> Result<()> {
        for row in rows {
            let old_value = row.value.clone();
            row.value = format!("{}{}", new_prefix, &old_value[old_prefix.len()..]);

            self.validator
                .check_path_depth(&row.value, row.target_type == PathTargetType::Space)?;

            match tx.update_path(row) {
                Ok(()) => {}
                Err(StoreError::Duplicate(value)) => {
                    return Err(NamespaceError::PathConflict { value })
                }
                Err(e) => return Err(NamespaceError::store("path rewrite", e)),
            }

            if row.target_type == PathTargetType::Space && row.target_id != moved_space_id {
                tx.sync_space_path(row.target_id, &row.value)
                    .map_err(|e| NamespaceError::store("descendant path sync", e))?;
            }

            if keep_as_alias {
                let now = Utc::now();
                let alias = SpacePath {
                    id: 0,
                    version: 0,
                    value: old_value,
                    is_primary: false,
                    target_type: row.target_type,
                    target_id: row.target_id,
                    created_by: principal_id,
                    created: now,
                    updated: now,
                };
                match tx.create_path(&alias) {
                    Ok(_) => {}
                    Err(StoreError::Duplicate(value)) => {
                        return Err(NamespaceError::PathConflict { value })
                    }
                    Err(e) => return Err(NamespaceError::store("alias creation", e)),
                }
            }
        }
        Ok(())
    }

    fn sanitize_input(&self, input: &MoveInput, space_is_root: bool) -> Result<()> {
        let mut is_root = space_is_root;
        if let Some(parent_id) = input.parent_id {
            if parent_id < 0 {
                return Err(NamespaceError::InvalidParentId { parent_id });
            }
            is_root = parent_id == ROOT_PARENT_ID;
        }
        if let Some(uid) = &input.uid {
            self.validator.check_uid(uid, is_root)?;
        }
        Ok(())
    }

    /// Authorize creating a space under `parent_id` (the "arrive at the
    /// new location" half of a cross-parent move).
    fn check_space_creation(&self, principal: &Principal, parent_id: i64) -> Result<()> {
        if parent_id < 0 {
            return Err(NamespaceError::InvalidParentId { parent_id });
        }
        let scope = if parent_id == ROOT_PARENT_ID {
            Scope::root()
        } else {
            let parent = self.store.find_space(parent_id)?;
            Scope::space(parent.path)
        };
        let resource = Resource {
            kind: ResourceKind::Space,
            name: String::new(),
        };
        self.enforce(principal, &scope, &resource, Permission::SpaceCreate)
    }

    /// Authorize `permission` on an existing space.
    fn check_space(
        &self,
        principal: &Principal,
        space: &Space,
        permission: Permission,
    ) -> Result<()> {
        let (parent_path, uid) = paths::disect_leaf(&space.path);
        let scope = Scope::space(parent_path.unwrap_or(""));
        let resource = Resource {
            kind: ResourceKind::Space,
            name: uid.to_string(),
        };
        self.enforce(principal, &scope, &resource, permission)
    }

    fn enforce(
        &self,
        principal: &Principal,
        scope: &Scope,
        resource: &Resource,
        permission: Permission,
    ) -> Result<()> {
        let allowed = match self
            .authorizer
            .check(principal, scope, resource, permission)
        {
            Ok(allowed) => allowed,
            Err(err) => {
                tracing::warn!(
                    principal_id = principal.id,
                    permission = %permission,
                    "authorizer failed, denying: {}",
                    err
                );
                false
            }
        };
        if allowed {
            return Ok(());
        }
        let resource_path = if resource.name.is_empty() {
            scope.space_path.clone()
        } else if scope.space_path.is_empty() {
            resource.name.clone()
        } else {
            paths::concatenate(&scope.space_path, &resource.name)
        };
        Err(NamespaceError::PermissionDenied {
            principal_id: principal.id,
            permission,
            resource: resource_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn space(uid: &str, parent_id: i64) -> Space {
        Space {
            id: 1,
            uid: uid.to_string(),
            parent_id,
            path: uid.to_string(),
            description: String::new(),
            created_by: 1,
            created: Utc::now(),
            updated: Utc::now(),
            version: 0,
        }
    }

    #[test]
    fn has_changes_compares_against_current_values() {
        let s = space("eng", 0);
        assert!(!MoveInput::default().has_changes(&s));
        assert!(!MoveInput {
            uid: Some("eng".to_string()),
            parent_id: Some(0),
            keep_as_alias: false,
        }
        .has_changes(&s));
        assert!(MoveInput {
            uid: Some("ops".to_string()),
            ..Default::default()
        }
        .has_changes(&s));
        assert!(MoveInput {
            parent_id: Some(4),
            ..Default::default()
        }
        .has_changes(&s));
    }

    #[test]
    fn input_wire_shape() {
        let input: MoveInput = serde_json::from_str(r#"{"uid":"team1"}"#).unwrap();
        assert_eq!(input.uid.as_deref(), Some("team1"));
        assert_eq!(input.parent_id, None);
        assert!(!input.keep_as_alias);

        let input: MoveInput =
            serde_json::from_str(r#"{"parent_id":0,"keep_as_alias":true}"#).unwrap();
        assert_eq!(input.parent_id, Some(0));
        assert!(input.keep_as_alias);
    }
}
