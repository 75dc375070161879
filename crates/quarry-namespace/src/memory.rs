//! In-memory namespace store for testing and development.
//!
//! Transactions snapshot the whole state under an exclusive write guard
//! and restore it on error, which gives the same serialization guarantees
//! as the durable backend's row locks, just more coarsely.

use std::collections::BTreeMap;
use std::sync::RwLock;

use chrono::Utc;
use quarry_domain::{paths, PathTargetType, Space, SpacePath, ROOT_PARENT_ID};

use crate::error::{NamespaceError, Result};
use crate::store::{NamespaceStore, NamespaceTx, StoreError};

#[derive(Debug, Clone, Default)]
struct State {
    spaces: BTreeMap<i64, Space>,
    paths: BTreeMap<i64, SpacePath>,
    next_space_id: i64,
    next_path_id: i64,
}

impl State {
    fn find_space(&self, id: i64) -> std::result::Result<Space, StoreError> {
        self.spaces
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("space {}", id)))
    }

    fn find_primary_path(
        &self,
        target_type: PathTargetType,
        target_id: i64,
    ) -> std::result::Result<SpacePath, StoreError> {
        self.paths
            .values()
            .find(|p| p.is_primary && p.target_type == target_type && p.target_id == target_id)
            .cloned()
            .ok_or_else(|| {
                StoreError::NotFound(format!("primary path of {} {}", target_type, target_id))
            })
    }

    fn value_taken(&self, value: &str, exclude_id: i64) -> bool {
        self.paths
            .values()
            .any(|p| p.id != exclude_id && p.value == value)
    }

    fn create_path(&mut self, path: &SpacePath) -> std::result::Result<SpacePath, StoreError> {
        if self.value_taken(&path.value, 0) {
            return Err(StoreError::Duplicate(path.value.clone()));
        }
        if path.is_primary
            && self
                .find_primary_path(path.target_type, path.target_id)
                .is_ok()
        {
            return Err(StoreError::Storage(format!(
                "primary path already exists for {} {}",
                path.target_type, path.target_id
            )));
        }
        self.next_path_id += 1;
        let mut stored = path.clone();
        stored.id = self.next_path_id;
        self.paths.insert(stored.id, stored.clone());
        Ok(stored)
    }
}

/// In-memory implementation of [`NamespaceStore`].
#[derive(Debug, Default)]
pub struct MemoryNamespaceStore {
    state: RwLock<State>,
}

impl MemoryNamespaceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

struct MemoryTx<'a> {
    state: &'a mut State,
}

impl NamespaceTx for MemoryTx<'_> {
    fn update_space_opt_lock(
        &mut self,
        space: &Space,
        mutate: &mut dyn FnMut(&mut Space),
    ) -> std::result::Result<Space, StoreError> {
        let stored = self
            .state
            .spaces
            .get(&space.id)
            .ok_or_else(|| StoreError::NotFound(format!("space {}", space.id)))?;
        if stored.version != space.version {
            return Err(StoreError::VersionConflict);
        }
        let mut updated = stored.clone();
        mutate(&mut updated);
        updated.version += 1;
        updated.updated = Utc::now();
        self.state.spaces.insert(updated.id, updated.clone());
        Ok(updated)
    }

    fn find_primary_path_locked(
        &mut self,
        target_type: PathTargetType,
        target_id: i64,
    ) -> std::result::Result<SpacePath, StoreError> {
        // the write guard held for the transaction scope is the lock
        self.state.find_primary_path(target_type, target_id)
    }

    fn find_primary_path(
        &self,
        target_type: PathTargetType,
        target_id: i64,
    ) -> std::result::Result<SpacePath, StoreError> {
        self.state.find_primary_path(target_type, target_id)
    }

    fn list_primary_descendants_locked(
        &mut self,
        prefix: &str,
    ) -> std::result::Result<Vec<SpacePath>, StoreError> {
        let mut found: Vec<SpacePath> = self
            .state
            .paths
            .values()
            .filter(|p| p.is_primary && paths::is_ancestor_of(prefix, &p.value))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.value.cmp(&b.value));
        Ok(found)
    }

    fn update_path(&mut self, path: &mut SpacePath) -> std::result::Result<(), StoreError> {
        if self.state.value_taken(&path.value, path.id) {
            return Err(StoreError::Duplicate(path.value.clone()));
        }
        let stored = self
            .state
            .paths
            .get_mut(&path.id)
            .ok_or_else(|| StoreError::NotFound(format!("path {}", path.id)))?;
        stored.value = path.value.clone();
        stored.is_primary = path.is_primary;
        stored.version += 1;
        stored.updated = Utc::now();
        *path = stored.clone();
        Ok(())
    }

    fn create_path(&mut self, path: &SpacePath) -> std::result::Result<SpacePath, StoreError> {
        self.state.create_path(path)
    }

    fn sync_space_path(
        &mut self,
        space_id: i64,
        path: &str,
    ) -> std::result::Result<(), StoreError> {
        let space = self
            .state
            .spaces
            .get_mut(&space_id)
            .ok_or_else(|| StoreError::NotFound(format!("space {}", space_id)))?;
        space.path = path.to_string();
        space.version += 1;
        space.updated = Utc::now();
        Ok(())
    }
}

impl NamespaceStore for MemoryNamespaceStore {
    fn find_space_by_ref(&self, space_ref: &str) -> std::result::Result<Space, StoreError> {
        let state = self.read()?;
        if let Ok(id) = space_ref.parse::<i64>() {
            return state.find_space(id);
        }
        let path = state
            .paths
            .values()
            .find(|p| {
                p.is_primary && p.target_type == PathTargetType::Space && p.value == space_ref
            })
            .ok_or_else(|| StoreError::NotFound(format!("space '{}'", space_ref)))?;
        state.find_space(path.target_id)
    }

    fn find_space(&self, id: i64) -> std::result::Result<Space, StoreError> {
        self.read()?.find_space(id)
    }

    fn find_primary_path(
        &self,
        target_type: PathTargetType,
        target_id: i64,
    ) -> std::result::Result<SpacePath, StoreError> {
        self.read()?.find_primary_path(target_type, target_id)
    }

    fn create_space(
        &self,
        uid: &str,
        parent_id: i64,
        created_by: i64,
    ) -> std::result::Result<Space, StoreError> {
        let mut state = self.write()?;
        let value = if parent_id == ROOT_PARENT_ID {
            uid.to_string()
        } else {
            let parent = state.find_primary_path(PathTargetType::Space, parent_id)?;
            paths::concatenate(&parent.value, uid)
        };

        state.next_space_id += 1;
        let now = Utc::now();
        let space = Space {
            id: state.next_space_id,
            uid: uid.to_string(),
            parent_id,
            path: value.clone(),
            description: String::new(),
            created_by,
            created: now,
            updated: now,
            version: 0,
        };
        state.create_path(&SpacePath {
            id: 0,
            version: 0,
            value,
            is_primary: true,
            target_type: PathTargetType::Space,
            target_id: space.id,
            created_by,
            created: now,
            updated: now,
        })?;
        state.spaces.insert(space.id, space.clone());
        Ok(space)
    }

    fn create_path(&self, path: &SpacePath) -> std::result::Result<SpacePath, StoreError> {
        self.write()?.create_path(path)
    }

    fn list_paths(
        &self,
        target_type: PathTargetType,
        target_id: i64,
    ) -> std::result::Result<Vec<SpacePath>, StoreError> {
        let state = self.read()?;
        let mut found: Vec<SpacePath> = state
            .paths
            .values()
            .filter(|p| p.target_type == target_type && p.target_id == target_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.value.cmp(&b.value));
        Ok(found)
    }

    fn all_paths(&self) -> std::result::Result<Vec<SpacePath>, StoreError> {
        let state = self.read()?;
        let mut found: Vec<SpacePath> = state.paths.values().cloned().collect();
        found.sort_by(|a, b| a.value.cmp(&b.value));
        Ok(found)
    }

    fn in_transaction(&self, f: &mut dyn FnMut(&mut dyn NamespaceTx) -> Result<()>) -> Result<()> {
        let mut guard = self
            .state
            .write()
            .map_err(|_| NamespaceError::store("begin transaction", poisoned()))?;
        let snapshot = (*guard).clone();
        let mut tx = MemoryTx { state: &mut *guard };
        match f(&mut tx) {
            Ok(()) => Ok(()),
            Err(err) => {
                *guard = snapshot;
                Err(err)
            }
        }
    }
}

impl MemoryNamespaceStore {
    fn read(&self) -> std::result::Result<std::sync::RwLockReadGuard<'_, State>, StoreError> {
        self.state.read().map_err(|_| poisoned())
    }

    fn write(&self) -> std::result::Result<std::sync::RwLockWriteGuard<'_, State>, StoreError> {
        self.state.write().map_err(|_| poisoned())
    }
}

fn poisoned() -> StoreError {
    StoreError::Storage("state lock poisoned".to_string())
}
