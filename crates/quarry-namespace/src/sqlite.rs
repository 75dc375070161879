//! SQLite-backed namespace store.
//!
//! One connection behind a mutex; a transaction holds the mutex for its
//! whole scope, so the `_locked` store operations get their exclusivity
//! from the connection itself (SQLite has no row locks). That serializes
//! overlapping moves more coarsely than a row-locking database would, but
//! preserves the same ordering guarantees.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, TimeZone, Utc};
use quarry_domain::{paths, PathTargetType, Space, SpacePath, ROOT_PARENT_ID};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{NamespaceError, Result};
use crate::store::{NamespaceStore, NamespaceTx, StoreError};

/// SQLite implementation of [`NamespaceStore`].
pub struct SqliteNamespaceStore {
    conn: Mutex<Connection>,
}

impl SqliteNamespaceStore {
    /// Open (or create) a database at the given path.
    pub fn open(path: impl AsRef<Path>) -> std::result::Result<Self, StoreError> {
        let conn = Connection::open(path)
            .map_err(|e| StoreError::Storage(format!("open: {}", e)))?;
        Self::init_with_connection(conn)
    }

    /// Create an in-memory database (for testing).
    pub fn open_in_memory() -> std::result::Result<Self, StoreError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StoreError::Storage(format!("open_in_memory: {}", e)))?;
        Self::init_with_connection(conn)
    }

    fn init_with_connection(conn: Connection) -> std::result::Result<Self, StoreError> {
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> std::result::Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Storage("connection lock poisoned".to_string()))
    }
}

fn init_schema(conn: &Connection) -> std::result::Result<(), StoreError> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA foreign_keys = ON;

        CREATE TABLE IF NOT EXISTS spaces (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            uid TEXT NOT NULL,
            parent_id INTEGER NOT NULL DEFAULT 0,
            path TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            created_by INTEGER NOT NULL,
            created INTEGER NOT NULL,
            updated INTEGER NOT NULL,
            version INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS paths (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            version INTEGER NOT NULL DEFAULT 0,
            value TEXT NOT NULL UNIQUE,
            is_primary INTEGER NOT NULL DEFAULT 0,
            target_type TEXT NOT NULL,
            target_id INTEGER NOT NULL,
            created_by INTEGER NOT NULL,
            created INTEGER NOT NULL,
            updated INTEGER NOT NULL
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_paths_primary_target
            ON paths(target_type, target_id) WHERE is_primary = 1;
        ",
    )
    .map_err(|e| StoreError::Storage(format!("init schema: {}", e)))
}

const SPACE_COLUMNS: &str = "id, uid, parent_id, path, description, created_by, created, updated, version";
const PATH_COLUMNS: &str =
    "id, version, value, is_primary, target_type, target_id, created_by, created, updated";

fn millis(dt: DateTime<Utc>) -> i64 {
    dt.timestamp_millis()
}

fn from_millis(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().unwrap_or_else(Utc::now)
}

fn row_to_space(row: &rusqlite::Row) -> rusqlite::Result<Space> {
    Ok(Space {
        id: row.get(0)?,
        uid: row.get(1)?,
        parent_id: row.get(2)?,
        path: row.get(3)?,
        description: row.get(4)?,
        created_by: row.get(5)?,
        created: from_millis(row.get(6)?),
        updated: from_millis(row.get(7)?),
        version: row.get(8)?,
    })
}

fn row_to_path(row: &rusqlite::Row) -> rusqlite::Result<SpacePath> {
    let tt: String = row.get(4)?;
    let target_type = PathTargetType::parse(&tt).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            rusqlite::types::Type::Text,
            format!("unknown target type '{}'", tt).into(),
        )
    })?;
    Ok(SpacePath {
        id: row.get(0)?,
        version: row.get(1)?,
        value: row.get(2)?,
        is_primary: row.get(3)?,
        target_type,
        target_id: row.get(5)?,
        created_by: row.get(6)?,
        created: from_millis(row.get(7)?),
        updated: from_millis(row.get(8)?),
    })
}

/// Map a write error, turning unique-constraint violations into
/// [`StoreError::Duplicate`] carrying the offending value.
fn map_write_err(value: &str, e: rusqlite::Error) -> StoreError {
    match &e {
        rusqlite::Error::SqliteFailure(f, _)
            if f.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            StoreError::Duplicate(value.to_string())
        }
        _ => StoreError::Storage(e.to_string()),
    }
}

fn storage(step: &str, e: rusqlite::Error) -> StoreError {
    StoreError::Storage(format!("{}: {}", step, e))
}

// MARK: - Shared queries
//
// These take a plain connection so they serve both the outer store methods
// and the transaction scope (rusqlite's Transaction derefs to Connection).

fn find_space_q(conn: &Connection, id: i64) -> std::result::Result<Space, StoreError> {
    conn.query_row(
        &format!("SELECT {} FROM spaces WHERE id = ?1", SPACE_COLUMNS),
        params![id],
        row_to_space,
    )
    .optional()
    .map_err(|e| storage("find space", e))?
    .ok_or_else(|| StoreError::NotFound(format!("space {}", id)))
}

fn find_primary_path_q(
    conn: &Connection,
    target_type: PathTargetType,
    target_id: i64,
) -> std::result::Result<SpacePath, StoreError> {
    conn.query_row(
        &format!(
            "SELECT {} FROM paths WHERE target_type = ?1 AND target_id = ?2 AND is_primary = 1",
            PATH_COLUMNS
        ),
        params![target_type.as_str(), target_id],
        row_to_path,
    )
    .optional()
    .map_err(|e| storage("find primary path", e))?
    .ok_or_else(|| StoreError::NotFound(format!("primary path of {} {}", target_type, target_id)))
}

fn create_path_q(
    conn: &Connection,
    path: &SpacePath,
) -> std::result::Result<SpacePath, StoreError> {
    conn.execute(
        "INSERT INTO paths (version, value, is_primary, target_type, target_id, created_by, created, updated)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            path.version,
            path.value,
            path.is_primary,
            path.target_type.as_str(),
            path.target_id,
            path.created_by,
            millis(path.created),
            millis(path.updated),
        ],
    )
    .map_err(|e| map_write_err(&path.value, e))?;
    let mut stored = path.clone();
    stored.id = conn.last_insert_rowid();
    Ok(stored)
}

fn update_space_opt_q(
    conn: &Connection,
    space: &Space,
    mutate: &mut dyn FnMut(&mut Space),
) -> std::result::Result<Space, StoreError> {
    let stored = find_space_q(conn, space.id)?;
    if stored.version != space.version {
        return Err(StoreError::VersionConflict);
    }
    let mut updated = stored;
    mutate(&mut updated);
    updated.version += 1;
    updated.updated = Utc::now();
    let changed = conn
        .execute(
            "UPDATE spaces
             SET uid = ?1, parent_id = ?2, path = ?3, description = ?4, updated = ?5, version = ?6
             WHERE id = ?7 AND version = ?8",
            params![
                updated.uid,
                updated.parent_id,
                updated.path,
                updated.description,
                millis(updated.updated),
                updated.version,
                updated.id,
                space.version,
            ],
        )
        .map_err(|e| map_write_err(&updated.uid, e))?;
    if changed == 0 {
        return Err(StoreError::VersionConflict);
    }
    Ok(updated)
}

// MARK: - Transaction scope

struct SqliteTx<'a> {
    tx: &'a rusqlite::Transaction<'a>,
}

impl NamespaceTx for SqliteTx<'_> {
    fn update_space_opt_lock(
        &mut self,
        space: &Space,
        mutate: &mut dyn FnMut(&mut Space),
    ) -> std::result::Result<Space, StoreError> {
        update_space_opt_q(self.tx, space, mutate)
    }

    fn find_primary_path_locked(
        &mut self,
        target_type: PathTargetType,
        target_id: i64,
    ) -> std::result::Result<SpacePath, StoreError> {
        // exclusivity comes from the connection mutex held by the scope
        find_primary_path_q(self.tx, target_type, target_id)
    }

    fn find_primary_path(
        &self,
        target_type: PathTargetType,
        target_id: i64,
    ) -> std::result::Result<SpacePath, StoreError> {
        find_primary_path_q(self.tx, target_type, target_id)
    }

    fn list_primary_descendants_locked(
        &mut self,
        prefix: &str,
    ) -> std::result::Result<Vec<SpacePath>, StoreError> {
        // byte range over the BINARY collation: LIKE would need wildcard
        // escaping and substr counts characters, not bytes
        let lower = format!("{}{}", prefix, paths::PATH_SEPARATOR);
        let upper = format!("{}{}", prefix, (paths::PATH_SEPARATOR as u8 + 1) as char);
        let mut stmt = self
            .tx
            .prepare(&format!(
                "SELECT {} FROM paths
                 WHERE is_primary = 1 AND value >= ?1 AND value < ?2
                 ORDER BY value",
                PATH_COLUMNS
            ))
            .map_err(|e| storage("list descendants", e))?;
        let rows = stmt
            .query_map(params![lower, upper], row_to_path)
            .map_err(|e| storage("list descendants", e))?;
        let mut found = Vec::new();
        for row in rows {
            found.push(row.map_err(|e| storage("list descendants", e))?);
        }
        Ok(found)
    }

    fn update_path(&mut self, path: &mut SpacePath) -> std::result::Result<(), StoreError> {
        let changed = self
            .tx
            .execute(
                "UPDATE paths SET value = ?1, is_primary = ?2, version = ?3, updated = ?4
                 WHERE id = ?5",
                params![
                    path.value,
                    path.is_primary,
                    path.version + 1,
                    millis(Utc::now()),
                    path.id,
                ],
            )
            .map_err(|e| map_write_err(&path.value, e))?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("path {}", path.id)));
        }
        path.version += 1;
        path.updated = Utc::now();
        Ok(())
    }

    fn create_path(&mut self, path: &SpacePath) -> std::result::Result<SpacePath, StoreError> {
        create_path_q(self.tx, path)
    }

    fn sync_space_path(
        &mut self,
        space_id: i64,
        path: &str,
    ) -> std::result::Result<(), StoreError> {
        let changed = self
            .tx
            .execute(
                "UPDATE spaces SET path = ?1, version = version + 1, updated = ?2 WHERE id = ?3",
                params![path, millis(Utc::now()), space_id],
            )
            .map_err(|e| storage("sync space path", e))?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("space {}", space_id)));
        }
        Ok(())
    }
}

// MARK: - Store implementation

impl NamespaceStore for SqliteNamespaceStore {
    fn find_space_by_ref(&self, space_ref: &str) -> std::result::Result<Space, StoreError> {
        let conn = self.lock()?;
        if let Ok(id) = space_ref.parse::<i64>() {
            return find_space_q(&conn, id);
        }
        conn.query_row(
            &format!(
                "SELECT {} FROM spaces s
                 JOIN paths p ON p.target_type = 'space' AND p.target_id = s.id AND p.is_primary = 1
                 WHERE p.value = ?1",
                "s.id, s.uid, s.parent_id, s.path, s.description, s.created_by, s.created, s.updated, s.version"
            ),
            params![space_ref],
            row_to_space,
        )
        .optional()
        .map_err(|e| storage("find space by ref", e))?
        .ok_or_else(|| StoreError::NotFound(format!("space '{}'", space_ref)))
    }

    fn find_space(&self, id: i64) -> std::result::Result<Space, StoreError> {
        let conn = self.lock()?;
        find_space_q(&conn, id)
    }

    fn find_primary_path(
        &self,
        target_type: PathTargetType,
        target_id: i64,
    ) -> std::result::Result<SpacePath, StoreError> {
        let conn = self.lock()?;
        find_primary_path_q(&conn, target_type, target_id)
    }

    fn create_space(
        &self,
        uid: &str,
        parent_id: i64,
        created_by: i64,
    ) -> std::result::Result<Space, StoreError> {
        let conn = self.lock()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| storage("begin create space", e))?;

        let value = if parent_id == ROOT_PARENT_ID {
            uid.to_string()
        } else {
            let parent = find_primary_path_q(&tx, PathTargetType::Space, parent_id)?;
            paths::concatenate(&parent.value, uid)
        };

        let now = Utc::now();
        tx.execute(
            "INSERT INTO spaces (uid, parent_id, path, description, created_by, created, updated, version)
             VALUES (?1, ?2, ?3, '', ?4, ?5, ?5, 0)",
            params![uid, parent_id, value, created_by, millis(now)],
        )
        .map_err(|e| map_write_err(&value, e))?;
        let id = tx.last_insert_rowid();

        create_path_q(
            &tx,
            &SpacePath {
                id: 0,
                version: 0,
                value: value.clone(),
                is_primary: true,
                target_type: PathTargetType::Space,
                target_id: id,
                created_by,
                created: now,
                updated: now,
            },
        )?;
        tx.commit().map_err(|e| storage("commit create space", e))?;

        Ok(Space {
            id,
            uid: uid.to_string(),
            parent_id,
            path: value,
            description: String::new(),
            created_by,
            created: now,
            updated: now,
            version: 0,
        })
    }

    fn create_path(&self, path: &SpacePath) -> std::result::Result<SpacePath, StoreError> {
        let conn = self.lock()?;
        create_path_q(&conn, path)
    }

    fn list_paths(
        &self,
        target_type: PathTargetType,
        target_id: i64,
    ) -> std::result::Result<Vec<SpacePath>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM paths WHERE target_type = ?1 AND target_id = ?2 ORDER BY value",
                PATH_COLUMNS
            ))
            .map_err(|e| storage("list paths", e))?;
        let rows = stmt
            .query_map(params![target_type.as_str(), target_id], row_to_path)
            .map_err(|e| storage("list paths", e))?;
        let mut found = Vec::new();
        for row in rows {
            found.push(row.map_err(|e| storage("list paths", e))?);
        }
        Ok(found)
    }

    fn all_paths(&self) -> std::result::Result<Vec<SpacePath>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!("SELECT {} FROM paths ORDER BY value", PATH_COLUMNS))
            .map_err(|e| storage("all paths", e))?;
        let rows = stmt
            .query_map([], row_to_path)
            .map_err(|e| storage("all paths", e))?;
        let mut found = Vec::new();
        for row in rows {
            found.push(row.map_err(|e| storage("all paths", e))?);
        }
        Ok(found)
    }

    fn in_transaction(&self, f: &mut dyn FnMut(&mut dyn NamespaceTx) -> Result<()>) -> Result<()> {
        let conn = self
            .lock()
            .map_err(|e| NamespaceError::store("begin transaction", e))?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| NamespaceError::store("begin transaction", storage("begin", e)))?;
        let mut scope = SqliteTx { tx: &tx };
        // an early return drops the transaction, which rolls it back
        f(&mut scope)?;
        tx.commit()
            .map_err(|e| NamespaceError::store("commit", storage("commit", e)))?;
        Ok(())
    }
}
