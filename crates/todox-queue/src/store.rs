//! SQLite storage for queued records.
//!
//! A [`Store`] wraps one connection and is dropped at the end of every queue
//! operation, so a schema upgrade by another process is picked up on the
//! next call instead of contending with a long-lived handle.

use std::fs;

use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, info};

use crate::config::QueueConfig;
use crate::error::{QueueError, Result};

/// Schema version stored in `PRAGMA user_version` once all migrations ran.
pub const SCHEMA_VERSION: i64 = 3;

pub struct Migration {
    pub version: i64,
    pub name: &'static str,
    pub up: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_updates",
        up: "CREATE TABLE IF NOT EXISTS updates (
                id TEXT PRIMARY KEY,
                payload TEXT NOT NULL
            );",
    },
    Migration {
        version: 2,
        name: "add_updated_at",
        up: "ALTER TABLE updates ADD COLUMN updated_at INTEGER NOT NULL DEFAULT 0;",
    },
    Migration {
        version: 3,
        name: "index_updated_at",
        up: "CREATE INDEX IF NOT EXISTS updates_updated_at ON updates (updated_at);",
    },
];

/// A stored row: record id and its JSON payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRow {
    pub id: String,
    pub payload: String,
}

pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (creating if needed) and migrate the store at `config.path`.
    pub fn open(config: &QueueConfig) -> Result<Self> {
        let path = config.path.as_path();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| QueueError::Io {
                operation: "create directory",
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let unavailable = |source| QueueError::StoreUnavailable {
            path: path.to_path_buf(),
            source,
        };
        let conn = Connection::open(path).map_err(unavailable)?;
        conn.busy_timeout(config.busy_timeout()).map_err(unavailable)?;

        let mut store = Self { conn };
        store.run_migrations().map_err(unavailable)?;
        Ok(store)
    }

    #[cfg(test)]
    pub(crate) fn open_in_memory() -> Result<Self> {
        let mut store = Self {
            conn: Connection::open_in_memory()?,
        };
        store.run_migrations()?;
        Ok(store)
    }

    /// Apply every migration newer than `user_version`, one transaction each.
    fn run_migrations(&mut self) -> rusqlite::Result<()> {
        let current: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
            let tx = self.conn.transaction()?;
            tx.execute_batch(migration.up)?;
            tx.pragma_update(None, "user_version", migration.version)?;
            tx.commit()?;
            info!(
                version = migration.version,
                name = migration.name,
                "applied offline store migration"
            );
        }
        Ok(())
    }

    pub fn schema_version(&self) -> Result<i64> {
        Ok(self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?)
    }

    /// Insert or replace every row in one transaction.
    pub fn upsert_all(&mut self, rows: &[StoredRow], updated_at: i64) -> Result<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO updates (id, payload, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET payload = excluded.payload,
                                               updated_at = excluded.updated_at",
            )?;
            for row in rows {
                stmt.execute(params![row.id, row.payload, updated_at])?;
            }
        }
        tx.commit()?;
        debug!(rows = rows.len(), "upserted offline rows");
        Ok(())
    }

    /// All rows, ascending by id.
    pub fn load_all(&self) -> Result<Vec<StoredRow>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT id, payload FROM updates ORDER BY id")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(StoredRow {
                    id: row.get(0)?,
                    payload: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn get(&self, id: &str) -> Result<Option<String>> {
        Ok(self
            .conn
            .query_row("SELECT payload FROM updates WHERE id = ?1", [id], |row| {
                row.get(0)
            })
            .optional()?)
    }

    /// Delete one row; returns whether it existed.
    pub fn delete(&self, id: &str) -> Result<bool> {
        let changed = self.conn.execute("DELETE FROM updates WHERE id = ?1", [id])?;
        Ok(changed > 0)
    }

    /// Delete rows whose payload is still the one given.
    ///
    /// Rows rewritten since `rows` was read are kept.
    pub fn delete_unchanged(&mut self, rows: &[StoredRow]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        let mut removed = 0;
        {
            let mut stmt =
                tx.prepare_cached("DELETE FROM updates WHERE id = ?1 AND payload = ?2")?;
            for row in rows {
                removed += stmt.execute(params![row.id, row.payload])?;
            }
        }
        tx.commit()?;
        Ok(removed)
    }

    pub fn clear(&self) -> Result<usize> {
        Ok(self.conn.execute("DELETE FROM updates", [])?)
    }

    pub fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM updates", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}
