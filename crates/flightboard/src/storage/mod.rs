//! Storage layer for flightboard.
//!
//! This module provides `SQLite`-backed durable key/value storage, the
//! board's equivalent of origin-scoped browser storage. Progress and sort
//! state written here survive a reload of the board and restarts of the
//! process.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Well-known storage keys.
pub mod keys {
    /// Last successfully read distance to destination.
    pub const CURRENT_DISTANCE: &str = "currentDistance";
    /// Progress percentage derived from [`CURRENT_DISTANCE`].
    pub const PROGRESS_PERCENTAGE: &str = "progressPercentage";
    /// Index of the column the flight table was last sorted by.
    pub const SORT_COLUMN_INDEX: &str = "sortColumnIndex";
    /// Direction (`asc` or `desc`) of the last sort.
    pub const SORT_DIRECTION: &str = "sortDirection";

    /// Every key the board writes.
    pub const ALL: [&str; 4] = [
        CURRENT_DISTANCE,
        PROGRESS_PERCENTAGE,
        SORT_COLUMN_INDEX,
        SORT_DIRECTION,
    ];
}

/// Storage shared between the board's polling tasks.
pub type SharedStorage = Arc<Mutex<Storage>>;

/// A stored key/value pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// The key.
    pub key: String,
    /// The stored value.
    pub value: String,
    /// When the value was last written.
    pub updated_at: DateTime<Utc>,
}

/// Durable string key/value store.
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl Storage {
    /// Open or create a storage database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        migrations::initialize_schema(&conn)?;

        info!("Database opened at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory storage instance.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Wrap this storage for sharing between tasks.
    #[must_use]
    pub fn into_shared(self) -> SharedStorage {
        Arc::new(Mutex::new(self))
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM entries WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            r"
            INSERT INTO entries (key, value, updated_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            ",
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        debug!(key, value, "Stored entry");
        Ok(())
    }

    /// Remove `key`. Returns `true` if it was present.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn remove(&self, key: &str) -> Result<bool> {
        let affected = self
            .conn
            .execute("DELETE FROM entries WHERE key = ?1", [key])?;
        Ok(affected > 0)
    }

    /// Remove every entry. Returns the number removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn clear(&self) -> Result<usize> {
        let affected = self.conn.execute("DELETE FROM entries", [])?;
        if affected > 0 {
            info!("Cleared {} stored entries", affected);
        }
        Ok(affected)
    }

    /// All entries, ordered by key.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn entries(&self) -> Result<Vec<Entry>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key, value, updated_at FROM entries ORDER BY key")?;

        let entries = stmt
            .query_map([], |row| {
                let updated_at: String = row.get(2)?;
                Ok(Entry {
                    key: row.get(0)?,
                    value: row.get(1)?,
                    updated_at: DateTime::parse_from_rfc3339(&updated_at)
                        .map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc)),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(entries)
    }
}

/// Run `f` against shared storage, mapping a poisoned lock to an error.
///
/// # Errors
///
/// Returns an error if the lock is poisoned or `f` fails.
pub fn with_storage<T>(store: &SharedStorage, f: impl FnOnce(&Storage) -> Result<T>) -> Result<T> {
    let guard = store
        .lock()
        .map_err(|_| Error::internal("storage lock poisoned"))?;
    f(&guard)
}
