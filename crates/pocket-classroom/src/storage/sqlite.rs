//! `SQLite`-backed record store.

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info, trace, warn};

use super::{migrations, RecordStore, WriteOp};
use crate::error::{Error, Result};

const MEMORY_PATH: &str = ":memory:";

const UPSERT_SQL: &str = r"
INSERT INTO records (key, value, updated_at)
VALUES (?1, ?2, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
";

/// Durable record store in a single `SQLite` file.
#[derive(Debug)]
pub struct SqliteStore {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl SqliteStore {
    /// Open or create a store at the given path.
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
        let conn = Connection::open(&path).map_err(|source| {
            warn!("Failed to open database at {}: {}", path.display(), source);
            Error::DatabaseOpen {
                path: path.clone(),
                source,
            }
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        migrations::initialize_schema(&conn)?;

        info!("Database opened at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory store for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(MEMORY_PATH),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(MEMORY_PATH),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Count stored records.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;
        Ok(count)
    }
}

fn logged(op: &str, key: &str, err: rusqlite::Error) -> Error {
    warn!("Storage {} failed for {}: {}", op, key, err);
    Error::DatabaseQuery(err)
}

impl RecordStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.conn
            .query_row("SELECT value FROM records WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()
            .map_err(|e| logged("read", key, e))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.conn
            .execute(UPSERT_SQL, params![key, value])
            .map_err(|e| logged("write", key, e))?;
        trace!("Stored {} ({} bytes)", key, value.len());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let affected = self
            .conn
            .execute("DELETE FROM records WHERE key = ?1", [key])
            .map_err(|e| logged("delete", key, e))?;
        Ok(affected > 0)
    }

    fn apply(&self, batch: &[WriteOp]) -> Result<()> {
        // Dropping the transaction on an early return rolls it back
        let tx = self.conn.unchecked_transaction()?;
        for op in batch {
            match op {
                WriteOp::Put { key, value } => {
                    tx.execute(UPSERT_SQL, params![key, value])
                        .map_err(|e| logged("write", key, e))?;
                }
                WriteOp::Delete { key } => {
                    tx.execute("DELETE FROM records WHERE key = ?1", [key])
                        .map_err(|e| logged("delete", key, e))?;
                }
            }
        }
        tx.commit()?;
        debug!("Committed batch of {} operations", batch.len());
        Ok(())
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        // substr comparison avoids LIKE wildcard handling of '_' in prefixes
        let mut stmt = self.conn.prepare(
            r"
            SELECT key FROM records
            WHERE substr(key, 1, length(?1)) = ?1
            ORDER BY key
            ",
        )?;
        let keys = stmt
            .query_map([prefix], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(keys)
    }

    fn size_bytes(&self) -> u64 {
        if self.path.as_os_str() == MEMORY_PATH {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        }
    }
}
