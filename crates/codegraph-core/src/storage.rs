//! Storage Engine: a single-writer, WAL-journaled SQLite database shared by
//! the Graph Store and, on the fallback path, the Vector Index.
//!
//! One connection per process is handed out by [`StorageFactory`], keyed on
//! the canonical database path, mirroring the singleton discipline the
//! original partition manager enforced per-partition but generalized here to
//! a single non-partitioned database file.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use rusqlite::Connection;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::error::StorageError;

/// One migration: a monotonically increasing version, a human label, and
/// the DDL/DML to run.
pub struct Migration {
    pub version: u32,
    pub label: &'static str,
    pub sql: &'static str,
}

fn checksum(sql: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(sql.as_bytes());
    hex::encode(hasher.finalize())
}

mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().map(|b| format!("{b:02x}")).collect()
    }
}

/// A single shared handle to the engine's SQLite database.
///
/// Cloning is cheap: it shares the underlying connection behind a mutex, in
/// line with the engine's single-writer discipline (see concurrency model).
#[derive(Clone)]
pub struct Storage {
    conn: Arc<Mutex<Connection>>,
    path: PathBuf,
}

impl Storage {
    /// Open (creating if necessary) the database at `path` and run pending
    /// migrations.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(&path).map_err(|e| StorageError::Open {
            path: path.clone(),
            source: e,
        })?;

        configure_connection(&conn)?;
        run_migrations(&conn, migrations())?;

        info!(path = %path.display(), "storage engine opened");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path,
        })
    }

    /// Open an in-memory database. Used by tests and ephemeral callers.
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        configure_connection(&conn)?;
        run_migrations(&conn, migrations())?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: PathBuf::from(":memory:"),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `f` with exclusive access to the underlying connection.
    pub fn with_connection<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        let conn = self.conn.lock();
        f(&conn)
    }
}

fn configure_connection(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;
         PRAGMA temp_store = MEMORY;
         PRAGMA mmap_size = 268435456;
         PRAGMA cache_size = -10000;
         PRAGMA foreign_keys = ON;",
    )?;
    conn.busy_timeout(std::time::Duration::from_millis(5_000))?;
    Ok(())
}

fn migrations() -> &'static [Migration] {
    &[
        Migration {
            version: 1,
            label: "initial schema",
            sql: crate::graph_store::schema::SCHEMA_V1,
        },
        Migration {
            version: 2,
            label: "full-text search index",
            sql: crate::graph_store::schema::SCHEMA_V2_FTS,
        },
    ]
}

fn run_migrations(conn: &Connection, migrations: &[Migration]) -> Result<(), StorageError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL,
            checksum TEXT NOT NULL
        )",
    )?;

    for migration in migrations {
        let existing: Option<String> = conn
            .query_row(
                "SELECT checksum FROM schema_migrations WHERE version = ?1",
                [migration.version],
                |row| row.get(0),
            )
            .ok();

        let expected = checksum(migration.sql);

        match existing {
            Some(found) if found == expected => {
                debug!(version = migration.version, "migration already applied");
                continue;
            }
            Some(found) => {
                return Err(StorageError::ChecksumMismatch {
                    version: migration.version,
                    expected,
                    found,
                });
            }
            None => {
                info!(version = migration.version, label = migration.label, "applying migration");
                conn.execute_batch("BEGIN")?;
                let result = conn.execute_batch(migration.sql).and_then(|_| {
                    conn.execute(
                        "INSERT INTO schema_migrations (version, applied_at, checksum) VALUES (?1, ?2, ?3)",
                        rusqlite::params![
                            migration.version,
                            chrono_now(),
                            expected,
                        ],
                    )
                });
                match result {
                    Ok(_) => {
                        conn.execute_batch("COMMIT")?;
                    }
                    Err(e) => {
                        conn.execute_batch("ROLLBACK").ok();
                        warn!(version = migration.version, error = %e, "migration failed");
                        return Err(StorageError::MigrationFailed {
                            version: migration.version,
                            message: e.to_string(),
                        });
                    }
                }
            }
        }
    }

    Ok(())
}

fn chrono_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Hands out the single [`Storage`] handle per canonical database path.
#[derive(Default)]
pub struct StorageFactory {
    handles: Mutex<HashMap<PathBuf, Storage>>,
}

static FACTORY: OnceLock<StorageFactory> = OnceLock::new();

impl StorageFactory {
    pub fn global() -> &'static StorageFactory {
        FACTORY.get_or_init(StorageFactory::default)
    }

    /// Get or open the storage handle for `path`.
    pub fn get_or_open(&self, path: impl AsRef<Path>) -> Result<Storage, StorageError> {
        let canonical = canonicalize_best_effort(path.as_ref());
        let mut handles = self.handles.lock();
        match handles.entry(canonical.clone()) {
            Entry::Occupied(entry) => Ok(entry.get().clone()),
            Entry::Vacant(entry) => {
                let storage = Storage::open(&canonical)?;
                entry.insert(storage.clone());
                Ok(storage)
            }
        }
    }
}

fn canonicalize_best_effort(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_in_memory_runs_migrations() {
        let storage = Storage::open_in_memory().unwrap();
        storage
            .with_connection(|conn| {
                let count: i64 = conn
                    .query_row("SELECT COUNT(*) FROM schema_migrations", [], |r| r.get(0))
                    .unwrap();
                assert_eq!(count, 2);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn factory_returns_same_handle_for_same_path() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("graph.db");
        let factory = StorageFactory::default();
        let a = factory.get_or_open(&db_path).unwrap();
        let b = factory.get_or_open(&db_path).unwrap();
        assert_eq!(a.path(), b.path());
    }

    #[test]
    fn reopening_existing_db_does_not_reapply_migrations() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("graph.db");
        {
            let _storage = Storage::open(&db_path).unwrap();
        }
        let storage = Storage::open(&db_path).unwrap();
        storage
            .with_connection(|conn| {
                let count: i64 = conn
                    .query_row("SELECT COUNT(*) FROM schema_migrations", [], |r| r.get(0))
                    .unwrap();
                assert_eq!(count, 2);
                Ok(())
            })
            .unwrap();
    }
}
