//! SQLite-backed key-value store.
//!
//! # Responsibility
//! - Provide durable blob storage under a named scope.
//! - Configure connection pragmas before first use.
//!
//! # Invariants
//! - Returned stores have the `kv` table created and `foreign_keys=ON`.
//! - Writes are upserts; a key holds exactly one value per scope.

use log::{error, info};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::time::{Duration, Instant};

use super::{KvStore, PersistResult};

const SCHEMA_KV: &str = "CREATE TABLE IF NOT EXISTS kv (
    scope TEXT NOT NULL,
    key TEXT NOT NULL,
    value BLOB NOT NULL,
    updated_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now') * 1000),
    PRIMARY KEY (scope, key)
);";

/// Durable `KvStore` over a SQLite blob table.
pub struct SqliteKvStore {
    conn: Connection,
    scope: String,
}

impl SqliteKvStore {
    /// Opens (or creates) a database file and prepares the blob table.
    pub fn open(path: impl AsRef<Path>, scope: impl Into<String>) -> PersistResult<Self> {
        let started_at = Instant::now();
        info!("event=kv_open module=persist status=start mode=file");

        let conn = match Connection::open(path) {
            Ok(conn) => conn,
            Err(err) => {
                error!(
                    "event=kv_open module=persist status=error mode=file duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                return Err(err.into());
            }
        };
        let store = Self::bootstrap(conn, scope.into())?;

        info!(
            "event=kv_open module=persist status=ok mode=file duration_ms={}",
            started_at.elapsed().as_millis()
        );
        Ok(store)
    }

    /// Opens an in-memory database, mainly for tests.
    pub fn open_in_memory(scope: impl Into<String>) -> PersistResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::bootstrap(conn, scope.into())
    }

    fn bootstrap(conn: Connection, scope: String) -> PersistResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch(SCHEMA_KV)?;
        Ok(Self { conn, scope })
    }
}

impl KvStore for SqliteKvStore {
    fn get(&self, key: &str) -> PersistResult<Option<Vec<u8>>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv WHERE scope = ?1 AND key = ?2;",
                params![self.scope, key],
                |row| row.get::<_, Vec<u8>>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &[u8]) -> PersistResult<()> {
        self.conn.execute(
            "INSERT INTO kv (scope, key, value) VALUES (?1, ?2, ?3)
             ON CONFLICT (scope, key) DO UPDATE SET
                value = excluded.value,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![self.scope, key, value],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::SqliteKvStore;
    use crate::persist::KvStore;

    #[test]
    fn set_then_get_roundtrips_bytes() {
        let mut kv = SqliteKvStore::open_in_memory("test").unwrap();
        kv.set("alpha", b"payload").unwrap();

        assert_eq!(kv.get("alpha").unwrap().as_deref(), Some(&b"payload"[..]));
        assert!(kv.get("beta").unwrap().is_none());
    }

    #[test]
    fn set_overwrites_existing_value() {
        let mut kv = SqliteKvStore::open_in_memory("test").unwrap();
        kv.set("alpha", b"one").unwrap();
        kv.set("alpha", b"two").unwrap();

        assert_eq!(kv.get("alpha").unwrap().as_deref(), Some(&b"two"[..]));
    }

    #[test]
    fn scopes_are_isolated_within_one_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kv.sqlite3");

        let mut first = SqliteKvStore::open(&path, "first").unwrap();
        first.set("alpha", b"one").unwrap();
        drop(first);

        let second = SqliteKvStore::open(&path, "second").unwrap();
        assert!(second.get("alpha").unwrap().is_none());

        let first_again = SqliteKvStore::open(&path, "first").unwrap();
        assert_eq!(
            first_again.get("alpha").unwrap().as_deref(),
            Some(&b"one"[..])
        );
    }
}
