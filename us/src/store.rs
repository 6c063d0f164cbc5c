//! Core UserStore implementation

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{Connection, OptionalExtension, params};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::record::User;

/// Errors from durable-store operations.
///
/// These never reach service callers: the write-behind path absorbs and
/// logs them, and bootstrap logs and stops streaming. They surface only to
/// code that talks to the store directly (startup, tests).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("failed to create store directory: {0}")]
    Io(#[from] std::io::Error),
}

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    lastName TEXT NOT NULL
)";

/// Owner of the SQLite connection for the process lifetime.
///
/// All methods are blocking; async code reaches them through
/// [`crate::spawn_writer`] or [`UserStore::stream_all`], which hop to the
/// blocking pool.
pub struct UserStore {
    conn: Mutex<Connection>,
}

impl UserStore {
    /// Open or create the database at the given path and apply the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute(SCHEMA, [])?;

        debug!(path = %path.display(), "opened user store");
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Open a throwaway in-memory database (tests).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute(SCHEMA, [])?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // A poisoned lock only means a writer task panicked mid-statement;
        // the connection itself is still usable.
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Insert or replace a row.
    pub fn upsert(&self, user: &User) -> Result<(), StoreError> {
        self.conn().execute(
            "INSERT OR REPLACE INTO users (id, name, lastName) VALUES (?1, ?2, ?3)",
            params![user.id, user.name, user.last_name],
        )?;
        Ok(())
    }

    /// Overwrite name/lastName for an existing row. A missing row is not an
    /// error here; the registry already answered the caller.
    pub fn update(&self, user: &User) -> Result<(), StoreError> {
        self.conn().execute(
            "UPDATE users SET name = ?1, lastName = ?2 WHERE id = ?3",
            params![user.name, user.last_name, user.id],
        )?;
        Ok(())
    }

    /// Delete a row by id.
    pub fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.conn().execute("DELETE FROM users WHERE id = ?1", params![id])?;
        Ok(())
    }

    /// Fetch a single row by id.
    pub fn get(&self, id: &str) -> Result<Option<User>, StoreError> {
        let conn = self.conn();
        let user = conn
            .query_row(
                "SELECT id, name, lastName FROM users WHERE id = ?1",
                params![id],
                |row| {
                    Ok(User {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        last_name: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(user)
    }

    /// Number of persisted rows.
    pub fn count(&self) -> Result<usize, StoreError> {
        let n: i64 = self.conn().query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    /// Stream every persisted row through a bounded channel, exactly once.
    ///
    /// This is the bootstrap source: a blocking task walks the table and
    /// sends each row; the receiver is not restartable. A read error logs
    /// and closes the channel early - whatever was streamed before the
    /// failure stands.
    pub fn stream_all(self: &Arc<Self>) -> mpsc::Receiver<User> {
        let (tx, rx) = mpsc::channel(crate::QUEUE_CAPACITY);
        let store = Arc::clone(self);

        tokio::task::spawn_blocking(move || {
            if let Err(e) = store.stream_rows(&tx) {
                warn!(error = %e, "bootstrap stream aborted");
            }
        });

        rx
    }

    fn stream_rows(&self, tx: &mpsc::Sender<User>) -> Result<(), StoreError> {
        // Read under the lock, send after releasing it: a send can block on
        // channel backpressure and must not hold the connection hostage
        // while the write-behind loop needs it.
        let users = {
            let conn = self.conn();
            let mut stmt = conn.prepare("SELECT id, name, lastName FROM users")?;
            let rows = stmt.query_map([], |row| {
                Ok(User {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    last_name: row.get(2)?,
                })
            })?;
            rows.collect::<Result<Vec<_>, _>>()?
        };

        let total = users.len();
        for user in users {
            if tx.blocking_send(user).is_err() {
                // Receiver gone; bootstrap was abandoned.
                debug!("bootstrap receiver dropped, stopping stream");
                return Ok(());
            }
        }

        info!(count = total, "streamed persisted users for bootstrap");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_creates_schema_and_parent_dirs() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("nested").join("users.db");

        let store = UserStore::open(&path).unwrap();
        assert_eq!(store.count().unwrap(), 0);
        assert!(path.exists());
    }

    #[test]
    fn test_upsert_get_update_delete() {
        let store = UserStore::in_memory().unwrap();

        let user = User::with_id("u-1", "Ada", "Lovelace");
        store.upsert(&user).unwrap();
        assert_eq!(store.get("u-1").unwrap(), Some(user.clone()));
        assert_eq!(store.count().unwrap(), 1);

        // Upsert with the same id replaces
        let replaced = User::with_id("u-1", "Grace", "Hopper");
        store.upsert(&replaced).unwrap();
        assert_eq!(store.get("u-1").unwrap(), Some(replaced));
        assert_eq!(store.count().unwrap(), 1);

        let updated = User::with_id("u-1", "Grace", "Murray");
        store.update(&updated).unwrap();
        assert_eq!(store.get("u-1").unwrap().unwrap().last_name, "Murray");

        store.delete("u-1").unwrap();
        assert_eq!(store.get("u-1").unwrap(), None);
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_update_of_missing_row_is_not_an_error() {
        let store = UserStore::in_memory().unwrap();
        store.update(&User::with_id("ghost", "No", "One")).unwrap();
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_delete_of_missing_row_is_not_an_error() {
        let store = UserStore::in_memory().unwrap();
        store.delete("ghost").unwrap();
    }

    #[tokio::test]
    async fn test_stream_all_yields_every_row_exactly_once() {
        let store = Arc::new(UserStore::in_memory().unwrap());
        store.upsert(&User::with_id("u-1", "Ada", "Lovelace")).unwrap();
        store.upsert(&User::with_id("u-2", "Grace", "Hopper")).unwrap();
        store.upsert(&User::with_id("u-3", "Edsger", "Dijkstra")).unwrap();

        let mut rx = store.stream_all();
        let mut seen = Vec::new();
        while let Some(user) = rx.recv().await {
            seen.push(user.id);
        }

        seen.sort();
        assert_eq!(seen, vec!["u-1", "u-2", "u-3"]);
    }

    #[tokio::test]
    async fn test_stream_all_on_empty_store_closes_immediately() {
        let store = Arc::new(UserStore::in_memory().unwrap());
        let mut rx = store.stream_all();
        assert!(rx.recv().await.is_none());
    }
}
