//! File-backed key-value store over SQLite, the native counterpart of the
//! dashboard's browser local storage.

use crate::persist::KeyValueStore;
use crate::schema;
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension};
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

/// SQLite-backed store.
///
/// Cheaply cloneable (via `Rc`); clones share the same connection, so one
/// file can back several handles in a single-threaded session.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Rc<RefCell<Connection>>,
}

impl SqliteStore {
    /// Opens (creating if needed) the store file and applies the schema.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        conn.execute_batch(schema::create_schema())?;
        log::info!("[FOC Debug] sqlite: opened store at {}", path.as_ref().display());
        Ok(Self {
            conn: Rc::new(RefCell::new(conn)),
        })
    }

    /// An in-memory store with the same schema, for tests and dry runs.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(schema::create_schema())?;
        Ok(Self {
            conn: Rc::new(RefCell::new(conn)),
        })
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.borrow();
        let value = conn
            .query_row("SELECT value FROM kv_store WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.borrow();
        conn.execute(
            "INSERT OR REPLACE INTO kv_store (key, value) VALUES (?1, ?2)",
            [key, value],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_store_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("foc-store-{name}-{}.sqlite", std::process::id()))
    }

    #[test]
    fn get_and_set_round_trip() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        assert_eq!(store.get("k").unwrap(), None);

        store.set("k", "v1").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v1"));

        store.set("k", "v2").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v2"));
    }

    #[test]
    fn clones_share_the_same_connection() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let view = store.clone();
        store.set("shared", "yes").unwrap();
        assert_eq!(view.get("shared").unwrap().as_deref(), Some("yes"));
    }

    #[test]
    fn values_survive_reopening_the_file() {
        let path = temp_store_path("reopen");
        let _ = std::fs::remove_file(&path);

        {
            let mut store = SqliteStore::open(&path).unwrap();
            store.set("carried", "across").unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.get("carried").unwrap().as_deref(), Some("across"));

        let _ = std::fs::remove_file(&path);
    }
}
