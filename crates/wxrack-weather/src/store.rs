//! Durable snapshot persistence.
//!
//! The whole `SnapshotMap` is serialized to one JSON blob under a fixed key
//! in a key-value engine. SQLite backs the engine in production.

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Arc;

use crate::error::{Result, WeatherError};
use crate::types::SnapshotMap;

/// Key the snapshot map is stored under.
pub const SNAPSHOT_KEY: &str = "openweather";

/// Minimal byte-oriented key-value contract the snapshot cache needs.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    fn put(&self, key: &str, value: &[u8]) -> Result<()>;
}

/// SQLite-backed key-value store.
pub struct SqliteKvStore {
    conn: Mutex<Connection>,
}

impl SqliteKvStore {
    /// Open (or create) a store at the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store. Contents are lost on drop.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.lock().execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value BLOB NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        )?;
        Ok(())
    }
}

impl KeyValueStore for SqliteKvStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let value = self
            .conn
            .lock()
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, Vec<u8>>(0)
            })
            .optional()?;
        Ok(value)
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        let now = chrono::Utc::now().timestamp_millis();
        self.conn.lock().execute(
            "INSERT OR REPLACE INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)",
            params![key, value, now],
        )?;
        Ok(())
    }
}

/// Reads and writes the aggregated snapshot map.
#[derive(Clone)]
pub struct SnapshotStore {
    kv: Arc<dyn KeyValueStore>,
}

impl SnapshotStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Open a SQLite-backed snapshot store at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(Arc::new(SqliteKvStore::new(path)?)))
    }

    /// Read the persisted map. `Ok(None)` when nothing has been saved yet.
    pub fn load(&self) -> Result<Option<SnapshotMap>> {
        let Some(bytes) = self.kv.get(SNAPSHOT_KEY)? else {
            return Ok(None);
        };

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| WeatherError::StoreCorrupt(e.to_string()))
    }

    pub fn save(&self, snapshot: &SnapshotMap) -> Result<()> {
        let bytes = serde_json::to_vec(snapshot)
            .map_err(|e| WeatherError::StoreUnavailable(format!("serialize: {}", e)))?;
        self.kv.put(SNAPSHOT_KEY, &bytes)
    }

    /// `save` on the blocking pool, for callers on the async runtime.
    pub async fn persist(&self, snapshot: SnapshotMap) -> Result<()> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.save(&snapshot))
            .await
            .map_err(|e| WeatherError::StoreUnavailable(format!("save task failed: {}", e)))?
    }
}
