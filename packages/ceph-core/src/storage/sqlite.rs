//! # SQLite Key Store
//!
//! Durable [`KeyStore`] backed by `rusqlite`.
//!
//! ```text
//! base_dir/
//! └── <database>.sqlite3
//!     ├── schema_version
//!     └── <collection>        one row per access path
//! ```
//!
//! Without a base directory the database lives in memory, which is useful
//! for tests.

use std::path::PathBuf;

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

use super::{schema, KeyRecord, KeyStore};
use crate::error::{Error, Result};

struct OpenStore {
    conn: Connection,
    collection: String,
}

/// Key store persisted in a SQLite file
pub struct SqliteKeyStore {
    base_dir: Option<PathBuf>,
    inner: Mutex<Option<OpenStore>>,
}

impl SqliteKeyStore {
    /// Create an uninitialized store rooted at `base_dir`
    ///
    /// `None` keeps the database in memory.
    pub fn new(base_dir: Option<PathBuf>) -> Self {
        Self {
            base_dir,
            inner: Mutex::new(None),
        }
    }

    /// Path of the database file for `database`, if file-backed
    pub fn database_path(&self, database: &str) -> Option<PathBuf> {
        self.base_dir
            .as_ref()
            .map(|dir| dir.join(format!("{}.sqlite3", database)))
    }

    fn open_connection(&self, database: &str) -> Result<Connection> {
        match self.database_path(database) {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        Error::StorageWriteError(format!("Failed to create {}: {}", parent.display(), e))
                    })?;
                }
                Connection::open(&path)
                    .map_err(|e| Error::DatabaseError(format!("Failed to open database: {}", e)))
            }
            None => Connection::open_in_memory().map_err(|e| {
                Error::DatabaseError(format!("Failed to create in-memory database: {}", e))
            }),
        }
    }

    fn with_store<T>(&self, f: impl FnOnce(&OpenStore) -> Result<T>) -> Result<T> {
        let inner = self.inner.lock();
        let store = inner.as_ref().ok_or(Error::StorageNotInitialized)?;
        f(store)
    }
}

/// Accept only `[A-Za-z_][A-Za-z0-9_]*` as a table name
fn validate_collection(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid || name.eq_ignore_ascii_case("schema_version") {
        return Err(Error::InvalidArgument(format!(
            "collection name is not a valid identifier: {:?}",
            name
        )));
    }
    Ok(())
}

/// Accept only names that stay inside the base directory
fn validate_database(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if !valid {
        return Err(Error::InvalidArgument(format!(
            "database name is not a valid file name: {:?}",
            name
        )));
    }
    Ok(())
}

fn init_schema(conn: &Connection, collection: &str) -> Result<()> {
    let version: Option<i32> = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| row.get(0))
        .ok();

    match version {
        None => {
            conn.execute_batch(schema::CREATE_TABLES)
                .map_err(|e| Error::DatabaseError(format!("Failed to create tables: {}", e)))?;
            conn.execute(
                "INSERT INTO schema_version (version) VALUES (?)",
                params![schema::SCHEMA_VERSION],
            )
            .map_err(|e| Error::DatabaseError(format!("Failed to set schema version: {}", e)))?;

            tracing::info!("Key store schema created (version {})", schema::SCHEMA_VERSION);
        }
        Some(v) if v > schema::SCHEMA_VERSION => {
            return Err(Error::DatabaseError(format!(
                "Key store schema version {} is newer than supported {}",
                v,
                schema::SCHEMA_VERSION
            )));
        }
        Some(v) => {
            tracing::debug!("Key store schema version {}", v);
        }
    }

    conn.execute_batch(&schema::create_collection(collection))
        .map_err(|e| Error::DatabaseError(format!("Failed to create collection: {}", e)))?;
    Ok(())
}

#[async_trait]
impl KeyStore for SqliteKeyStore {
    async fn init(&self, database: &str, collection: &str) -> Result<()> {
        validate_database(database)?;
        validate_collection(collection)?;

        let conn = self.open_connection(database)?;
        init_schema(&conn, collection)?;

        *self.inner.lock() = Some(OpenStore {
            conn,
            collection: collection.to_string(),
        });

        tracing::info!("SQLite key store ready ({}/{})", database, collection);
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.inner.lock().is_some()
    }

    async fn write_item(&self, key: &str, record: &KeyRecord) -> Result<()> {
        let json = String::from_utf8(record.to_json()?)
            .map_err(|e| Error::SerializationError(e.to_string()))?;

        self.with_store(|store| {
            store
                .conn
                .execute(&schema::upsert(&store.collection), params![key, json])
                .map_err(|e| Error::StorageWriteError(e.to_string()))?;
            Ok(())
        })
    }

    async fn read_item(&self, key: &str) -> Result<Option<KeyRecord>> {
        let json: Option<String> = self.with_store(|store| {
            store
                .conn
                .query_row(&schema::select(&store.collection), params![key], |row| {
                    row.get(0)
                })
                .optional()
                .map_err(|e| Error::StorageReadError(e.to_string()))
        })?;

        json.map(|json| KeyRecord::from_json(json.as_bytes()))
            .transpose()
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        self.with_store(|store| {
            store
                .conn
                .execute(&schema::delete(&store.collection), params![key])
                .map_err(|e| Error::StorageWriteError(e.to_string()))?;
            Ok(())
        })
    }
}
