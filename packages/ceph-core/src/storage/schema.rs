//! # Key Store Schema
//!
//! SQL for the SQLite key store.
//!
//! ```text
//! ┌──────────────────────────┐     ┌──────────────────────────┐
//! │     schema_version       │     │   <collection>           │
//! ├──────────────────────────┤     ├──────────────────────────┤
//! │ version                  │     │ access_path  (PK)        │
//! └──────────────────────────┘     │ record       (JSON)      │
//!                                  │ updated_at   (unix secs) │
//!                                  └──────────────────────────┘
//! ```
//!
//! Collections are created on demand by `init`, so the table name is not
//! part of the fixed schema.

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// SQL to create the fixed tables
pub const CREATE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY
);
"#;

/// SQL to create a collection table
///
/// `name` must already be validated as an SQL identifier.
pub fn create_collection(name: &str) -> String {
    format!(
        r#"CREATE TABLE IF NOT EXISTS "{name}" (
    access_path TEXT PRIMARY KEY,
    record TEXT NOT NULL,
    updated_at INTEGER NOT NULL
);"#
    )
}

/// Insert-or-replace statement for a collection
pub fn upsert(name: &str) -> String {
    format!(
        r#"INSERT INTO "{name}" (access_path, record, updated_at)
VALUES (?1, ?2, strftime('%s', 'now'))
ON CONFLICT(access_path) DO UPDATE SET
    record = excluded.record,
    updated_at = excluded.updated_at"#
    )
}

/// Select statement for a collection
pub fn select(name: &str) -> String {
    format!(r#"SELECT record FROM "{name}" WHERE access_path = ?1"#)
}

/// Delete statement for a collection
pub fn delete(name: &str) -> String {
    format!(r#"DELETE FROM "{name}" WHERE access_path = ?1"#)
}
