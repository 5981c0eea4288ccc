use std::fs;
use std::path::Path;
use std::time::Duration;

use log::info;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OptionalExtension};

use crate::error::LivePulseError;

const SCHEMA_VERSION: &str = "1";
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);
const POOL_SIZE: u32 = 4;

const CREATE_SCHEMA_SQL: &str = r#"
BEGIN TRANSACTION;

CREATE TABLE IF NOT EXISTS meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

INSERT OR IGNORE INTO meta (key, value) VALUES ('schema_version', '1');

-- live_id is whatever the user typed: a bare video id or a watch URL
CREATE TABLE IF NOT EXISTS live_status (
    live_id TEXT PRIMARY KEY,
    status INTEGER NOT NULL DEFAULT 0,
    error_message TEXT
);

COMMIT;
"#;

/// Pooled SQLite handle. Cheap to clone; the loop and the request handlers
/// each hold one.
#[derive(Clone)]
pub struct Database {
    pool: Pool<SqliteConnectionManager>,
}

impl Database {
    pub fn open(db_path: &Path) -> Result<Self, LivePulseError> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let manager = SqliteConnectionManager::file(db_path)
            .with_init(|conn| conn.busy_timeout(BUSY_TIMEOUT));
        let pool = Pool::builder().max_size(POOL_SIZE).build(manager)?;

        let db = Self { pool };
        db.ensure_schema()?;

        info!("Database opened at: {}", db_path.display());
        Ok(db)
    }

    pub fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, LivePulseError> {
        Ok(self.pool.get()?)
    }

    fn ensure_schema(&self) -> Result<(), LivePulseError> {
        let conn = self.conn()?;
        conn.execute_batch(CREATE_SCHEMA_SQL)?;

        match Self::get_meta_value(&conn, "schema_version")?.as_deref() {
            Some(SCHEMA_VERSION) => Ok(()), // Schema is up to date
            Some(other) => Err(LivePulseError::Error(format!(
                "Schema version mismatch: database has {}, expected {}",
                other, SCHEMA_VERSION
            ))),
            None => Err(LivePulseError::Error("Schema version missing".to_string())),
        }
    }

    pub fn get_meta_value(conn: &Connection, key: &str) -> Result<Option<String>, LivePulseError> {
        let value = conn
            .query_row("SELECT value FROM meta WHERE key = ?", [key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }
}
