use rusqlite::{params, OptionalExtension, Row};
use serde::Serialize;

use crate::database::Database;
use crate::error::LivePulseError;

/// A watched video as it is persisted.
///
/// `live_id` is the raw string supplied by the user and is the primary key.
/// It is never rewritten into canonical form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WatchedEntry {
    pub live_id: String,
    pub status: bool,
    pub error_message: Option<String>,
}

impl WatchedEntry {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(WatchedEntry {
            live_id: row.get(0)?,
            status: row.get(1)?,
            error_message: row.get(2)?,
        })
    }
}

/// Durable record of watched entries, keyed by raw `live_id`.
pub trait WatchStore: Send + Sync {
    fn list(&self) -> Result<Vec<WatchedEntry>, LivePulseError>;

    fn get(&self, live_id: &str) -> Result<Option<WatchedEntry>, LivePulseError>;

    /// Creates the entry if needed and overwrites its status fields.
    fn upsert(
        &self,
        live_id: &str,
        status: bool,
        error_message: Option<&str>,
    ) -> Result<WatchedEntry, LivePulseError>;

    /// Creates a fresh entry (not live, no error) unless one already exists.
    /// An existing entry is returned untouched.
    fn insert_if_missing(&self, live_id: &str) -> Result<WatchedEntry, LivePulseError>;

    /// Returns whether an entry was removed.
    fn delete(&self, live_id: &str) -> Result<bool, LivePulseError>;
}

impl WatchStore for Database {
    fn list(&self) -> Result<Vec<WatchedEntry>, LivePulseError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT live_id, status, error_message
            FROM live_status
            ORDER BY rowid ASC",
        )?;

        let rows = stmt.query_map([], WatchedEntry::from_row)?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }

        Ok(entries)
    }

    fn get(&self, live_id: &str) -> Result<Option<WatchedEntry>, LivePulseError> {
        let conn = self.conn()?;

        conn.query_row(
            "SELECT live_id, status, error_message FROM live_status WHERE live_id = ?",
            [live_id],
            WatchedEntry::from_row,
        )
        .optional()
        .map_err(LivePulseError::DatabaseError)
    }

    fn upsert(
        &self,
        live_id: &str,
        status: bool,
        error_message: Option<&str>,
    ) -> Result<WatchedEntry, LivePulseError> {
        let conn = self.conn()?;

        let entry = conn.query_row(
            "INSERT INTO live_status (live_id, status, error_message) VALUES (?1, ?2, ?3)
            ON CONFLICT(live_id) DO UPDATE SET
                status = excluded.status,
                error_message = excluded.error_message
            RETURNING live_id, status, error_message",
            params![live_id, status, error_message],
            WatchedEntry::from_row,
        )?;

        Ok(entry)
    }

    fn insert_if_missing(&self, live_id: &str) -> Result<WatchedEntry, LivePulseError> {
        let conn = self.conn()?;

        conn.execute(
            "INSERT OR IGNORE INTO live_status (live_id, status, error_message) VALUES (?, 0, NULL)",
            [live_id],
        )?;

        let entry = conn.query_row(
            "SELECT live_id, status, error_message FROM live_status WHERE live_id = ?",
            [live_id],
            WatchedEntry::from_row,
        )?;

        Ok(entry)
    }

    fn delete(&self, live_id: &str) -> Result<bool, LivePulseError> {
        let conn = self.conn()?;
        let removed = conn.execute("DELETE FROM live_status WHERE live_id = ?", [live_id])?;
        Ok(removed > 0)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn open_db() -> (TempDir, Database) {
        let dir = TempDir::new().unwrap();
        let db = Database::open(&dir.path().join("store.db")).unwrap();
        (dir, db)
    }

    #[test]
    fn test_insert_if_missing_is_idempotent() {
        let (_dir, db) = open_db();

        let first = db.insert_if_missing("dQw4w9WgXcQ").unwrap();
        assert_eq!(
            first,
            WatchedEntry { live_id: "dQw4w9WgXcQ".into(), status: false, error_message: None }
        );

        db.upsert("dQw4w9WgXcQ", true, None).unwrap();
        let second = db.insert_if_missing("dQw4w9WgXcQ").unwrap();
        assert!(second.status, "existing entry must not be reset");
        assert_eq!(db.list().unwrap().len(), 1);
    }

    #[test]
    fn test_upsert_creates_then_updates() {
        let (_dir, db) = open_db();

        let created = db.upsert("https://youtu.be/dQw4w9WgXcQ", false, Some("HTTP 500")).unwrap();
        assert_eq!(created.error_message.as_deref(), Some("HTTP 500"));

        let updated = db.upsert("https://youtu.be/dQw4w9WgXcQ", true, None).unwrap();
        assert_eq!(
            updated,
            WatchedEntry { live_id: "https://youtu.be/dQw4w9WgXcQ".into(), status: true, error_message: None }
        );
        assert_eq!(db.get("https://youtu.be/dQw4w9WgXcQ").unwrap(), Some(updated));
    }

    #[test]
    fn test_list_keeps_insertion_order_and_raw_keys() {
        let (_dir, db) = open_db();
        let keys = ["zzzzzzzzzzz", "https://www.youtube.com/watch?v=dQw4w9WgXcQ", "aaaaaaaaaaa"];
        for key in keys {
            db.insert_if_missing(key).unwrap();
        }

        let listed: Vec<String> = db.list().unwrap().into_iter().map(|e| e.live_id).collect();
        assert_eq!(listed, keys.to_vec());
    }

    #[test]
    fn test_delete_reports_presence() {
        let (_dir, db) = open_db();
        db.insert_if_missing("dQw4w9WgXcQ").unwrap();

        assert!(db.delete("dQw4w9WgXcQ").unwrap());
        assert!(!db.delete("dQw4w9WgXcQ").unwrap());
        assert_eq!(db.get("dQw4w9WgXcQ").unwrap(), None);
    }

    #[test]
    fn test_memory_store_matches_contract() {
        let store = memory::MemoryWatchStore::with_keys(&["a", "b"]);
        store.upsert("a", true, Some("note")).unwrap();
        assert!(store.get("a").unwrap().unwrap().status);
        assert!(store.delete("b").unwrap());
        assert!(!store.delete("b").unwrap());

        store.set_unavailable(true);
        assert!(store.list().is_err());
    }
}
