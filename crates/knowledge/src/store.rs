//! SQLite-backed knowledge store.
//!
//! The system of record for fault categories and knowledge entries. The
//! retrieval core only needs to enumerate entries and fetch one by id; the
//! mutating operations exist for the CRUD plumbing and for seeding.
//!
//! Mutations are NOT mirrored into the vector index here — the index is
//! refreshed by [`crate::sync::sync_all`] or by callers that choose to
//! dual-write. Until then, stale matches may surface.

use crate::types::KnowledgeEntry;
use chrono::Utc;
use opsdiag_core::{AppError, AppResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

/// Read interface the retrieval core depends on.
pub trait KnowledgeStore: Send + Sync {
    /// Enumerate all knowledge entries.
    fn list_all(&self) -> AppResult<Vec<KnowledgeEntry>>;

    /// Fetch a single entry by id.
    fn get(&self, id: i64) -> AppResult<Option<KnowledgeEntry>>;
}

/// SQLite implementation of the knowledge store.
pub struct SqliteKnowledgeStore {
    conn: Mutex<Connection>,
}

const SELECT_ENTRY: &str = "SELECT k.id, c.name, k.title, k.symptoms, k.solution, \
     k.created_at, k.updated_at \
     FROM knowledge k JOIN categories c ON k.category_id = c.id";

impl SqliteKnowledgeStore {
    /// Open (and initialize) the knowledge database at the given path.
    pub fn open(db_path: &Path) -> AppResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::Store(format!("Failed to create store directory: {}", e))
            })?;
        }

        let conn = Connection::open(db_path)
            .map_err(|e| AppError::Store(format!("Failed to open knowledge store: {}", e)))?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS categories (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                description TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS knowledge (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                category_id INTEGER NOT NULL,
                title TEXT NOT NULL,
                symptoms TEXT NOT NULL,
                solution TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (category_id) REFERENCES categories(id)
            );

            CREATE INDEX IF NOT EXISTS idx_knowledge_category ON knowledge(category_id);
            "#,
        )
        .map_err(|e| AppError::Store(format!("Failed to create tables: {}", e)))?;

        tracing::debug!("Initialized knowledge store at {:?}", db_path);
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create a category, returning its id. Reuses an existing category with
    /// the same name.
    pub fn create_category(&self, name: &str, description: &str) -> AppResult<i64> {
        let conn = self.lock()?;
        let now = Utc::now().to_rfc3339();

        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM categories WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| AppError::Store(format!("Failed to look up category: {}", e)))?;

        if let Some(id) = existing {
            return Ok(id);
        }

        conn.execute(
            "INSERT INTO categories (name, description, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?3)",
            params![name, description, now],
        )
        .map_err(|e| AppError::Store(format!("Failed to insert category: {}", e)))?;

        Ok(conn.last_insert_rowid())
    }

    /// Insert a knowledge entry, returning its id.
    pub fn create_entry(
        &self,
        category_id: i64,
        title: &str,
        symptoms: &str,
        solution: &str,
    ) -> AppResult<i64> {
        let conn = self.lock()?;
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO knowledge (category_id, title, symptoms, solution, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![category_id, title, symptoms, solution, now],
        )
        .map_err(|e| AppError::Store(format!("Failed to insert knowledge entry: {}", e)))?;

        Ok(conn.last_insert_rowid())
    }

    /// Update an existing entry's text fields.
    pub fn update_entry(
        &self,
        id: i64,
        title: &str,
        symptoms: &str,
        solution: &str,
    ) -> AppResult<()> {
        let conn = self.lock()?;
        let now = Utc::now().to_rfc3339();

        let changed = conn
            .execute(
                "UPDATE knowledge SET title = ?2, symptoms = ?3, solution = ?4, updated_at = ?5 \
                 WHERE id = ?1",
                params![id, title, symptoms, solution, now],
            )
            .map_err(|e| AppError::Store(format!("Failed to update knowledge entry: {}", e)))?;

        if changed == 0 {
            return Err(AppError::Store(format!("No knowledge entry with id {}", id)));
        }
        Ok(())
    }

    /// Delete an entry. No-op when absent.
    pub fn delete_entry(&self, id: i64) -> AppResult<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM knowledge WHERE id = ?1", params![id])
            .map_err(|e| AppError::Store(format!("Failed to delete knowledge entry: {}", e)))?;
        Ok(())
    }

    fn lock(&self) -> AppResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Internal("Knowledge store lock poisoned".to_string()))
    }
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<KnowledgeEntry> {
    let created_at: String = row.get(5)?;
    let updated_at: String = row.get(6)?;
    Ok(KnowledgeEntry {
        id: row.get(0)?,
        category: row.get(1)?,
        title: row.get(2)?,
        symptoms: row.get(3)?,
        solution: row.get(4)?,
        created_at: created_at
            .parse()
            .unwrap_or_else(|_| chrono::Utc::now()),
        updated_at: updated_at
            .parse()
            .unwrap_or_else(|_| chrono::Utc::now()),
    })
}

impl KnowledgeStore for SqliteKnowledgeStore {
    fn list_all(&self) -> AppResult<Vec<KnowledgeEntry>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!("{} ORDER BY k.id", SELECT_ENTRY))
            .map_err(|e| AppError::Store(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map([], row_to_entry)
            .map_err(|e| AppError::Store(format!("Failed to list knowledge entries: {}", e)))?;

        let mut entries = Vec::new();
        for row in rows {
            entries
                .push(row.map_err(|e| AppError::Store(format!("Failed to read row: {}", e)))?);
        }
        Ok(entries)
    }

    fn get(&self, id: i64) -> AppResult<Option<KnowledgeEntry>> {
        let conn = self.lock()?;
        conn.query_row(
            &format!("{} WHERE k.id = ?1", SELECT_ENTRY),
            params![id],
            row_to_entry,
        )
        .optional()
        .map_err(|e| AppError::Store(format!("Failed to fetch knowledge entry: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_store(dir: &TempDir) -> SqliteKnowledgeStore {
        SqliteKnowledgeStore::open(&dir.path().join("knowledge.db")).unwrap()
    }

    #[test]
    fn test_create_and_list_entries() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        let cat = store.create_category("network", "network faults").unwrap();
        let id1 = store
            .create_entry(cat, "Port flapping", "packet loss on uplink", "replace SFP")
            .unwrap();
        let id2 = store
            .create_entry(cat, "DNS outage", "resolution timeouts", "restart resolver")
            .unwrap();

        let all = store.list_all().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, id1);
        assert_eq!(all[0].category, "network");
        assert_eq!(all[1].id, id2);
        assert_eq!(all[1].symptoms, "resolution timeouts");
    }

    #[test]
    fn test_get_and_update() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        let cat = store.create_category("database", "").unwrap();
        let id = store
            .create_entry(cat, "Slow queries", "high latency on reads", "rebuild indexes")
            .unwrap();

        let entry = store.get(id).unwrap().unwrap();
        assert_eq!(entry.title, "Slow queries");

        store
            .update_entry(id, "Slow queries", "high read latency", "rebuild indexes")
            .unwrap();
        let updated = store.get(id).unwrap().unwrap();
        assert_eq!(updated.symptoms, "high read latency");

        assert!(store.get(9999).unwrap().is_none());
    }

    #[test]
    fn test_delete_is_noop_when_absent() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        assert!(store.delete_entry(123).is_ok());
    }

    #[test]
    fn test_category_reuse() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        let a = store.create_category("network", "").unwrap();
        let b = store.create_category("network", "other text").unwrap();
        assert_eq!(a, b);
    }
}
