//! SQLite-backed diagnosis case history.
//!
//! Every successful analyze call is persisted as one row; failed requests
//! never reach this store. The matched knowledge id is computed before the
//! insert, so a case is always written fully formed in a single statement.

use chrono::{DateTime, Utc};
use opsdiag_core::{AppError, AppResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

/// A persisted diagnosis case.
#[derive(Debug, Clone)]
pub struct CaseRecord {
    pub id: i64,
    pub alert_info: String,
    pub metrics_info: String,
    pub log_info: String,
    pub category: String,
    pub matched_knowledge_id: Option<i64>,
    /// The full parsed answer, serialized as JSON
    pub analysis_result: String,
    pub solution: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input to a case insert; the id and timestamps are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewCase<'a> {
    pub alert_info: &'a str,
    pub metrics_info: &'a str,
    pub log_info: &'a str,
    pub category: &'a str,
    pub matched_knowledge_id: Option<i64>,
    pub analysis_result: &'a str,
    pub solution: &'a str,
}

/// SQLite store for the case history.
pub struct CaseStore {
    conn: Mutex<Connection>,
}

impl CaseStore {
    /// Open (and initialize) the case database at the given path.
    pub fn open(db_path: &Path) -> AppResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AppError::Store(format!("Failed to create store directory: {}", e)))?;
        }

        let conn = Connection::open(db_path)
            .map_err(|e| AppError::Store(format!("Failed to open case store: {}", e)))?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS cases (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                alert_info TEXT NOT NULL,
                metrics_info TEXT NOT NULL DEFAULT '',
                log_info TEXT NOT NULL DEFAULT '',
                category TEXT NOT NULL,
                matched_knowledge_id INTEGER,
                analysis_result TEXT NOT NULL,
                solution TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )
        .map_err(|e| AppError::Store(format!("Failed to create tables: {}", e)))?;

        tracing::debug!("Initialized case store at {:?}", db_path);
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Insert a completed case, returning its id.
    pub fn insert(&self, case: &NewCase<'_>) -> AppResult<i64> {
        let conn = self.lock()?;
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO cases (alert_info, metrics_info, log_info, category, \
             matched_knowledge_id, analysis_result, solution, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
            params![
                case.alert_info,
                case.metrics_info,
                case.log_info,
                case.category,
                case.matched_knowledge_id,
                case.analysis_result,
                case.solution,
                now
            ],
        )
        .map_err(|e| AppError::Store(format!("Failed to insert case: {}", e)))?;

        Ok(conn.last_insert_rowid())
    }

    /// Fetch a case by id.
    pub fn get(&self, id: i64) -> AppResult<Option<CaseRecord>> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, alert_info, metrics_info, log_info, category, \
             matched_knowledge_id, analysis_result, solution, created_at, updated_at \
             FROM cases WHERE id = ?1",
            params![id],
            row_to_case,
        )
        .optional()
        .map_err(|e| AppError::Store(format!("Failed to fetch case: {}", e)))
    }

    /// Number of persisted cases.
    pub fn count(&self) -> AppResult<usize> {
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM cases", [], |row| row.get(0))
            .map_err(|e| AppError::Store(format!("Failed to count cases: {}", e)))?;
        Ok(count as usize)
    }

    fn lock(&self) -> AppResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Internal("Case store lock poisoned".to_string()))
    }
}

fn row_to_case(row: &rusqlite::Row<'_>) -> rusqlite::Result<CaseRecord> {
    let created_at: String = row.get(8)?;
    let updated_at: String = row.get(9)?;
    Ok(CaseRecord {
        id: row.get(0)?,
        alert_info: row.get(1)?,
        metrics_info: row.get(2)?,
        log_info: row.get(3)?,
        category: row.get(4)?,
        matched_knowledge_id: row.get(5)?,
        analysis_result: row.get(6)?,
        solution: row.get(7)?,
        created_at: created_at.parse().unwrap_or_else(|_| Utc::now()),
        updated_at: updated_at.parse().unwrap_or_else(|_| Utc::now()),
    })
}
