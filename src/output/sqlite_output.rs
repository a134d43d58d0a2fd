//! SQLite report writer
//!
//! Each run appends one row to `runs` and its export rows to
//! `category_rows`, so a database can hold the history of many runs.

use crate::output::export::ExportSection;
use crate::output::traits::{OutputResult, ReportWriter, RunSummary};
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};

/// SQL schema for the report database
pub const SCHEMA_SQL: &str = r#"
-- One row per crawl run
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT NOT NULL,
    config_hash TEXT NOT NULL,
    roots INTEGER NOT NULL,
    expanded INTEGER NOT NULL,
    no_children INTEGER NOT NULL,
    failed INTEGER NOT NULL,
    peak_sessions INTEGER NOT NULL,
    elapsed_ms INTEGER NOT NULL
);

-- Exported rows, in section and row order
CREATE TABLE IF NOT EXISTS category_rows (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    section TEXT NOT NULL,
    position INTEGER NOT NULL,
    label TEXT NOT NULL,
    level INTEGER NOT NULL,
    path TEXT NOT NULL,
    kind TEXT NOT NULL,
    detail TEXT
);

CREATE INDEX IF NOT EXISTS idx_category_rows_run ON category_rows(run_id);
CREATE INDEX IF NOT EXISTS idx_category_rows_section ON category_rows(run_id, section);
"#;

/// Initializes the report schema
pub fn initialize_schema(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)
}

/// Writes reports into a SQLite database file
#[derive(Debug, Clone)]
pub struct SqliteReport {
    path: PathBuf,
}

impl SqliteReport {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> OutputResult<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )?;
        initialize_schema(&conn)?;
        Ok(conn)
    }
}

impl ReportWriter for SqliteReport {
    fn write(&self, summary: &RunSummary, sections: &[ExportSection]) -> OutputResult<PathBuf> {
        let mut conn = self.open()?;
        let run_id = insert_report(&mut conn, summary, sections)?;
        tracing::debug!("Stored run {} in {}", run_id, self.path.display());
        Ok(self.path.clone())
    }
}

/// Inserts one run and all of its rows in a single transaction
///
/// # Returns
///
/// The id of the new `runs` row
pub fn insert_report(
    conn: &mut Connection,
    summary: &RunSummary,
    sections: &[ExportSection],
) -> OutputResult<i64> {
    let tx = conn.transaction()?;

    tx.execute(
        "INSERT INTO runs (started_at, finished_at, config_hash, roots, expanded, no_children, failed, peak_sessions, elapsed_ms)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            summary.started_at.to_rfc3339(),
            summary.finished_at.to_rfc3339(),
            summary.config_hash,
            summary.roots as i64,
            summary.counts.expanded as i64,
            summary.counts.no_children as i64,
            summary.counts.failed as i64,
            summary.peak_active as i64,
            summary.elapsed.as_millis() as i64,
        ],
    )?;
    let run_id = tx.last_insert_rowid();

    {
        let mut stmt = tx.prepare(
            "INSERT INTO category_rows (run_id, section, position, label, level, path, kind, detail)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )?;

        for section in sections {
            for (position, row) in section.rows.iter().enumerate() {
                stmt.execute(params![
                    run_id,
                    section.name,
                    position as i64,
                    row.label,
                    row.level,
                    row.path,
                    row.kind.to_db_string(),
                    row.detail,
                ])?;
            }
        }
    }

    tx.commit()?;
    Ok(run_id)
}
