//! Database repository layer
//!
//! Query and insert operations for the session history table.

use crate::error::Result;
use crate::types::HistoryEntry;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Fixed-width UTC timestamps so text ordering matches time ordering.
fn encode_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

/// Database handle with a single connection
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create a database at the given path
    pub fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // WAL so concurrent invocations don't block each other for long
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA busy_timeout = 2000;
            ",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run migrations on this database
    pub fn migrate(&self) -> Result<()> {
        super::schema::run_migrations(&self.connection())
    }

    /// Get the underlying connection (for advanced use)
    pub fn connection(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ============================================
    // Session history operations
    // ============================================

    /// Append a history entry, returning its id
    pub fn append_history(
        &self,
        session_name: &str,
        project_name: &str,
        branch: &str,
        accessed_at: DateTime<Utc>,
    ) -> Result<i64> {
        let conn = self.connection();
        conn.execute(
            r#"
            INSERT INTO session_history (session_name, project_name, branch, accessed_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![session_name, project_name, branch, encode_ts(accessed_at)],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Most recent entry whose session differs from `exclude`.
    ///
    /// `exclude` is a folded session key; stored names are folded the same
    /// way before comparing. Ties on `accessed_at` are broken by insertion
    /// order.
    pub fn most_recent_excluding(&self, exclude: Option<&str>) -> Result<Option<HistoryEntry>> {
        let conn = self.connection();
        let entry = conn
            .query_row(
                r#"
                SELECT id, session_name, project_name, branch, accessed_at
                FROM session_history
                WHERE ?1 IS NULL
                   OR REPLACE(REPLACE(session_name, '.', '_'), ':', '_') != ?1
                ORDER BY accessed_at DESC, id DESC
                LIMIT 1
                "#,
                params![exclude],
                Self::row_to_history,
            )
            .optional()?;
        Ok(entry)
    }

    /// Remove one entry; returns whether it existed
    pub fn delete_history(&self, id: i64) -> Result<bool> {
        let conn = self.connection();
        let removed = conn.execute("DELETE FROM session_history WHERE id = ?1", params![id])?;
        Ok(removed > 0)
    }

    /// Newest entries first
    pub fn recent_history(&self, limit: usize) -> Result<Vec<HistoryEntry>> {
        let conn = self.connection();
        let mut stmt = conn.prepare(
            r#"
            SELECT id, session_name, project_name, branch, accessed_at
            FROM session_history
            ORDER BY accessed_at DESC, id DESC
            LIMIT ?1
            "#,
        )?;
        let entries = stmt
            .query_map(params![limit as i64], Self::row_to_history)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }

    /// Delete entries accessed before `cutoff`, returning how many were removed
    pub fn prune_history_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let conn = self.connection();
        let removed = conn.execute(
            "DELETE FROM session_history WHERE accessed_at < ?1",
            params![encode_ts(cutoff)],
        )?;
        Ok(removed)
    }

    fn row_to_history(row: &Row) -> rusqlite::Result<HistoryEntry> {
        let accessed_at: String = row.get("accessed_at")?;
        Ok(HistoryEntry {
            id: row.get("id")?,
            session_name: row.get("session_name")?,
            project_name: row.get("project_name")?,
            branch: row.get("branch")?,
            accessed_at: decode_ts(&accessed_at),
        })
    }
}
