//! Database schema and migrations
//!
//! Uses SQLite with embedded migrations managed via PRAGMA user_version.
//! The database holds only the session history ring.

use crate::error::Result;
use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 2;

/// SQL migrations, indexed by version number
const MIGRATIONS: &[&str] = &[
    // Version 1: session history
    r#"
    CREATE TABLE IF NOT EXISTS session_history (
        id               INTEGER PRIMARY KEY AUTOINCREMENT,
        session_name     TEXT NOT NULL,
        project_name     TEXT NOT NULL,
        branch           TEXT NOT NULL,
        accessed_at      DATETIME NOT NULL
    );
    "#,
    // Version 2: index for most-recent-first scans
    r#"
    CREATE INDEX IF NOT EXISTS idx_session_history_recent
        ON session_history(accessed_at DESC, id DESC);
    "#,
];

/// Apply every migration newer than the stored `user_version`.
///
/// Each step runs in its own transaction together with the version bump, so
/// an interrupted upgrade resumes where it stopped.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    let current = get_schema_version(conn)?;
    if current > SCHEMA_VERSION {
        tracing::warn!(
            current,
            supported = SCHEMA_VERSION,
            "History database was written by a newer sesh"
        );
        return Ok(());
    }

    for (version, sql) in (1..=SCHEMA_VERSION).zip(MIGRATIONS).skip(current as usize) {
        tracing::info!(version, "Applying history migration");
        conn.execute_batch(&format!(
            "BEGIN;\n{sql}\nPRAGMA user_version = {version};\nCOMMIT;"
        ))?;
    }
    Ok(())
}

/// Schema version stored in `PRAGMA user_version` (0 for a new file).
pub fn get_schema_version(conn: &Connection) -> Result<i32> {
    Ok(conn.query_row("PRAGMA user_version", [], |r| r.get(0))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), 0);

        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_resumes_from_partial_version() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(MIGRATIONS[0]).unwrap();
        conn.execute_batch("PRAGMA user_version = 1;").unwrap();

        run_migrations(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_history_table_and_index_created() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        for (kind, name) in [
            ("table", "session_history"),
            ("index", "idx_session_history_recent"),
        ] {
            let exists: i32 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type=?1 AND name=?2",
                    [kind, name],
                    |r| r.get(0),
                )
                .unwrap();
            assert_eq!(exists, 1, "{} {} should exist", kind, name);
        }
    }
}
