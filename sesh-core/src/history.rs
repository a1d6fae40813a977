//! Session history ring
//!
//! An append-only log of successful switches, used by `pop` to find the
//! session visited before the current one. The backend stays authoritative
//! for whether a session exists; history only names candidates.

use crate::db::Database;
use crate::error::{Error, Result};
use crate::naming::session_key;
use crate::types::HistoryEntry;
use chrono::{Duration, Utc};

/// Thin layer over [`Database`] that applies history semantics.
pub struct History {
    db: Database,
}

impl History {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Open the history store at `path` and bring its schema up to date.
    pub fn open(path: &std::path::Path) -> Result<Self> {
        let db = Database::open(path)?;
        db.migrate()?;
        Ok(Self::new(db))
    }

    /// In-memory store for tests.
    pub fn in_memory() -> Result<Self> {
        let db = Database::open_in_memory()?;
        db.migrate()?;
        Ok(Self::new(db))
    }

    /// Append an entry for a session the user just switched to.
    ///
    /// Never fails the caller: storage errors are logged and swallowed.
    /// Returns the new entry's id when it was stored.
    pub fn record(&self, session_name: &str, project_name: &str, branch: &str) -> Option<i64> {
        match self
            .db
            .append_history(session_name, project_name, branch, Utc::now())
        {
            Ok(id) => {
                tracing::debug!(id, session = %session_name, "Recorded history entry");
                Some(id)
            }
            Err(e) => {
                tracing::warn!(session = %session_name, error = %e, "Failed to record session history");
                None
            }
        }
    }

    /// Take back an entry recorded for a switch that did not happen.
    pub fn forget(&self, id: i64) {
        if let Err(e) = self.db.delete_history(id) {
            tracing::warn!(id, error = %e, "Failed to remove history entry");
        }
    }

    /// Most recent session other than `current`.
    ///
    /// `current` is compared in folded form, so the name a backend reports
    /// after its own renaming still matches the name that was recorded.
    pub fn previous(&self, current: Option<&str>) -> Result<HistoryEntry> {
        let current = current.map(session_key);
        self.db
            .most_recent_excluding(current.as_deref())?
            .ok_or(Error::NoPreviousSession)
    }

    /// Drop entries older than `retention_days`. Zero keeps everything.
    pub fn prune(&self, retention_days: u32) -> Result<usize> {
        if retention_days == 0 {
            return Ok(0);
        }
        let cutoff = Utc::now() - Duration::days(i64::from(retention_days));
        let removed = self.db.prune_history_before(cutoff)?;
        if removed > 0 {
            tracing::info!(removed, retention_days, "Pruned session history");
        }
        Ok(removed)
    }

    /// Newest entries first, for display.
    pub fn recent(&self, limit: usize) -> Result<Vec<HistoryEntry>> {
        self.db.recent_history(limit)
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history_of(sessions: &[&str]) -> History {
        let history = History::in_memory().unwrap();
        let base = Utc::now() - Duration::minutes(10);
        for (i, s) in sessions.iter().enumerate() {
            history
                .database()
                .append_history(s, "p", s, base + Duration::seconds(i as i64))
                .unwrap();
        }
        history
    }

    #[test]
    fn test_previous_skips_current() {
        let history = history_of(&["A", "B", "C", "B", "A"]);
        let prev = history.previous(Some("A")).unwrap();
        assert_eq!(prev.session_name, "B");
    }

    #[test]
    fn test_previous_single_entry_is_current() {
        let history = history_of(&["A"]);
        assert!(matches!(
            history.previous(Some("A")),
            Err(Error::NoPreviousSession)
        ));
    }

    #[test]
    fn test_previous_empty() {
        let history = history_of(&[]);
        assert!(matches!(
            history.previous(Some("A")),
            Err(Error::NoPreviousSession)
        ));
        assert!(matches!(history.previous(None), Err(Error::NoPreviousSession)));
    }

    #[test]
    fn test_previous_matches_renamed_current() {
        let history = history_of(&["widgets-main", "widgets-v1.2"]);
        let prev = history.previous(Some("widgets-v1_2")).unwrap();
        assert_eq!(prev.session_name, "widgets-main");
    }

    #[test]
    fn test_forget_removes_recorded_entry() {
        let history = History::in_memory().unwrap();
        history.record("w-main", "github.com/a/w", "main");
        let id = history.record("w-dev", "github.com/a/w", "dev").unwrap();

        history.forget(id);
        let recent = history.recent(10).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].session_name, "w-main");
    }

    #[test]
    fn test_previous_outside_session_returns_latest() {
        let history = history_of(&["A", "B"]);
        assert_eq!(history.previous(None).unwrap().session_name, "B");
    }

    #[test]
    fn test_record_appends() {
        let history = History::in_memory().unwrap();
        history.record("w-main", "github.com/a/w", "main");
        history.record("w-dev", "github.com/a/w", "dev");

        let recent = history.recent(10).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].session_name, "w-dev");
        assert_eq!(recent[1].project_name, "github.com/a/w");
    }

    #[test]
    fn test_prune_zero_keeps_everything() {
        let history = History::in_memory().unwrap();
        history
            .database()
            .append_history("old", "p", "b", Utc::now() - Duration::days(400))
            .unwrap();
        assert_eq!(history.prune(0).unwrap(), 0);
        assert_eq!(history.prune(90).unwrap(), 1);
        assert!(history.recent(10).unwrap().is_empty());
    }
}
