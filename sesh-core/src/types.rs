//! Core domain types for sesh
//!
//! Projects and worktrees are projections of what git and the filesystem
//! report; none of them is stored. Only [`HistoryEntry`] is persisted.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};

// ============================================
// Workspace
// ============================================

/// A cloned repository: one bare repo plus a directory of worktrees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Project {
    /// Stable name derived from the remote URL (`github.com/acme/widgets`)
    pub name: String,
    /// `origin` URL of the bare repository
    pub remote_url: String,
    /// Path to the bare repository (`<root>/<name>.git`)
    pub bare_path: PathBuf,
    /// Directory holding the worktrees (`<root>/<name>`)
    pub path: PathBuf,
    /// Approximated from the bare repository's mtime
    pub created_at: DateTime<Utc>,
}

impl Project {
    /// Final path segment of the name (`widgets`)
    pub fn short_name(&self) -> &str {
        crate::naming::short_name(&self.name)
    }

    /// Session name for one of this project's branches
    pub fn session_name(&self, branch: &str) -> String {
        crate::naming::generate_session_name(&self.name, branch)
    }

    /// Where the worktree for `branch` lives (or would live)
    pub fn worktree_path(&self, branch: &str) -> PathBuf {
        crate::naming::worktree_path(&self.path, branch)
    }
}

/// A checked-out branch of a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Worktree {
    /// Branch name as git reports it (`(detached)` for a detached HEAD)
    pub branch: String,
    /// Absolute path of the working directory
    pub path: PathBuf,
    /// The first worktree git lists; never a deletion candidate
    pub is_main: bool,
    /// True when HEAD is not on a branch
    pub detached: bool,
    /// Best-effort last use, from the directory's mtime
    pub last_used: DateTime<Utc>,
}

impl Worktree {
    /// True if the working directory still exists on disk
    pub fn exists_on_disk(&self) -> bool {
        self.path.is_dir()
    }

    /// True if `path` is this worktree or lies inside it
    pub fn contains(&self, path: &Path) -> bool {
        path.starts_with(&self.path)
    }
}

/// Lifecycle state of a worktree relative to the active backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorktreeStatus {
    /// A live session exists for the worktree
    Active,
    /// Worktree exists, no session
    Idle,
    /// Git still records the worktree but its directory is gone
    Missing,
}

impl WorktreeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorktreeStatus::Active => "active",
            WorktreeStatus::Idle => "idle",
            WorktreeStatus::Missing => "missing",
        }
    }
}

/// Where a branch exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BranchLocation {
    pub local: bool,
    pub remote: bool,
}

impl BranchLocation {
    pub fn exists(&self) -> bool {
        self.local || self.remote
    }
}

// ============================================
// History
// ============================================

/// One successful switch to a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    /// Insertion id, breaks ties between equal timestamps
    pub id: i64,
    pub session_name: String,
    pub project_name: String,
    pub branch: String,
    pub accessed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project() -> Project {
        Project {
            name: "github.com/acme/widgets".to_string(),
            remote_url: "git@github.com:acme/widgets.git".to_string(),
            bare_path: PathBuf::from("/ws/github.com/acme/widgets.git"),
            path: PathBuf::from("/ws/github.com/acme/widgets"),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_project_helpers() {
        let p = project();
        assert_eq!(p.short_name(), "widgets");
        assert_eq!(p.session_name("feat/x"), "widgets-feat-x");
        assert_eq!(
            p.worktree_path("feat/x"),
            PathBuf::from("/ws/github.com/acme/widgets/feat-x")
        );
    }

    #[test]
    fn test_worktree_contains() {
        let wt = Worktree {
            branch: "main".to_string(),
            path: PathBuf::from("/ws/p/main"),
            is_main: true,
            detached: false,
            last_used: Utc::now(),
        };
        assert!(wt.contains(Path::new("/ws/p/main/src")));
        assert!(!wt.contains(Path::new("/ws/p/main2")));
    }

    #[test]
    fn test_branch_location() {
        assert!(!BranchLocation::default().exists());
        assert!(BranchLocation {
            local: false,
            remote: true
        }
        .exists());
    }
}
