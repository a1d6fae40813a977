//! Reconciliation of worktrees against sessions and the remote
//!
//! Computes which worktrees are candidates for cleanup and performs the
//! deletions. The main worktree is never a candidate and can't be deleted
//! on its own.

use crate::backend::SessionBackend;
use crate::error::{Error, Result};
use crate::git::Vcs;
use crate::naming::session_key;
use crate::types::{Project, Worktree, WorktreeStatus};
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

/// Why a worktree was proposed for cleanup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CleanMode {
    /// No live session
    Orphaned,
    /// Branch no longer on the remote
    RemoteDeleted,
    /// Directory gone from disk
    Stale,
}

impl CleanMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CleanMode::Orphaned => "orphaned",
            CleanMode::RemoteDeleted => "remote deleted",
            CleanMode::Stale => "stale",
        }
    }
}

impl fmt::Display for CleanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Flags of `sesh clean`, validated once by the CLI.
#[derive(Debug, Clone, Default)]
pub struct CleanOptions {
    /// Empty means interactive selection over every non-main worktree
    pub modes: Vec<CleanMode>,
    pub force: bool,
}

impl CleanOptions {
    pub fn is_interactive(&self) -> bool {
        self.modes.is_empty()
    }
}

/// A worktree proposed for cleanup along with every reason that applies.
#[derive(Debug, Clone)]
pub struct Candidate<'a> {
    pub worktree: &'a Worktree,
    pub reasons: Vec<CleanMode>,
}

/// Result of one deletion inside a batch.
#[derive(Debug)]
pub struct DeleteOutcome {
    pub branch: String,
    pub path: PathBuf,
    pub result: Result<()>,
}

impl DeleteOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Live session names, folded with [`session_key`] for comparison.
pub fn live_sessions(backend: &impl SessionBackend) -> Result<HashSet<String>> {
    Ok(backend.list()?.iter().map(|s| session_key(s)).collect())
}

fn has_session(sessions: &HashSet<String>, project: &Project, branch: &str) -> bool {
    sessions.contains(&session_key(&project.session_name(branch)))
}

/// Non-main worktrees whose session isn't live.
pub fn orphaned<'a>(
    worktrees: &'a [Worktree],
    project: &Project,
    backend: &impl SessionBackend,
) -> Result<Vec<&'a Worktree>> {
    let sessions = live_sessions(backend)?;
    Ok(worktrees
        .iter()
        .filter(|w| !w.is_main && !has_session(&sessions, project, &w.branch))
        .collect())
}

/// Non-main worktrees whose branch is missing from `remote_branches`.
///
/// Detached worktrees have no branch to compare and are left alone.
pub fn remote_deleted<'a>(worktrees: &'a [Worktree], remote_branches: &[String]) -> Vec<&'a Worktree> {
    let remote: HashSet<&str> = remote_branches.iter().map(String::as_str).collect();
    worktrees
        .iter()
        .filter(|w| !w.is_main && !w.detached && !remote.contains(w.branch.as_str()))
        .collect()
}

/// Non-main worktrees git still records but whose directory is gone.
pub fn stale(worktrees: &[Worktree]) -> Vec<&Worktree> {
    worktrees
        .iter()
        .filter(|w| !w.is_main && !w.exists_on_disk())
        .collect()
}

/// Status shown by `sesh list`. `sessions` comes from [`live_sessions`].
pub fn classify(worktree: &Worktree, project: &Project, sessions: &HashSet<String>) -> WorktreeStatus {
    if !worktree.exists_on_disk() {
        WorktreeStatus::Missing
    } else if has_session(sessions, project, &worktree.branch) {
        WorktreeStatus::Active
    } else {
        WorktreeStatus::Idle
    }
}

/// Candidates for the given modes, merged per worktree in listing order.
///
/// With no modes every non-main worktree is returned with no reasons, for
/// the interactive picker.
pub fn cleanup_candidates<'a>(
    vcs: &impl Vcs,
    backend: &impl SessionBackend,
    project: &Project,
    worktrees: &'a [Worktree],
    modes: &[CleanMode],
) -> Result<Vec<Candidate<'a>>> {
    let mut candidates: Vec<Candidate<'a>> = if modes.is_empty() {
        worktrees
            .iter()
            .filter(|w| !w.is_main)
            .map(|worktree| Candidate {
                worktree,
                reasons: Vec::new(),
            })
            .collect()
    } else {
        Vec::new()
    };

    for mode in modes {
        let hits = match mode {
            CleanMode::Orphaned => orphaned(worktrees, project, backend)?,
            CleanMode::RemoteDeleted => {
                let remote = vcs.list_remote_branches(&project.bare_path)?;
                remote_deleted(worktrees, &remote)
            }
            CleanMode::Stale => stale(worktrees),
        };
        for worktree in hits {
            match candidates.iter_mut().find(|c| c.worktree.path == worktree.path) {
                Some(existing) => {
                    if !existing.reasons.contains(mode) {
                        existing.reasons.push(*mode);
                    }
                }
                None => candidates.push(Candidate {
                    worktree,
                    reasons: vec![*mode],
                }),
            }
        }
    }

    // Keep the order git reports worktrees in
    candidates.sort_by_key(|c| {
        worktrees
            .iter()
            .position(|w| w.path == c.worktree.path)
            .unwrap_or(usize::MAX)
    });
    Ok(candidates)
}

/// Delete the session for `branch` if the backend has one. Never fails.
fn delete_session_best_effort(backend: &impl SessionBackend, project: &Project, branch: &str) {
    if !backend.tracks_sessions() {
        return;
    }
    let name = project.session_name(branch);
    match backend.exists(&name) {
        Ok(true) => {
            if let Err(e) = backend.delete(&name) {
                tracing::warn!(session = %name, error = %e, "Failed to delete session");
            } else {
                tracing::info!(session = %name, "Deleted session");
            }
        }
        Ok(false) => {}
        Err(e) => tracing::warn!(session = %name, error = %e, "Could not check session"),
    }
}

/// Remove one worktree and its session.
///
/// The session goes first and its failure is only logged. Worktree removal
/// failure is returned. A worktree whose directory is already gone is
/// cleared from git's metadata with a prune instead.
pub fn delete_worktree(
    vcs: &impl Vcs,
    backend: &impl SessionBackend,
    project: &Project,
    worktree: &Worktree,
    force: bool,
) -> Result<()> {
    if worktree.is_main {
        return Err(Error::MainWorktree(worktree.branch.clone()));
    }

    delete_session_best_effort(backend, project, &worktree.branch);

    if worktree.exists_on_disk() {
        tracing::info!(project = %project.name, branch = %worktree.branch, "Removing worktree");
        vcs.remove_worktree(&project.bare_path, &worktree.path, force)?;
    } else {
        tracing::info!(project = %project.name, branch = %worktree.branch, "Pruning stale worktree");
        vcs.prune_worktrees(&project.bare_path)?;
    }
    Ok(())
}

/// Attempt every deletion, reporting each outcome.
pub fn delete_many(
    vcs: &impl Vcs,
    backend: &impl SessionBackend,
    project: &Project,
    worktrees: &[&Worktree],
    force: bool,
) -> Vec<DeleteOutcome> {
    worktrees
        .iter()
        .map(|w| {
            let result = delete_worktree(vcs, backend, project, w, force);
            if let Err(e) = &result {
                tracing::warn!(branch = %w.branch, error = %e, "Failed to delete worktree");
            }
            DeleteOutcome {
                branch: w.branch.clone(),
                path: w.path.clone(),
                result,
            }
        })
        .collect()
}

/// Remove a whole project: every session, the worktree directory and the
/// bare repository.
pub fn delete_project(backend: &impl SessionBackend, project: &Project, worktrees: &[Worktree]) -> Result<()> {
    for worktree in worktrees.iter().filter(|w| !w.detached) {
        delete_session_best_effort(backend, project, &worktree.branch);
    }

    tracing::info!(project = %project.name, "Deleting project");
    if project.path.exists() {
        std::fs::remove_dir_all(&project.path)?;
    }
    if project.bare_path.exists() {
        std::fs::remove_dir_all(&project.bare_path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::NullBackend;
    use chrono::Utc;
    use std::cell::RefCell;
    use std::path::Path;

    fn project() -> Project {
        Project {
            name: "github.com/acme/widgets".to_string(),
            remote_url: "https://github.com/acme/widgets".to_string(),
            bare_path: PathBuf::from("/nonexistent/widgets.git"),
            path: PathBuf::from("/nonexistent/widgets"),
            created_at: Utc::now(),
        }
    }

    fn wt(branch: &str, is_main: bool, path: &Path) -> Worktree {
        Worktree {
            branch: branch.to_string(),
            path: path.to_path_buf(),
            is_main,
            detached: false,
            last_used: Utc::now(),
        }
    }

    /// Backend whose live sessions are a fixed list.
    struct Sessions {
        live: Vec<String>,
        deleted: RefCell<Vec<String>>,
    }

    impl SessionBackend for Sessions {
        fn name(&self) -> String {
            "fake".to_string()
        }
        fn create(&self, _: &str, _: &Path) -> Result<()> {
            Ok(())
        }
        fn attach(&self, _: &str) -> Result<()> {
            Ok(())
        }
        fn switch(&self, _: &str) -> Result<()> {
            Ok(())
        }
        fn list(&self) -> Result<Vec<String>> {
            Ok(self.live.clone())
        }
        fn delete(&self, name: &str) -> Result<()> {
            self.deleted.borrow_mut().push(name.to_string());
            Ok(())
        }
        fn exists(&self, name: &str) -> Result<bool> {
            Ok(self.live.iter().any(|s| s == name))
        }
        fn is_running(&self) -> bool {
            true
        }
        fn is_inside_session(&self) -> bool {
            false
        }
        fn current_session_name(&self) -> Result<Option<String>> {
            Ok(None)
        }
    }

    #[test]
    fn test_orphaned_never_includes_main() {
        let p = project();
        for n in 0..5 {
            let mut worktrees = vec![wt("main", true, Path::new("/x/main"))];
            for i in 0..n {
                worktrees.push(wt(&format!("f{i}"), false, Path::new("/x/f")));
            }
            let orphans = orphaned(&worktrees, &p, &NullBackend).unwrap();
            assert_eq!(orphans.len(), n);
            assert!(orphans.iter().all(|w| !w.is_main));
        }
    }

    #[test]
    fn test_orphaned_respects_live_sessions() {
        let p = project();
        let worktrees = vec![
            wt("main", true, Path::new("/x/main")),
            wt("a", false, Path::new("/x/a")),
            wt("b", false, Path::new("/x/b")),
        ];
        let backend = Sessions {
            live: vec!["widgets-a".to_string()],
            deleted: RefCell::default(),
        };
        let orphans = orphaned(&worktrees, &p, &backend).unwrap();
        let names: Vec<&str> = orphans.iter().map(|w| w.branch.as_str()).collect();
        assert_eq!(names, vec!["b"]);
    }

    #[test]
    fn test_orphaned_matches_folded_names() {
        let p = project();
        let worktrees = vec![
            wt("main", true, Path::new("/x/main")),
            wt("v1.2", false, Path::new("/x/v1.2")),
        ];
        let backend = Sessions {
            live: vec!["widgets-v1_2".to_string()],
            deleted: RefCell::default(),
        };
        assert!(orphaned(&worktrees, &p, &backend).unwrap().is_empty());
    }

    #[test]
    fn test_remote_deleted() {
        let worktrees = vec![
            wt("main", true, Path::new("/x/main")),
            wt("feature-a", false, Path::new("/x/a")),
            wt("feature-b", false, Path::new("/x/b")),
        ];
        let remote = vec!["main".to_string(), "feature-a".to_string()];
        let gone = remote_deleted(&worktrees, &remote);
        let names: Vec<&str> = gone.iter().map(|w| w.branch.as_str()).collect();
        assert_eq!(names, vec!["feature-b"]);

        // Main is protected even when missing from the remote
        let gone = remote_deleted(&worktrees, &[]);
        assert!(gone.iter().all(|w| !w.is_main));
        assert_eq!(gone.len(), 2);
    }

    #[test]
    fn test_stale_and_classify() {
        let temp = tempfile::TempDir::new().unwrap();
        let p = project();
        let present = wt("a", false, temp.path());
        let missing = wt("b", false, &temp.path().join("gone"));
        let worktrees = vec![present.clone(), missing.clone()];

        let stale_list = stale(&worktrees);
        assert_eq!(stale_list.len(), 1);
        assert_eq!(stale_list[0].branch, "b");

        let sessions: HashSet<String> = ["widgets-a".to_string()].into_iter().collect();
        assert_eq!(classify(&present, &p, &sessions), WorktreeStatus::Active);
        assert_eq!(classify(&missing, &p, &sessions), WorktreeStatus::Missing);
        assert_eq!(
            classify(&present, &p, &HashSet::new()),
            WorktreeStatus::Idle
        );
    }

    #[test]
    fn test_delete_main_refused() {
        let p = project();
        let main = wt("main", true, Path::new("/x/main"));
        let backend = Sessions {
            live: vec!["widgets-main".to_string()],
            deleted: RefCell::default(),
        };
        let err = delete_worktree(&crate::git::GitCli::new(), &backend, &p, &main, false).unwrap_err();
        assert!(matches!(err, Error::MainWorktree(_)));
        assert!(backend.deleted.borrow().is_empty());
    }

    #[test]
    fn test_delete_project_removes_directories() {
        let temp = tempfile::TempDir::new().unwrap();
        let mut p = project();
        p.path = temp.path().join("widgets");
        p.bare_path = temp.path().join("widgets.git");
        std::fs::create_dir_all(p.path.join("main")).unwrap();
        std::fs::create_dir_all(&p.bare_path).unwrap();

        let worktrees = vec![wt("main", true, &p.path.join("main"))];
        let backend = Sessions {
            live: vec!["widgets-main".to_string()],
            deleted: RefCell::default(),
        };
        delete_project(&backend, &p, &worktrees).unwrap();

        assert!(!p.path.exists());
        assert!(!p.bare_path.exists());
        assert_eq!(*backend.deleted.borrow(), vec!["widgets-main".to_string()]);
    }
}
