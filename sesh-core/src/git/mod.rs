//! Version-control collaborator
//!
//! The engine talks to git only through the [`Vcs`] trait so the switch state
//! machine and reconciliation can be exercised with an in-memory fake.
//! [`GitCli`] is the real implementation and shells out to `git`.
//!
//! ## Bare repository layout
//!
//! `clone` creates a bare repository and configures a normal fetch refspec, so
//! local branches live in `refs/heads/*` and remote-tracking refs in
//! `refs/remotes/origin/*`. Remote-deleted detection relies on the latter being
//! pruned by `fetch --prune`.

mod remote;
mod stream;
mod worktree;

pub use remote::{generate_project_name, parse_remote_url, RemoteUrl};
pub use stream::{
    parse_ls_remote_line, spawn_background_fetch, BranchLines, BranchStream, ProducerHandle,
};
pub use worktree::{parse_porcelain, WorktreeEntry};

use crate::error::{Error, Result};
use crate::process::{path_arg, run_capture, CmdOutput};
use crate::types::BranchLocation;
use std::path::Path;

/// Branch name reported for a detached HEAD
pub const DETACHED: &str = "(detached)";

/// Fallbacks tried when the remote HEAD isn't recorded
const DEFAULT_BRANCH_CANDIDATES: &[&str] = &["main", "master", "develop"];

/// Operations the engine needs from version control.
///
/// `repo` is always the bare repository path; worktree paths are passed as `dest`.
pub trait Vcs {
    /// Bare-clone `url` into `dest` and fetch remote-tracking refs.
    fn clone_bare(&self, url: &str, dest: &Path) -> Result<()>;

    /// Fetch from origin, pruning deleted remote branches.
    fn fetch(&self, repo: &Path) -> Result<()>;

    /// Name of the default branch.
    fn default_branch(&self, repo: &Path) -> Result<String>;

    /// Worktrees with a working directory. The first entry is the main one.
    fn list_worktrees(&self, repo: &Path) -> Result<Vec<WorktreeEntry>>;

    /// Check out an existing local or remote branch at `dest`, with upstream tracking.
    fn create_worktree(&self, repo: &Path, branch: &str, dest: &Path) -> Result<()>;

    /// Create `branch` from `from_ref` and check it out at `dest`.
    fn create_worktree_new_branch(
        &self,
        repo: &Path,
        branch: &str,
        dest: &Path,
        from_ref: &str,
    ) -> Result<()>;

    /// Remove the worktree at `dest`.
    fn remove_worktree(&self, repo: &Path, dest: &Path, force: bool) -> Result<()>;

    /// Drop metadata for worktrees whose directories are gone.
    fn prune_worktrees(&self, repo: &Path) -> Result<()>;

    /// Branch names on origin as of the last fetch.
    fn list_remote_branches(&self, repo: &Path) -> Result<Vec<String>>;

    /// Local branch names.
    fn list_local_branches(&self, repo: &Path) -> Result<Vec<String>>;

    /// Whether `name` exists locally and/or on origin.
    fn branch_exists(&self, repo: &Path, name: &str) -> Result<BranchLocation>;

    /// Branch checked out at `path`, or [`DETACHED`].
    fn current_branch(&self, path: &Path) -> Result<String>;

    /// URL of the `origin` remote.
    fn remote_url(&self, repo: &Path) -> Result<String>;

    /// Delete a local branch.
    fn delete_branch(&self, repo: &Path, name: &str, force: bool) -> Result<()>;
}

/// [`Vcs`] backed by the `git` command line.
#[derive(Debug, Default, Clone, Copy)]
pub struct GitCli;

impl GitCli {
    pub fn new() -> Self {
        Self
    }

    /// Run `git -C dir <args>`, failing with the operation label on non-zero exit.
    fn git(&self, dir: &Path, operation: &str, args: &[&str]) -> Result<CmdOutput> {
        let output = self.git_unchecked(dir, operation, args)?;
        if !output.success() {
            return Err(Error::git(operation, output.error_line()));
        }
        Ok(output)
    }

    /// Like [`GitCli::git`] but returns the output whatever the exit status.
    fn git_unchecked(&self, dir: &Path, operation: &str, args: &[&str]) -> Result<CmdOutput> {
        let mut full = vec!["-C", path_arg(dir)?];
        full.extend_from_slice(args);
        run_capture("git", &full, None).map_err(|e| match e {
            Error::Io(io) if io.kind() == std::io::ErrorKind::NotFound => {
                Error::git(operation, "git executable not found")
            }
            other => other,
        })
    }

    fn ref_exists(&self, repo: &Path, reference: &str) -> Result<bool> {
        let output =
            self.git_unchecked(repo, "show-ref", &["show-ref", "--verify", "--quiet", reference])?;
        Ok(output.success())
    }

    fn for_each_ref(&self, repo: &Path, prefix: &str) -> Result<Vec<String>> {
        let output = self.git(
            repo,
            "for-each-ref",
            &["for-each-ref", "--format=%(refname)", prefix],
        )?;
        Ok(output
            .lines()
            .into_iter()
            .filter_map(|r| r.strip_prefix(prefix))
            .filter(|name| *name != "HEAD")
            .map(str::to_string)
            .collect())
    }

    fn set_upstream(&self, repo: &Path, branch: &str) -> Result<()> {
        let remote_key = format!("branch.{branch}.remote");
        let merge_key = format!("branch.{branch}.merge");
        let merge_ref = format!("refs/heads/{branch}");
        self.git(repo, "config", &["config", &remote_key, "origin"])?;
        self.git(repo, "config", &["config", &merge_key, &merge_ref])?;
        Ok(())
    }

    /// Start streaming branch names for interactive selection.
    pub fn stream_branches(&self, repo: &Path) -> Result<BranchStream> {
        let local = self.list_local_branches(repo)?;
        BranchStream::spawn(repo, local)
    }

    /// `git status --short` lines of a worktree; empty when clean.
    pub fn short_status(&self, worktree: &Path) -> Result<Vec<String>> {
        let output = self.git(worktree, "status", &["status", "--short"])?;
        Ok(output.lines().into_iter().map(str::to_string).collect())
    }

    /// One-line summary of the newest commit on `rev`, if it resolves.
    pub fn last_commit(&self, dir: &Path, rev: &str) -> Result<Option<String>> {
        let output = self.git_unchecked(
            dir,
            "log",
            &["log", "-1", "--pretty=format:%h %s (%ar)", rev, "--"],
        )?;
        if !output.success() {
            tracing::debug!(rev, error = %output.error_line(), "No commit for revision");
            return Ok(None);
        }
        Ok(output.first_line())
    }
}

impl Vcs for GitCli {
    fn clone_bare(&self, url: &str, dest: &Path) -> Result<()> {
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        tracing::info!(url, dest = %dest.display(), "Cloning bare repository");

        let output = run_capture("git", &["clone", "--bare", url, path_arg(dest)?], None)?;
        if !output.success() {
            return Err(Error::git("clone", output.error_line()));
        }

        self.git(
            dest,
            "config",
            &[
                "config",
                "remote.origin.fetch",
                "+refs/heads/*:refs/remotes/origin/*",
            ],
        )?;
        self.fetch(dest)
    }

    fn fetch(&self, repo: &Path) -> Result<()> {
        tracing::debug!(repo = %repo.display(), "Fetching origin");
        self.git(repo, "fetch", &["fetch", "--prune", "--quiet", "origin"])?;
        Ok(())
    }

    fn default_branch(&self, repo: &Path) -> Result<String> {
        for reference in ["refs/remotes/origin/HEAD", "HEAD"] {
            let output = self.git_unchecked(
                repo,
                "symbolic-ref",
                &["symbolic-ref", "--quiet", "--short", reference],
            )?;
            if let Some(name) = output.first_line() {
                let name = name.strip_prefix("origin/").unwrap_or(&name);
                return Ok(name.to_string());
            }
        }

        for candidate in DEFAULT_BRANCH_CANDIDATES {
            if self.branch_exists(repo, candidate)?.exists() {
                return Ok((*candidate).to_string());
            }
        }
        Err(Error::BranchNotFound("default branch".to_string()))
    }

    fn list_worktrees(&self, repo: &Path) -> Result<Vec<WorktreeEntry>> {
        let output = self.git(repo, "worktree list", &["worktree", "list", "--porcelain"])?;
        let mut entries: Vec<WorktreeEntry> = parse_porcelain(&output.stdout)
            .into_iter()
            .filter(|e| !e.bare)
            .collect();

        // Keep the default branch first so it is the main worktree
        if let Ok(default) = self.default_branch(repo) {
            if let Some(pos) = entries
                .iter()
                .position(|e| e.branch.as_deref() == Some(default.as_str()))
            {
                let main = entries.remove(pos);
                entries.insert(0, main);
            }
        }
        Ok(entries)
    }

    fn create_worktree(&self, repo: &Path, branch: &str, dest: &Path) -> Result<()> {
        let location = self.branch_exists(repo, branch)?;
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let dest_arg = path_arg(dest)?;
        tracing::info!(branch, dest = %dest.display(), ?location, "Creating worktree");

        if location.local {
            self.git(repo, "worktree add", &["worktree", "add", dest_arg, branch])?;
            self.set_upstream(repo, branch)
        } else if location.remote {
            let upstream = format!("origin/{branch}");
            self.git(
                repo,
                "worktree add",
                &["worktree", "add", "--track", "-b", branch, dest_arg, &upstream],
            )?;
            Ok(())
        } else {
            Err(Error::BranchNotFound(branch.to_string()))
        }
    }

    fn create_worktree_new_branch(
        &self,
        repo: &Path,
        branch: &str,
        dest: &Path,
        from_ref: &str,
    ) -> Result<()> {
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        tracing::info!(branch, from_ref, dest = %dest.display(), "Creating worktree with new branch");
        self.git(
            repo,
            "worktree add",
            &["worktree", "add", "-b", branch, path_arg(dest)?, from_ref],
        )?;
        Ok(())
    }

    fn remove_worktree(&self, repo: &Path, dest: &Path, force: bool) -> Result<()> {
        let dest_arg = path_arg(dest)?;
        let mut args = vec!["worktree", "remove"];
        if force {
            args.push("--force");
        }
        args.push(dest_arg);
        tracing::info!(dest = %dest.display(), force, "Removing worktree");
        self.git(repo, "worktree remove", &args)?;
        Ok(())
    }

    fn prune_worktrees(&self, repo: &Path) -> Result<()> {
        self.git(repo, "worktree prune", &["worktree", "prune"])?;
        Ok(())
    }

    fn list_remote_branches(&self, repo: &Path) -> Result<Vec<String>> {
        let remote = self.for_each_ref(repo, "refs/remotes/origin/")?;
        if !remote.is_empty() {
            return Ok(remote);
        }
        // Never fetched with a refspec: local heads mirror the remote
        tracing::debug!(repo = %repo.display(), "No remote-tracking refs, using local heads");
        self.list_local_branches(repo)
    }

    fn list_local_branches(&self, repo: &Path) -> Result<Vec<String>> {
        self.for_each_ref(repo, "refs/heads/")
    }

    fn branch_exists(&self, repo: &Path, name: &str) -> Result<BranchLocation> {
        Ok(BranchLocation {
            local: self.ref_exists(repo, &format!("refs/heads/{name}"))?,
            remote: self.ref_exists(repo, &format!("refs/remotes/origin/{name}"))?,
        })
    }

    fn current_branch(&self, path: &Path) -> Result<String> {
        let output = self.git(path, "branch", &["branch", "--show-current"])?;
        Ok(output
            .first_line()
            .unwrap_or_else(|| DETACHED.to_string()))
    }

    fn remote_url(&self, repo: &Path) -> Result<String> {
        let output = self.git(repo, "remote get-url", &["remote", "get-url", "origin"])?;
        output
            .first_line()
            .ok_or_else(|| Error::git("remote get-url", "origin has no URL"))
    }

    fn delete_branch(&self, repo: &Path, name: &str, force: bool) -> Result<()> {
        let flag = if force { "-D" } else { "-d" };
        self.git(repo, "branch delete", &["branch", flag, name])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;
    use tempfile::TempDir;

    fn git_available() -> bool {
        crate::process::command_available("git")
    }

    fn run(dir: &Path, args: &[&str]) {
        let status = Command::new("git")
            .arg("-C")
            .arg(dir)
            .args(args)
            .env("GIT_AUTHOR_NAME", "sesh")
            .env("GIT_AUTHOR_EMAIL", "sesh@example.com")
            .env("GIT_COMMITTER_NAME", "sesh")
            .env("GIT_COMMITTER_EMAIL", "sesh@example.com")
            .status()
            .unwrap();
        assert!(status.success(), "git {args:?} failed");
    }

    /// Upstream repo with `main` and `feature`, bare-cloned into `<tmp>/ws/p.git`.
    fn cloned_fixture(temp: &TempDir) -> std::path::PathBuf {
        let upstream = temp.path().join("upstream");
        std::fs::create_dir_all(&upstream).unwrap();
        run(&upstream, &["init", "--quiet"]);
        run(&upstream, &["symbolic-ref", "HEAD", "refs/heads/main"]);
        std::fs::write(upstream.join("README"), "hi\n").unwrap();
        run(&upstream, &["add", "README"]);
        run(&upstream, &["commit", "--quiet", "-m", "init"]);
        run(&upstream, &["branch", "feature"]);

        let bare = temp.path().join("ws/p.git");
        let url = upstream.to_str().unwrap();
        GitCli::new().clone_bare(url, &bare).unwrap();
        bare
    }

    #[test]
    fn test_clone_and_worktree_lifecycle() {
        if !git_available() {
            return;
        }
        let temp = TempDir::new().unwrap();
        let bare = cloned_fixture(&temp);
        let git = GitCli::new();

        assert_eq!(git.default_branch(&bare).unwrap(), "main");
        let mut remote = git.list_remote_branches(&bare).unwrap();
        remote.sort();
        assert_eq!(remote, vec!["feature", "main"]);
        assert!(git.branch_exists(&bare, "feature").unwrap().remote);
        assert!(!git.branch_exists(&bare, "nope").unwrap().exists());

        let main_dir = temp.path().join("ws/p/main");
        let feature_dir = temp.path().join("ws/p/feature");
        let new_dir = temp.path().join("ws/p/brand-new");
        git.create_worktree(&bare, "main", &main_dir).unwrap();
        git.create_worktree(&bare, "feature", &feature_dir).unwrap();
        git.create_worktree_new_branch(&bare, "brand-new", &new_dir, "main")
            .unwrap();

        let worktrees = git.list_worktrees(&bare).unwrap();
        assert_eq!(worktrees.len(), 3);
        assert_eq!(worktrees[0].branch.as_deref(), Some("main"));
        assert_eq!(git.current_branch(&feature_dir).unwrap(), "feature");
        assert_eq!(
            git.remote_url(&bare).unwrap(),
            temp.path().join("upstream").to_str().unwrap()
        );

        git.remove_worktree(&bare, &new_dir, false).unwrap();
        git.delete_branch(&bare, "brand-new", true).unwrap();
        assert_eq!(git.list_worktrees(&bare).unwrap().len(), 2);
        assert!(!git.branch_exists(&bare, "brand-new").unwrap().local);
    }

    #[test]
    fn test_status_and_last_commit() {
        if !git_available() {
            return;
        }
        let temp = TempDir::new().unwrap();
        let bare = cloned_fixture(&temp);
        let git = GitCli::new();
        let main_dir = temp.path().join("ws/p/main");
        git.create_worktree(&bare, "main", &main_dir).unwrap();

        assert!(git.short_status(&main_dir).unwrap().is_empty());
        std::fs::write(main_dir.join("notes.txt"), "wip\n").unwrap();
        assert_eq!(git.short_status(&main_dir).unwrap(), vec!["?? notes.txt"]);

        let commit = git.last_commit(&main_dir, "HEAD").unwrap().unwrap();
        assert!(commit.contains(" init ("), "got {commit}");
        assert!(git.last_commit(&bare, "origin/feature").unwrap().is_some());
        assert!(git.last_commit(&bare, "origin/nope").unwrap().is_none());
    }

    #[test]
    fn test_create_worktree_unknown_branch() {
        if !git_available() {
            return;
        }
        let temp = TempDir::new().unwrap();
        let bare = cloned_fixture(&temp);
        let err = GitCli::new()
            .create_worktree(&bare, "missing", &temp.path().join("ws/p/missing"))
            .unwrap_err();
        assert!(matches!(err, Error::BranchNotFound(_)));
    }
}
