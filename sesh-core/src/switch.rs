//! Switch/create state machine
//!
//! A switch is decided by two live facts: whether a worktree for the branch
//! exists and whether its session is running.
//!
//! | worktree | session | plan |
//! |----------|---------|------|
//! | absent   | absent  | create worktree (tracking or new branch), create session |
//! | present  | absent  | create session at the existing path |
//! | present  | present | attach only |
//! | absent   | present | rediscover, then repair |
//!
//! [`plan_switch`] is pure; [`Switcher`] performs the plan against a
//! [`Vcs`] and a [`SessionBackend`].

use crate::backend::SessionBackend;
use crate::config::Config;
use crate::discovery::{discover_worktrees, find_worktree};
use crate::error::{Error, Result};
use crate::git::Vcs;
use crate::history::History;
use crate::naming::session_key;
use crate::types::{BranchLocation, HistoryEntry, Project, Worktree};
use serde::Serialize;
use std::path::PathBuf;

/// What a switch will do, decided before anything is touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchPlan {
    /// A new branch was requested but the name is taken
    BranchConflict,
    /// Worktree and session both live
    Attach,
    /// Worktree present, session missing
    CreateSession,
    /// Nothing exists yet; `new_branch` when the branch is on neither side
    CreateWorktree { new_branch: bool },
    /// A session without a worktree; re-read the worktree list and repair
    Rediscover,
}

/// Decide how to reach the session for a branch.
pub fn plan_switch(
    worktree_present: bool,
    session_present: bool,
    branch: BranchLocation,
    create_requested: bool,
) -> SwitchPlan {
    if create_requested && branch.exists() {
        return SwitchPlan::BranchConflict;
    }
    match (worktree_present, session_present) {
        (true, true) => SwitchPlan::Attach,
        (true, false) => SwitchPlan::CreateSession,
        (false, false) => SwitchPlan::CreateWorktree {
            new_branch: !branch.exists(),
        },
        (false, true) => SwitchPlan::Rediscover,
    }
}

/// Flags of `sesh switch`, validated once by the CLI.
#[derive(Debug, Clone)]
pub struct SwitchOptions {
    /// `-b`: the branch must not exist yet
    pub create_branch: bool,
    /// Where a new branch starts; `HEAD` when unset
    pub start_point: Option<String>,
    /// Hand the terminal to the session afterwards
    pub attach: bool,
}

impl Default for SwitchOptions {
    fn default() -> Self {
        Self {
            create_branch: false,
            start_point: None,
            attach: true,
        }
    }
}

/// What a switch did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SwitchOutcome {
    pub session_name: String,
    pub worktree_path: PathBuf,
    pub worktree_created: bool,
    pub branch_created: bool,
    pub session_created: bool,
    pub attached: bool,
}

/// Executes switch plans.
pub struct Switcher<'a, V: Vcs, B: SessionBackend> {
    vcs: &'a V,
    backend: &'a B,
    config: &'a Config,
    history: Option<&'a History>,
}

impl<'a, V: Vcs, B: SessionBackend> Switcher<'a, V, B> {
    pub fn new(vcs: &'a V, backend: &'a B, config: &'a Config) -> Self {
        Self {
            vcs,
            backend,
            config,
            history: None,
        }
    }

    /// Record successful switches in `history`.
    pub fn with_history(mut self, history: &'a History) -> Self {
        self.history = Some(history);
        self
    }

    /// Whether the backend has sessions we can query.
    fn sessions_live(&self) -> bool {
        self.backend.is_running() && self.backend.tracks_sessions()
    }

    /// Bring `branch` of `project` up as a session and optionally attach.
    pub fn switch(&self, project: &Project, branch: &str, opts: &SwitchOptions) -> Result<SwitchOutcome> {
        let session_name = project.session_name(branch);
        let worktrees = discover_worktrees(self.vcs, project)?;
        let existing = find_worktree(&worktrees, branch).map(|w| w.path.clone());

        let session_present = if self.sessions_live() {
            self.backend.exists(&session_name)?
        } else {
            false
        };
        // A checked-out branch is local by definition
        let location = if existing.is_none() || opts.create_branch {
            self.vcs.branch_exists(&project.bare_path, branch)?
        } else {
            BranchLocation {
                local: true,
                remote: false,
            }
        };

        if session_present {
            check_collision(&worktrees, project, branch, &session_name)?;
        }

        let plan = plan_switch(existing.is_some(), session_present, location, opts.create_branch);
        tracing::info!(
            project = %project.name,
            branch = %branch,
            session = %session_name,
            ?plan,
            "Switching"
        );

        let mut outcome = SwitchOutcome {
            worktree_path: existing.unwrap_or_else(|| project.worktree_path(branch)),
            session_name,
            ..Default::default()
        };

        match plan {
            SwitchPlan::BranchConflict => return Err(Error::BranchExists(branch.to_string())),
            SwitchPlan::Attach => {}
            SwitchPlan::CreateSession => self.create_session(project, &mut outcome)?,
            SwitchPlan::CreateWorktree { new_branch } => {
                self.create_worktree(project, branch, new_branch, opts, &mut outcome)?;
                self.create_session(project, &mut outcome)?;
            }
            SwitchPlan::Rediscover => {
                let worktrees = discover_worktrees(self.vcs, project)?;
                if let Some(worktree) = find_worktree(&worktrees, branch) {
                    outcome.worktree_path = worktree.path.clone();
                } else {
                    check_collision(&worktrees, project, branch, &outcome.session_name)?;
                    self.create_worktree(project, branch, !location.exists(), opts, &mut outcome)?;
                    if let Err(e) = self.backend.delete(&outcome.session_name) {
                        tracing::warn!(session = %outcome.session_name, error = %e, "Failed to delete stray session");
                    }
                    self.create_session(project, &mut outcome)?;
                }
            }
        }

        self.finish(project, branch, opts, outcome)
    }

    fn create_worktree(
        &self,
        project: &Project,
        branch: &str,
        new_branch: bool,
        opts: &SwitchOptions,
        outcome: &mut SwitchOutcome,
    ) -> Result<()> {
        let dest = project.worktree_path(branch);
        if new_branch {
            let from = opts.start_point.as_deref().unwrap_or("HEAD");
            tracing::info!(project = %project.name, branch = %branch, from = %from, "Creating branch and worktree");
            self.vcs
                .create_worktree_new_branch(&project.bare_path, branch, &dest, from)?;
            outcome.branch_created = true;
        } else {
            tracing::info!(project = %project.name, branch = %branch, "Creating worktree");
            self.vcs.create_worktree(&project.bare_path, branch, &dest)?;
        }
        outcome.worktree_created = true;
        outcome.worktree_path = dest;
        Ok(())
    }

    fn create_session(&self, project: &Project, outcome: &mut SwitchOutcome) -> Result<()> {
        if !self.backend.is_running() {
            tracing::info!(path = %outcome.worktree_path.display(), "No session backend, worktree only");
            return Ok(());
        }

        self.backend
            .create(&outcome.session_name, &outcome.worktree_path)?;
        outcome.session_created = true;

        if !self.backend.tracks_sessions() {
            return Ok(());
        }
        match self
            .config
            .resolve_startup_command(&project.path, &outcome.worktree_path)
        {
            Ok(Some(command)) => {
                tracing::debug!(session = %outcome.session_name, command = %command, "Running startup command");
                if let Err(e) = self.backend.run_in_session(&outcome.session_name, &command) {
                    tracing::warn!(session = %outcome.session_name, error = %e, "Startup command failed");
                }
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "Could not resolve startup command"),
        }
        Ok(())
    }

    fn finish(
        &self,
        project: &Project,
        branch: &str,
        opts: &SwitchOptions,
        mut outcome: SwitchOutcome,
    ) -> Result<SwitchOutcome> {
        if !opts.attach || !self.sessions_live() {
            return Ok(outcome);
        }

        if let Some(history) = self.history {
            self.attach_recorded(history, &outcome.session_name, &project.name, branch)?;
        } else {
            self.backend.attach(&outcome.session_name)?;
        }
        outcome.attached = true;
        Ok(outcome)
    }

    /// Attach to `session` with its history entry written beforehand.
    ///
    /// Attaching may replace this process, so the entry can't wait. It is
    /// taken back when the attach returns an error.
    fn attach_recorded(
        &self,
        history: &History,
        session: &str,
        project_name: &str,
        branch: &str,
    ) -> Result<()> {
        let id = history.record(session, project_name, branch);
        if let Err(e) = self.backend.attach(session) {
            if let Some(id) = id {
                history.forget(id);
            }
            return Err(e);
        }
        Ok(())
    }

    /// Jump to the most recent session other than the current one.
    pub fn pop(&self, history: &History) -> Result<HistoryEntry> {
        if !self.sessions_live() {
            return Err(Error::NoBackend);
        }
        let current = self.backend.current_session_name()?;
        let previous = history.previous(current.as_deref())?;

        if !self.backend.exists(&previous.session_name)? {
            return Err(Error::SessionGone(previous.session_name));
        }

        tracing::info!(session = %previous.session_name, "Returning to previous session");
        self.attach_recorded(
            history,
            &previous.session_name,
            &previous.project_name,
            &previous.branch,
        )?;
        Ok(previous)
    }
}

/// Fail when a live session named for `branch` belongs to another worktree.
///
/// tmux folds `.` and `:` to `_`, so `feature.a` and `feature_a` share one
/// session. Treating it as stray would kill the other branch's session.
fn check_collision(worktrees: &[Worktree], project: &Project, branch: &str, session: &str) -> Result<()> {
    let key = session_key(session);
    match worktrees
        .iter()
        .find(|w| !w.detached && w.branch != branch && session_key(&project.session_name(&w.branch)) == key)
    {
        Some(other) => Err(Error::SessionCollision {
            session: session.to_string(),
            branch: branch.to_string(),
            other: other.branch.clone(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOWHERE: BranchLocation = BranchLocation {
        local: false,
        remote: false,
    };
    const REMOTE: BranchLocation = BranchLocation {
        local: false,
        remote: true,
    };
    const LOCAL: BranchLocation = BranchLocation {
        local: true,
        remote: false,
    };

    #[test]
    fn test_plan_table() {
        assert_eq!(plan_switch(true, true, LOCAL, false), SwitchPlan::Attach);
        assert_eq!(
            plan_switch(true, false, LOCAL, false),
            SwitchPlan::CreateSession
        );
        assert_eq!(
            plan_switch(false, false, REMOTE, false),
            SwitchPlan::CreateWorktree { new_branch: false }
        );
        assert_eq!(
            plan_switch(false, false, NOWHERE, false),
            SwitchPlan::CreateWorktree { new_branch: true }
        );
        assert_eq!(
            plan_switch(false, true, REMOTE, false),
            SwitchPlan::Rediscover
        );
    }

    #[test]
    fn test_create_requested_conflicts_with_existing_branch() {
        assert_eq!(
            plan_switch(false, false, REMOTE, true),
            SwitchPlan::BranchConflict
        );
        assert_eq!(
            plan_switch(true, true, LOCAL, true),
            SwitchPlan::BranchConflict
        );
        assert_eq!(
            plan_switch(false, false, NOWHERE, true),
            SwitchPlan::CreateWorktree { new_branch: true }
        );
    }

    #[test]
    fn test_default_options_attach() {
        let opts = SwitchOptions::default();
        assert!(opts.attach);
        assert!(!opts.create_branch);
        assert!(opts.start_point.is_none());
    }
}
