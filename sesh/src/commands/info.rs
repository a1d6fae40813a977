//! `status`, `info`, `config` and `logs`.

use anyhow::{anyhow, Result};
use crossterm::style::Stylize;
use sesh_core::backend::SessionBackend;
use sesh_core::discovery::{
    self, discover_worktrees, find_worktree, find_worktree_by_path, project_for_path,
    worktree_for_session,
};
use sesh_core::format::{display_path, format_relative_time};
use sesh_core::{Config, Project, Worktree};

use crate::context::Ctx;
use crate::output;

fn field(label: &str, value: impl std::fmt::Display) {
    println!("{:<12} {value}", format!("{label}:").dark_grey());
}

pub fn status(ctx: &Ctx) -> Result<()> {
    field("workspace", display_path(&ctx.config.workspace_dir));
    field("backend", ctx.backend.name());

    if ctx.sessions_live() && ctx.backend.is_inside_session() {
        if let Ok(Some(current)) = ctx.backend.current_session_name() {
            field("current", current);
        }
    }

    let cwd = std::env::current_dir()?;
    let projects = ctx.projects()?;
    let Some(project) = project_for_path(&projects, &cwd) else {
        println!("Not inside a sesh project");
        return Ok(());
    };
    field("project", &project.name);
    field("remote", &project.remote_url);

    let worktrees = discover_worktrees(&ctx.vcs, project)?;
    if let Some(worktree) = find_worktree_by_path(&worktrees, &cwd) {
        let name = project.session_name(&worktree.branch);
        field("branch", &worktree.branch);
        field("worktree", display_path(&worktree.path));
        if ctx.sessions_live() {
            let state = match ctx.backend.exists(&name) {
                Ok(true) => "running".green(),
                Ok(false) => "not running".yellow(),
                Err(e) => {
                    tracing::warn!(session = %name, error = %e, "Could not check session");
                    "unknown".red()
                }
            };
            field("session", format!("{name} ({state})"));
        }
    }
    Ok(())
}

/// Details of one session, suitable for a finder preview pane.
///
/// With `--project` the target is a branch; otherwise it is a session name
/// looked up across every project.
pub fn session(ctx: &Ctx, target: &str, project: Option<&str>) -> Result<()> {
    let projects = ctx.projects()?;
    let (project, branch, worktree) = match project {
        Some(name) => {
            let project = discovery::resolve_project(&projects, name)?;
            let worktrees = discover_worktrees(&ctx.vcs, project)?;
            let worktree = find_worktree(&worktrees, target).cloned();
            (project, target.to_string(), worktree)
        }
        None => {
            let (project, worktree) = find_session(ctx, &projects, target)?;
            (project, worktree.branch.clone(), Some(worktree))
        }
    };

    let name = project.session_name(&branch);
    field("session", name.as_str().bold());
    field("project", &project.name);
    field("branch", &branch);

    let Some(worktree) = worktree else {
        field("status", "no worktree".yellow());
        let commit = ctx
            .vcs
            .last_commit(&project.bare_path, &format!("origin/{branch}"))?;
        field("commit", commit.unwrap_or_else(|| "(unknown)".to_string()));
        println!();
        output::note(format!("Run `sesh switch {branch}` to create its worktree"));
        return Ok(());
    };

    field("path", display_path(&worktree.path));
    field("last used", format_relative_time(worktree.last_used));
    if ctx.sessions_live() {
        let state = if ctx.backend.exists(&name)? {
            "running".green()
        } else {
            "stopped".dark_grey()
        };
        field("status", state);
    }
    if !worktree.exists_on_disk() {
        field("git", "directory missing".red());
        return Ok(());
    }
    let commit = ctx.vcs.last_commit(&worktree.path, "HEAD")?;
    field("commit", commit.unwrap_or_else(|| "(no commits)".to_string()));

    let changes = ctx.vcs.short_status(&worktree.path)?;
    if changes.is_empty() {
        field("git", "clean".green());
    } else {
        field("git", format!("{} change(s)", changes.len()).yellow());
        for line in changes {
            println!("  {line}");
        }
    }
    Ok(())
}

/// Project and worktree a session name belongs to.
fn find_session<'a>(ctx: &Ctx, projects: &'a [Project], session: &str) -> Result<(&'a Project, Worktree)> {
    for project in projects {
        let worktrees = match discover_worktrees(&ctx.vcs, project) {
            Ok(worktrees) => worktrees,
            Err(e) => {
                tracing::warn!(project = %project.name, error = %e, "Skipping project");
                continue;
            }
        };
        if let Some(worktree) = worktree_for_session(project, &worktrees, session) {
            return Ok((project, worktree.clone()));
        }
    }
    Err(anyhow!(
        "no worktree has session '{session}' (pass --project to look up a branch)"
    ))
}

pub fn config(config: &Config) -> Result<()> {
    let path = Config::config_path();
    let source = if path.exists() { "" } else { " (not found, using defaults)" };
    println!("# config file: {}{source}", path.display());
    println!("# history: {}", Config::database_path().display());
    println!("# logs: {}", Config::log_path().display());
    println!();
    print!("{}", config.to_toml()?);
    Ok(())
}

pub fn logs() -> Result<()> {
    // Files are rotated daily with the date appended
    println!("{}", sesh_core::logging::log_file_path().display());
    Ok(())
}
