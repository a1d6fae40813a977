use anyhow::{anyhow, Result};
use clap::Args;
use crossterm::style::Stylize;
use serde::Serialize;
use sesh_core::backend::SessionBackend;
use sesh_core::discovery::{self, discover_worktrees, project_for_path, ProjectListing};
use sesh_core::format::{display_path, format_relative_time};
use sesh_core::reconcile::{classify, live_sessions};
use sesh_core::{Project, Worktree, WorktreeStatus};
use std::collections::HashSet;
use std::path::PathBuf;

use crate::context::Ctx;

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Only list project names
    #[arg(long, conflicts_with = "sessions")]
    pub projects: bool,

    /// Only list live sessions
    #[arg(long)]
    pub sessions: bool,

    /// Machine-readable output
    #[arg(long, conflicts_with = "plain")]
    pub json: bool,

    /// Session names only, one per line
    #[arg(long)]
    pub plain: bool,

    /// Only worktrees whose session is running
    #[arg(long)]
    pub running: bool,

    /// Limit to one project
    #[arg(short, long)]
    pub project: Option<String>,

    /// Limit to the project containing the current directory
    #[arg(long, conflicts_with = "project")]
    pub current_project: bool,
}

#[derive(Serialize)]
struct ProjectJson {
    name: String,
    remote_url: String,
    path: PathBuf,
    worktrees: Vec<WorktreeJson>,
}

#[derive(Serialize)]
struct WorktreeJson {
    branch: String,
    path: PathBuf,
    is_main: bool,
    status: WorktreeStatus,
    session: String,
    last_used: chrono::DateTime<chrono::Utc>,
}

pub fn run(ctx: &Ctx, args: ListArgs) -> Result<()> {
    if args.sessions {
        return list_sessions(ctx, &args);
    }

    let scope = if args.current_project {
        let cwd = std::env::current_dir()?;
        let all = ctx.projects()?;
        let project = project_for_path(&all, &cwd)
            .ok_or_else(|| anyhow!("not inside a sesh project"))?;
        Some(project.name.clone())
    } else {
        args.project.clone()
    };

    let mut listing: Vec<ProjectListing> = match scope {
        Some(name) => {
            let all = ctx.projects()?;
            let project = discovery::resolve_project(&all, &name)?.clone();
            let worktrees = discover_worktrees(&ctx.vcs, &project)?;
            vec![ProjectListing { project, worktrees }]
        }
        None => discovery::list_all(&ctx.vcs, &ctx.config.workspace_dir)?,
    };

    if args.projects {
        let projects: Vec<&Project> = listing.iter().map(|l| &l.project).collect();
        if args.json {
            println!("{}", serde_json::to_string_pretty(&projects)?);
        } else {
            for p in projects {
                println!("{}", p.name);
            }
        }
        return Ok(());
    }

    let sessions = session_keys(ctx);
    if args.running {
        keep_running(&mut listing, &sessions);
    }

    if args.plain {
        for name in session_names(&listing) {
            println!("{name}");
        }
        return Ok(());
    }

    if args.json {
        let out: Vec<ProjectJson> = listing
            .iter()
            .map(|ProjectListing { project: p, worktrees }| ProjectJson {
                name: p.name.clone(),
                remote_url: p.remote_url.clone(),
                path: p.path.clone(),
                worktrees: worktrees
                    .iter()
                    .map(|w| WorktreeJson {
                        branch: w.branch.clone(),
                        path: w.path.clone(),
                        is_main: w.is_main,
                        status: classify(w, p, &sessions),
                        session: p.session_name(&w.branch),
                        last_used: w.last_used,
                    })
                    .collect(),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if listing.is_empty() {
        if args.running {
            println!("No running sessions");
        } else {
            println!(
                "No projects in {}",
                display_path(&ctx.config.workspace_dir)
            );
        }
        return Ok(());
    }

    for ProjectListing { project: p, worktrees } in &listing {
        println!("{}", p.name.as_str().bold());
        for w in worktrees {
            print_worktree(w, classify(w, p, &sessions));
        }
    }
    Ok(())
}

/// Drop worktrees without a live session, then projects left empty.
fn keep_running(listing: &mut Vec<ProjectListing>, sessions: &HashSet<String>) {
    for entry in listing.iter_mut() {
        let project = &entry.project;
        entry
            .worktrees
            .retain(|w| classify(w, project, sessions) == WorktreeStatus::Active);
    }
    listing.retain(|entry| !entry.worktrees.is_empty());
}

/// Session name of every listed worktree, in listing order.
fn session_names(listing: &[ProjectListing]) -> Vec<String> {
    listing
        .iter()
        .flat_map(|l| l.worktrees.iter().map(|w| l.project.session_name(&w.branch)))
        .collect()
}

fn print_worktree(worktree: &Worktree, status: WorktreeStatus) {
    let marker = if worktree.is_main { "*" } else { " " };
    // Pad before styling; styled content ignores width
    let padded = format!("{:<8}", status.as_str());
    let status_text = match status {
        WorktreeStatus::Active => padded.green(),
        WorktreeStatus::Idle => padded.dark_grey(),
        WorktreeStatus::Missing => padded.red(),
    };
    println!(
        "  {marker} {:<32} {} {:<10} {}",
        worktree.branch,
        status_text,
        format_relative_time(worktree.last_used),
        display_path(&worktree.path).dark_grey()
    );
}

/// Folded names of live sessions; empty when the backend can't list them.
fn session_keys(ctx: &Ctx) -> HashSet<String> {
    if !ctx.sessions_live() {
        return HashSet::new();
    }
    live_sessions(&ctx.backend).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to list sessions");
        HashSet::new()
    })
}

fn list_sessions(ctx: &Ctx, args: &ListArgs) -> Result<()> {
    let sessions = if ctx.sessions_live() {
        discovery::discover_sessions(&ctx.backend)?
    } else {
        Vec::new()
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&sessions)?);
        return Ok(());
    }
    if args.plain {
        for name in sessions {
            println!("{name}");
        }
        return Ok(());
    }
    if sessions.is_empty() {
        println!("No sessions ({})", ctx.backend.name());
        return Ok(());
    }

    let current = ctx.backend.current_session_name().ok().flatten();
    for name in sessions {
        if current.as_deref() == Some(name.as_str()) {
            println!("{} {}", "*".green(), name.as_str().bold());
        } else {
            println!("  {name}");
        }
    }
    Ok(())
}
