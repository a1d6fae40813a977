use anyhow::{Context, Result};
use clap::Args;
use sesh_core::discovery::{discover_worktrees, find_worktree_by_path};
use sesh_core::format::display_path;
use sesh_core::forge::{provider_for, PullRequestProvider};
use sesh_core::git::{spawn_background_fetch, GitCli, Vcs};
use sesh_core::selector::Selection;
use sesh_core::{Error, Project, SwitchOptions, SwitchOutcome};

use crate::context::Ctx;
use crate::output;

#[derive(Args, Debug)]
pub struct SwitchArgs {
    /// Branch to switch to (picked interactively when omitted)
    #[arg(conflicts_with = "pr")]
    pub branch: Option<String>,

    /// Project (defaults to the one containing the current directory)
    #[arg(short, long)]
    pub project: Option<String>,

    /// Create a new branch; fails if it already exists
    #[arg(short = 'b', long = "create", conflicts_with = "pr")]
    pub create: bool,

    /// Start point for a new branch (defaults to the current worktree's branch)
    #[arg(long, requires = "create")]
    pub from: Option<String>,

    /// Switch to the head branch of a pull request
    #[arg(long, value_name = "NUMBER")]
    pub pr: Option<u64>,

    /// Prepare the session without attaching to it
    #[arg(long)]
    pub no_attach: bool,
}

pub fn run(ctx: &Ctx, args: SwitchArgs) -> Result<()> {
    let Some(project) = ctx.resolve_project(args.project.as_deref())? else {
        output::note("Cancelled");
        return Ok(());
    };

    let branch = match (&args.branch, args.pr) {
        (Some(branch), _) => branch.clone(),
        (None, Some(number)) => pr_branch(ctx, &project, number)?,
        (None, None) => {
            if !ctx.interactive {
                return Err(Error::InvalidInput(
                    "a branch is required when stdin is not a terminal".to_string(),
                )
                .into());
            }
            match pick_branch(ctx, &project)? {
                Some(branch) => branch,
                None => {
                    output::note("Cancelled");
                    return Ok(());
                }
            }
        }
    };

    let opts = SwitchOptions {
        create_branch: args.create,
        start_point: start_point(ctx, &project, &args),
        attach: !args.no_attach && ctx.interactive,
    };
    switch_to(ctx, &project, &branch, &opts)
}

/// Run the switch and report what happened.
pub fn switch_to(ctx: &Ctx, project: &Project, branch: &str, opts: &SwitchOptions) -> Result<()> {
    let history = ctx.history()?;
    let outcome = ctx
        .switcher(Some(&history))
        .switch(project, branch, opts)
        .with_context(|| format!("failed to switch to {branch}"))?;
    report(ctx, branch, &outcome);
    Ok(())
}

fn report(ctx: &Ctx, branch: &str, outcome: &SwitchOutcome) {
    if outcome.branch_created {
        output::success(format!("Created branch {branch}"));
    }
    if outcome.worktree_created {
        output::success(format!(
            "Created worktree at {}",
            display_path(&outcome.worktree_path)
        ));
    }
    if ctx.backend.is_null() {
        output::note(format!(
            "No session backend; worktree is at {}",
            outcome.worktree_path.display()
        ));
    } else if outcome.session_created && !outcome.attached {
        output::success(format!("Started session {}", outcome.session_name));
    } else if outcome.attached {
        output::success(format!("Switched to {}", outcome.session_name));
    }
}

/// New branches start from `--from`, else from the branch of the worktree
/// we're standing in.
fn start_point(ctx: &Ctx, project: &Project, args: &SwitchArgs) -> Option<String> {
    if !args.create {
        return None;
    }
    if let Some(from) = &args.from {
        return Some(from.clone());
    }
    let cwd = std::env::current_dir().ok()?;
    let worktrees = discover_worktrees(&ctx.vcs, project).ok()?;
    find_worktree_by_path(&worktrees, &cwd)
        .filter(|w| !w.detached)
        .map(|w| w.branch.clone())
}

fn pr_branch(ctx: &Ctx, project: &Project, number: u64) -> Result<String> {
    let provider = provider_for(GitCli, &project.bare_path, &ctx.config.github)?;

    let pb = output::spinner(format!("Looking up pull request #{number}"));
    let branch = provider.pr_branch(&project.bare_path, number);
    pb.finish_and_clear();
    let branch = branch.with_context(|| format!("failed to look up pull request #{number}"))?;

    // The head branch may be newer than our remote-tracking refs
    fetch_origin(ctx, project)?;
    Ok(branch)
}

pub fn fetch_origin(ctx: &Ctx, project: &Project) -> Result<()> {
    let pb = output::spinner(format!("Fetching {}", project.name));
    let fetched = ctx.vcs.fetch(&project.bare_path);
    pb.finish_and_clear();
    fetched.context("failed to fetch origin")
}

fn pick_branch(ctx: &Ctx, project: &Project) -> Result<Option<String>> {
    // Refreshes refs for the next run; this selection streams ls-remote
    spawn_background_fetch(&project.bare_path);

    let stream = ctx.vcs.stream_branches(&project.bare_path)?;
    let preview = format!(
        "git -C '{}' log --oneline --color=always -n 30 {{}} --",
        project.bare_path.display()
    );

    let selector = ctx.selector()?;
    let selection =
        output::while_selecting(|| selector.select_stream(stream, "branch>", Some(&preview)))?;
    Ok(match selection {
        Selection::Selected(branch) => Some(branch),
        Selection::Cancelled => None,
    })
}
