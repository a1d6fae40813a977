use anyhow::{Context, Result};
use clap::Args;
use sesh_core::discovery::{discover_worktrees, find_worktree, find_worktree_by_path};
use sesh_core::format::display_path;
use sesh_core::git::Vcs;
use sesh_core::reconcile::{delete_project, delete_worktree};
use sesh_core::selector::Selection;
use sesh_core::{Error, Project, Worktree};

use crate::context::Ctx;
use crate::output;

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Branch whose worktree to delete (picked interactively when omitted)
    pub branch: Option<String>,

    /// Project (defaults to the one containing the current directory)
    #[arg(short, long)]
    pub project: Option<String>,

    /// Delete the whole project: every session, worktree and the bare repo
    #[arg(long)]
    pub all: bool,

    /// Skip confirmation and remove worktrees with local changes
    #[arg(short, long)]
    pub force: bool,

    /// Also delete the local branch
    #[arg(long, conflicts_with = "all")]
    pub delete_branch: bool,
}

/// What a delete invocation acts on.
#[derive(Debug, PartialEq, Eq)]
enum DeleteTarget {
    Worktree(Option<String>),
    Project,
}

impl DeleteArgs {
    fn target(&self) -> sesh_core::Result<DeleteTarget> {
        match (self.all, &self.branch) {
            (true, Some(branch)) => Err(Error::InvalidInput(format!(
                "--all deletes the whole project and can't be combined with a branch ('{branch}')"
            ))),
            (true, None) => Ok(DeleteTarget::Project),
            (false, branch) => Ok(DeleteTarget::Worktree(branch.clone())),
        }
    }
}

pub fn run(ctx: &Ctx, args: DeleteArgs) -> Result<()> {
    let target = args.target()?;
    if !args.force && !ctx.interactive {
        return Err(Error::InvalidInput(
            "refusing to delete without confirmation; pass --force".to_string(),
        )
        .into());
    }

    let Some(project) = ctx.resolve_project(args.project.as_deref())? else {
        output::note("Cancelled");
        return Ok(());
    };
    let worktrees = discover_worktrees(&ctx.vcs, &project)?;

    match target {
        DeleteTarget::Project => remove_project(ctx, &project, &worktrees, args.force),
        DeleteTarget::Worktree(branch) => {
            let Some(worktree) = pick_worktree(ctx, &worktrees, branch.as_deref())? else {
                output::note("Cancelled");
                return Ok(());
            };
            remove_worktree(ctx, &project, worktree, &args)
        }
    }
}

fn remove_project(ctx: &Ctx, project: &Project, worktrees: &[Worktree], force: bool) -> Result<()> {
    if !force {
        let question = format!(
            "Delete project {} with {} worktree(s) and its bare repository?",
            project.name,
            worktrees.len()
        );
        if !output::confirm(&question)? {
            output::note("Cancelled");
            return Ok(());
        }
    }
    delete_project(&ctx.backend, project, worktrees)
        .with_context(|| format!("failed to delete {}", project.name))?;
    output::success(format!("Deleted project {}", project.name));
    Ok(())
}

fn remove_worktree(ctx: &Ctx, project: &Project, worktree: &Worktree, args: &DeleteArgs) -> Result<()> {
    if worktree.is_main {
        return Err(Error::MainWorktree(worktree.branch.clone()).into());
    }
    if !args.force {
        let question = format!(
            "Delete worktree {} at {}?",
            worktree.branch,
            display_path(&worktree.path)
        );
        if !output::confirm(&question)? {
            output::note("Cancelled");
            return Ok(());
        }
    }

    delete_worktree(&ctx.vcs, &ctx.backend, project, worktree, args.force)
        .with_context(|| format!("failed to delete worktree {}", worktree.branch))?;
    output::success(format!("Deleted worktree {}", worktree.branch));

    if args.delete_branch && !worktree.detached {
        ctx.vcs
            .delete_branch(&project.bare_path, &worktree.branch, args.force)
            .with_context(|| format!("failed to delete branch {}", worktree.branch))?;
        output::success(format!("Deleted branch {}", worktree.branch));
    }
    Ok(())
}

/// The named branch, else the worktree we're standing in, else a pick.
fn pick_worktree<'a>(
    ctx: &Ctx,
    worktrees: &'a [Worktree],
    branch: Option<&str>,
) -> Result<Option<&'a Worktree>> {
    if let Some(branch) = branch {
        return find_worktree(worktrees, branch)
            .map(Some)
            .ok_or_else(|| Error::WorktreeNotFound(branch.to_string()).into());
    }

    if let Ok(cwd) = std::env::current_dir() {
        if let Some(worktree) = find_worktree_by_path(worktrees, &cwd).filter(|w| !w.is_main) {
            return Ok(Some(worktree));
        }
    }

    let candidates: Vec<String> = worktrees
        .iter()
        .filter(|w| !w.is_main)
        .map(|w| w.branch.clone())
        .collect();
    if !ctx.interactive {
        anyhow::bail!("a branch is required when stdin is not a terminal");
    }
    let selector = ctx.selector()?;
    let selection = output::while_selecting(|| selector.select(&candidates, "delete>", None))?;
    Ok(match selection {
        Selection::Selected(branch) => worktrees.iter().find(|w| !w.is_main && w.branch == branch),
        Selection::Cancelled => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(branch: Option<&str>, all: bool) -> DeleteArgs {
        DeleteArgs {
            branch: branch.map(str::to_string),
            project: None,
            all,
            force: false,
            delete_branch: false,
        }
    }

    #[test]
    fn test_all_with_branch_is_rejected() {
        let err = args(Some("feat"), true).target().unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_targets() {
        assert_eq!(args(None, true).target().unwrap(), DeleteTarget::Project);
        assert_eq!(
            args(Some("feat"), false).target().unwrap(),
            DeleteTarget::Worktree(Some("feat".to_string()))
        );
        assert_eq!(args(None, false).target().unwrap(), DeleteTarget::Worktree(None));
    }
}
