use anyhow::Result;
use clap::Args;
use crossterm::style::Stylize;
use sesh_core::discovery::discover_worktrees;
use sesh_core::format::display_path;
use sesh_core::git::Vcs;
use sesh_core::reconcile::{cleanup_candidates, delete_many, Candidate, CleanMode, CleanOptions};
use sesh_core::{Error, Worktree};

use crate::commands::switch::fetch_origin;
use crate::context::Ctx;
use crate::output;

#[derive(Args, Debug)]
pub struct CleanArgs {
    /// Project (defaults to the one containing the current directory)
    #[arg(short, long)]
    pub project: Option<String>,

    /// Worktrees without a live session
    #[arg(long)]
    pub orphaned: bool,

    /// Worktrees whose branch was deleted on the remote
    #[arg(long)]
    pub remote_deleted: bool,

    /// Worktrees whose directory no longer exists
    #[arg(long)]
    pub stale: bool,

    /// Don't ask for confirmation
    #[arg(short, long)]
    pub force: bool,
}

impl CleanArgs {
    fn options(&self) -> CleanOptions {
        let modes = [
            (self.orphaned, CleanMode::Orphaned),
            (self.remote_deleted, CleanMode::RemoteDeleted),
            (self.stale, CleanMode::Stale),
        ]
        .into_iter()
        .filter_map(|(on, mode)| on.then_some(mode))
        .collect();
        CleanOptions {
            modes,
            force: self.force,
        }
    }
}

pub fn run(ctx: &Ctx, args: CleanArgs) -> Result<()> {
    let opts = args.options();
    if opts.is_interactive() && !ctx.interactive {
        return Err(Error::InvalidInput(
            "pass --orphaned, --remote-deleted or --stale when stdin is not a terminal".to_string(),
        )
        .into());
    }
    if !opts.is_interactive() && !opts.force && !ctx.interactive {
        return Err(Error::InvalidInput(
            "refusing to clean without confirmation; pass --force".to_string(),
        )
        .into());
    }
    if opts.modes.contains(&CleanMode::Orphaned)
        && !ctx.sessions_live()
    {
        anyhow::bail!("--orphaned needs a session backend that tracks sessions");
    }

    let Some(project) = ctx.resolve_project(args.project.as_deref())? else {
        output::note("Cancelled");
        return Ok(());
    };

    if opts.modes.contains(&CleanMode::RemoteDeleted) {
        fetch_origin(ctx, &project)?;
    }

    let worktrees = discover_worktrees(&ctx.vcs, &project)?;
    let candidates = cleanup_candidates(&ctx.vcs, &ctx.backend, &project, &worktrees, &opts.modes)?;
    if candidates.is_empty() {
        println!("Nothing to clean in {}", project.name);
        return Ok(());
    }

    let chosen: Vec<&Worktree> = if opts.is_interactive() {
        pick(ctx, &candidates)?
    } else {
        for candidate in &candidates {
            println!("  {}", describe(candidate));
        }
        if !opts.force {
            let question = format!("Delete {} worktree(s)?", candidates.len());
            if !output::confirm(&question)? {
                output::note("Cancelled");
                return Ok(());
            }
        }
        candidates.iter().map(|c| c.worktree).collect()
    };
    if chosen.is_empty() {
        output::note("Cancelled");
        return Ok(());
    }

    // Worktrees with local changes are reported, never forced
    let outcomes = delete_many(&ctx.vcs, &ctx.backend, &project, &chosen, false);
    let mut failed = 0;
    for outcome in &outcomes {
        match &outcome.result {
            Ok(()) => output::success(format!("Removed {}", outcome.branch)),
            Err(e) => {
                failed += 1;
                output::failure(format!("{}: {e}", outcome.branch));
            }
        }
    }

    if opts.modes.contains(&CleanMode::Stale) {
        if let Err(e) = ctx.vcs.prune_worktrees(&project.bare_path) {
            tracing::warn!(error = %e, "Failed to prune worktree metadata");
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} worktree(s) could not be removed", outcomes.len());
    }
    Ok(())
}

fn describe(candidate: &Candidate<'_>) -> String {
    let reasons: Vec<&str> = candidate.reasons.iter().map(CleanMode::as_str).collect();
    let reasons = if reasons.is_empty() {
        String::new()
    } else {
        format!("[{}]", reasons.join(", "))
    };
    format!(
        "{:<32} {} {}",
        candidate.worktree.branch,
        reasons.yellow(),
        display_path(&candidate.worktree.path).dark_grey()
    )
}

fn pick<'a>(ctx: &Ctx, candidates: &[Candidate<'a>]) -> Result<Vec<&'a Worktree>> {
    let labels = picker_labels(candidates);
    let selector = ctx.selector()?;
    let chosen = output::while_selecting(|| selector.select_many(&labels, "clean>", None))?;
    Ok(chosen_worktrees(candidates, &labels, &chosen))
}

/// One line per candidate. Detached worktrees share a branch label, so the
/// path keeps every line unique.
fn picker_labels(candidates: &[Candidate<'_>]) -> Vec<String> {
    candidates
        .iter()
        .map(|c| format!("{}  {}", c.worktree.branch, display_path(&c.worktree.path)))
        .collect()
}

fn chosen_worktrees<'a>(
    candidates: &[Candidate<'a>],
    labels: &[String],
    chosen: &[String],
) -> Vec<&'a Worktree> {
    candidates
        .iter()
        .zip(labels)
        .filter(|(_, label)| chosen.contains(label))
        .map(|(c, _)| c.worktree)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sesh_core::git::DETACHED;
    use std::path::PathBuf;

    fn detached(path: &str) -> Worktree {
        Worktree {
            branch: DETACHED.to_string(),
            path: PathBuf::from(path),
            is_main: false,
            detached: true,
            last_used: chrono::Utc::now(),
        }
    }

    fn args(orphaned: bool, remote_deleted: bool, stale: bool) -> CleanArgs {
        CleanArgs {
            project: None,
            orphaned,
            remote_deleted,
            stale,
            force: false,
        }
    }

    #[test]
    fn test_no_flags_is_interactive() {
        assert!(args(false, false, false).options().is_interactive());
    }

    #[test]
    fn test_picking_one_detached_worktree_keeps_the_other() {
        let first = detached("/work/widgets/scratch-1");
        let second = detached("/work/widgets/scratch-2");
        let candidates = vec![
            Candidate {
                worktree: &first,
                reasons: vec![CleanMode::Orphaned],
            },
            Candidate {
                worktree: &second,
                reasons: vec![CleanMode::Orphaned],
            },
        ];

        let labels = picker_labels(&candidates);
        assert_ne!(labels[0], labels[1]);

        let chosen = chosen_worktrees(&candidates, &labels, &[labels[1].clone()]);
        assert_eq!(chosen.len(), 1);
        assert_eq!(chosen[0].path, second.path);
    }

    #[test]
    fn test_modes_follow_flags() {
        let opts = args(true, false, true).options();
        assert_eq!(opts.modes, vec![CleanMode::Orphaned, CleanMode::Stale]);
        assert!(!opts.is_interactive());
    }
}
