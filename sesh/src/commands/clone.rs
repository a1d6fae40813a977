use anyhow::{Context, Result};
use sesh_core::discovery;
use sesh_core::format::display_path;
use sesh_core::git::{generate_project_name, Vcs};
use sesh_core::naming::bare_repo_path;
use sesh_core::{Error, SwitchOptions};

use crate::context::Ctx;
use crate::output;

pub fn run(ctx: &Ctx, url: &str, no_session: bool, no_attach: bool) -> Result<()> {
    let name = generate_project_name(url)?;
    let root = &ctx.config.workspace_dir;
    let bare = bare_repo_path(root, &name);
    if bare.exists() {
        return Err(Error::ProjectExists(name).into());
    }

    let pb = output::spinner(format!("Cloning {url}"));
    let cloned = ctx.vcs.clone_bare(url, &bare);
    pb.finish_and_clear();
    if let Err(e) = cloned {
        // Don't leave a half-written bare repo behind to block a retry
        if bare.exists() {
            if let Err(cleanup) = std::fs::remove_dir_all(&bare) {
                tracing::warn!(path = %bare.display(), error = %cleanup, "Failed to remove partial clone");
            }
        }
        return Err(e).with_context(|| format!("failed to clone {url}"));
    }

    let projects = ctx.projects()?;
    let project = discovery::resolve_project(&projects, &name)?;
    let default_branch = ctx
        .vcs
        .default_branch(&project.bare_path)
        .context("failed to determine default branch")?;
    tracing::info!(project = %project.name, branch = %default_branch, "Cloned project");

    if no_session {
        let dest = project.worktree_path(&default_branch);
        ctx.vcs
            .create_worktree(&project.bare_path, &default_branch, &dest)
            .with_context(|| format!("failed to check out {default_branch}"))?;
        output::success(format!(
            "Cloned {} ({default_branch} at {})",
            project.name,
            display_path(&dest)
        ));
        return Ok(());
    }

    let history = ctx.history()?;
    let opts = SwitchOptions {
        attach: !no_attach && ctx.interactive,
        ..SwitchOptions::default()
    };
    let outcome = ctx
        .switcher(Some(&history))
        .switch(project, &default_branch, &opts)?;

    output::success(format!(
        "Cloned {} ({default_branch} at {})",
        project.name,
        display_path(&outcome.worktree_path)
    ));
    if outcome.session_created && !outcome.attached {
        output::note(format!("Session {} is ready", outcome.session_name));
    }
    Ok(())
}
