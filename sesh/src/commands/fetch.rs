use anyhow::Result;
use clap::Args;
use sesh_core::format::display_path;
use sesh_core::git::Vcs;

use crate::commands::switch::fetch_origin;
use crate::context::Ctx;
use crate::output;

#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Project (defaults to the one containing the current directory)
    #[arg(short, long, conflicts_with = "all")]
    pub project: Option<String>,

    /// Fetch every project in the workspace
    #[arg(long)]
    pub all: bool,
}

pub fn run(ctx: &Ctx, args: FetchArgs) -> Result<()> {
    if args.all {
        return fetch_all(ctx);
    }

    let Some(project) = ctx.resolve_project(args.project.as_deref())? else {
        output::note("Cancelled");
        return Ok(());
    };
    fetch_origin(ctx, &project)?;
    output::success(format!("Fetched {}", project.name));
    Ok(())
}

/// One project failing doesn't stop the rest; the command fails at the end.
fn fetch_all(ctx: &Ctx) -> Result<()> {
    let projects = ctx.projects()?;
    if projects.is_empty() {
        println!(
            "No projects in {}",
            display_path(&ctx.config.workspace_dir)
        );
        return Ok(());
    }

    let mut failed = 0;
    for project in &projects {
        let pb = output::spinner(format!("Fetching {}", project.name));
        let fetched = ctx.vcs.fetch(&project.bare_path);
        pb.finish_and_clear();
        match fetched {
            Ok(()) => output::success(&project.name),
            Err(e) => {
                failed += 1;
                tracing::warn!(project = %project.name, error = %e, "Fetch failed");
                output::failure(format!("{}: {e}", project.name));
            }
        }
    }

    println!(
        "Fetched {}/{} project(s)",
        projects.len() - failed,
        projects.len()
    );
    if failed > 0 {
        anyhow::bail!("{failed} of {} project(s) could not be fetched", projects.len());
    }
    Ok(())
}
