use anyhow::{Context, Result};
use crossterm::style::Stylize;
use sesh_core::forge::{parse_pr_number, provider_for, PullRequestProvider};
use sesh_core::format::format_relative_time;
use sesh_core::git::GitCli;
use sesh_core::selector::Selection;
use sesh_core::SwitchOptions;

use crate::commands::switch::{fetch_origin, switch_to};
use crate::context::Ctx;
use crate::output;

pub fn run(ctx: &Ctx, project: Option<&str>, switch: bool) -> Result<()> {
    let Some(project) = ctx.resolve_project(project)? else {
        output::note("Cancelled");
        return Ok(());
    };
    let provider = provider_for(GitCli, &project.bare_path, &ctx.config.github)?;

    let pb = output::spinner(format!("Fetching pull requests from {}", provider.name()));
    let pulls = provider.list_open_prs(&project.bare_path);
    pb.finish_and_clear();
    let pulls = pulls.context("failed to list pull requests")?;

    if pulls.is_empty() {
        println!("No open pull requests for {}", project.name);
        return Ok(());
    }

    if !switch {
        for pr in &pulls {
            let number = format!("#{:<5}", pr.number);
            let draft = if pr.draft { " [draft]".dark_grey().to_string() } else { String::new() };
            println!(
                "{} {}{} {} {} {}",
                number.cyan(),
                pr.title,
                draft,
                format!("({})", pr.branch).green(),
                format!("by {}", pr.author).dark_grey(),
                format_relative_time(pr.updated_at).dark_grey()
            );
        }
        return Ok(());
    }

    if !ctx.interactive {
        anyhow::bail!("--switch needs a terminal to pick a pull request");
    }
    let lines: Vec<String> = pulls.iter().map(|pr| pr.display_line()).collect();
    let selector = ctx.selector()?;
    let selection = output::while_selecting(|| selector.select(&lines, "pr>", None))?;
    let Selection::Selected(line) = selection else {
        output::note("Cancelled");
        return Ok(());
    };

    let number = parse_pr_number(&line)?;
    let branch = pulls
        .iter()
        .find(|pr| pr.number == number)
        .map(|pr| pr.branch.clone())
        .with_context(|| format!("pull request #{number} is not in the list"))?;
    fetch_origin(ctx, &project)?;
    let opts = SwitchOptions {
        attach: ctx.interactive,
        ..SwitchOptions::default()
    };
    switch_to(ctx, &project, &branch, &opts)
}
