use anyhow::Result;
use crossterm::style::Stylize;
use sesh_core::format::format_relative_time;

use crate::context::Ctx;
use crate::output;

pub fn run(ctx: &Ctx, limit: usize, prune: bool) -> Result<()> {
    let history = ctx.history()?;

    if prune {
        let retention = ctx.config.history.retention_days;
        let removed = history.prune(retention)?;
        if retention == 0 {
            output::note("history.retention_days is 0; nothing is pruned");
        } else {
            output::success(format!(
                "Removed {removed} entr{} older than {retention} days",
                if removed == 1 { "y" } else { "ies" }
            ));
        }
        return Ok(());
    }

    let entries = history.recent(limit)?;
    if entries.is_empty() {
        println!("No history yet");
        return Ok(());
    }

    for entry in entries {
        println!(
            "{:<10} {:<36} {}",
            format_relative_time(entry.accessed_at),
            entry.session_name,
            format!("{} {}", entry.project_name, entry.branch).dark_grey()
        );
    }
    Ok(())
}
