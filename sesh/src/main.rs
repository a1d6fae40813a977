//! sesh - git worktree and terminal session manager
//!
//! Clones repositories as bare repos, checks branches out as worktrees and
//! pairs every worktree with a tmux/zellij session (or an editor window).
//!
//! Uses XDG Base Directory specification for file locations:
//! - Config: $XDG_CONFIG_HOME/sesh/config.toml (~/.config/sesh/config.toml)
//! - History: $XDG_DATA_HOME/sesh/history.db (~/.local/share/sesh/history.db)
//! - Log: $XDG_STATE_HOME/sesh/sesh.log (~/.local/state/sesh/sesh.log)

mod commands;
mod context;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crossterm::style::Stylize;
use sesh_core::Config;

use crate::context::Ctx;

#[derive(Parser)]
#[command(name = "sesh")]
#[command(about = "Manage git worktrees and their terminal sessions")]
#[command(version)]
struct Args {
    /// Verbose output (debug logs on stderr)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Clone a repository into the workspace
    Clone {
        /// Remote URL (https://, ssh:// or git@host:owner/repo)
        url: String,

        /// Don't start a session for the default branch
        #[arg(long)]
        no_session: bool,

        /// Start the session but don't attach to it
        #[arg(long)]
        no_attach: bool,
    },

    /// Switch to a branch, creating its worktree and session as needed
    #[command(visible_alias = "sw")]
    Switch(commands::switch::SwitchArgs),

    /// List projects, worktrees and sessions
    #[command(visible_alias = "ls")]
    List(commands::list::ListArgs),

    /// Fetch from origin for one project or all of them
    Fetch(commands::fetch::FetchArgs),

    /// List open pull requests
    Pr {
        /// Project (defaults to the one containing the current directory)
        #[arg(short, long)]
        project: Option<String>,

        /// Pick a pull request and switch to its branch
        #[arg(short, long)]
        switch: bool,
    },

    /// Return to the previous session
    #[command(visible_aliases = ["p", "back", "last"])]
    Pop,

    /// Delete a worktree and its session, or a whole project
    #[command(visible_alias = "rm")]
    Delete(commands::delete::DeleteArgs),

    /// Remove orphaned, remote-deleted or stale worktrees
    Clean(commands::clean::CleanArgs),

    /// Show the current project, branch and session
    Status,

    /// Show details of one session
    Info {
        /// Session name, or a branch when --project is given
        target: String,

        /// Project to look the branch up in
        #[arg(short, long)]
        project: Option<String>,
    },

    /// Show recently visited sessions
    History {
        /// Number of entries to show
        #[arg(short = 'n', long, default_value_t = 20)]
        limit: usize,

        /// Drop entries older than the configured retention
        #[arg(long)]
        prune: bool,
    },

    /// Show the effective configuration
    Config,

    /// Print the log file path
    Logs,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{} {err:#}", "error:".red().bold());
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = Args::parse();

    let config = Config::load().context("failed to load configuration")?;
    config.validate().context("invalid configuration")?;

    let _log_guard = sesh_core::logging::init(&config.logging, args.verbose)
        .context("failed to initialize logging")?;

    output::install_interrupt_handler()?;

    tracing::debug!(workspace = %config.workspace_dir.display(), "sesh starting");

    // Commands that don't need a backend
    match &args.command {
        Command::Config => return commands::info::config(&config),
        Command::Logs => return commands::info::logs(),
        _ => {}
    }

    let ctx = Ctx::new(config)?;

    match args.command {
        Command::Clone {
            url,
            no_session,
            no_attach,
        } => commands::clone::run(&ctx, &url, no_session, no_attach),
        Command::Switch(switch_args) => commands::switch::run(&ctx, switch_args),
        Command::List(list_args) => commands::list::run(&ctx, list_args),
        Command::Fetch(fetch_args) => commands::fetch::run(&ctx, fetch_args),
        Command::Pr { project, switch } => commands::pr::run(&ctx, project.as_deref(), switch),
        Command::Pop => commands::pop::run(&ctx),
        Command::Delete(delete_args) => commands::delete::run(&ctx, delete_args),
        Command::Clean(clean_args) => commands::clean::run(&ctx, clean_args),
        Command::Status => commands::info::status(&ctx),
        Command::Info { target, project } => {
            commands::info::session(&ctx, &target, project.as_deref())
        }
        Command::History { limit, prune } => commands::history::run(&ctx, limit, prune),
        Command::Config | Command::Logs => Ok(()),
    }
}
