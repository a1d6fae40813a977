//! # sesh-core
//!
//! Core library for sesh - a git worktree and terminal session manager.
//!
//! This library provides:
//! - Stateless discovery of projects, worktrees and sessions
//! - A switch/create state machine over a version-control collaborator and
//!   a session backend (tmux, zellij, editors, or none)
//! - Reconciliation (orphaned, remote-deleted and stale worktrees)
//! - A SQLite history ring for returning to the previous session
//! - Configuration, logging, fuzzy selection and pull-request lookup
//!
//! ## Architecture
//!
//! The filesystem, git and the session backend are the source of truth.
//! Nothing about projects or sessions is stored; every command re-discovers
//! them. Only the session history is persisted.
//!
//! ```text
//!   <root>/
//!   ├── github.com/acme/widgets.git   bare repository
//!   └── github.com/acme/widgets/
//!       ├── main/                     main worktree
//!       └── feat-login/               worktree for feat/login
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use sesh_core::{backend, discovery, git::GitCli, Config, Switcher, SwitchOptions};
//!
//! let config = Config::load().expect("failed to load config");
//! let backend = backend::create_backend(&config.session_backend).expect("bad backend");
//! let projects = discovery::discover_projects(&GitCli, &config.workspace_dir).expect("walk failed");
//! let project = discovery::resolve_project(&projects, "widgets").expect("unknown project");
//!
//! Switcher::new(&GitCli, &backend, &config)
//!     .switch(project, "feat/login", &SwitchOptions::default())
//!     .expect("switch failed");
//! ```

// Re-export commonly used items at the crate root
pub use config::Config;
pub use db::Database;
pub use error::{Error, Result};
pub use history::History;
pub use switch::{SwitchOptions, SwitchOutcome, Switcher};
pub use types::*;

// Public modules
pub mod backend;
pub mod config;
pub mod db;
pub mod discovery;
pub mod error;
pub mod forge;
pub mod format;
pub mod git;
pub mod history;
pub mod logging;
pub mod naming;
pub mod reconcile;
pub mod selector;
pub mod switch;
pub mod types;

pub(crate) mod process;
