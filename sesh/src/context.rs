//! Shared command context: config, git, backend and project resolution.

use anyhow::{anyhow, Context, Result};
use sesh_core::backend::{create_backend, Backend, SessionBackend};
use sesh_core::discovery::{self, project_for_path};
use sesh_core::git::GitCli;
use sesh_core::selector::{Selection, Selector};
use sesh_core::{Config, History, Project, Switcher};

use crate::output;

pub struct Ctx {
    pub config: Config,
    pub vcs: GitCli,
    pub backend: Backend,
    pub interactive: bool,
}

impl Ctx {
    pub fn new(config: Config) -> Result<Self> {
        let backend = create_backend(&config.session_backend)
            .context("failed to select session backend")?;
        tracing::debug!(backend = %backend.name(), "Backend selected");
        Ok(Self {
            config,
            vcs: GitCli,
            backend,
            interactive: output::is_interactive(),
        })
    }

    /// Whether the backend has sessions that can be listed and queried.
    pub fn sessions_live(&self) -> bool {
        self.backend.is_running() && self.backend.tracks_sessions()
    }

    pub fn projects(&self) -> Result<Vec<Project>> {
        discovery::discover_projects(&self.vcs, &self.config.workspace_dir)
            .context("failed to scan workspace")
    }

    pub fn selector(&self) -> Result<Selector> {
        Ok(Selector::from_config(&self.config.fuzzy_finder)?)
    }

    /// Open the history store, pruning entries past the retention window.
    pub fn history(&self) -> Result<History> {
        let path = Config::database_path();
        let history = History::open(&path)
            .with_context(|| format!("failed to open history at {}", path.display()))?;
        if let Err(e) = history.prune(self.config.history.retention_days) {
            tracing::warn!(error = %e, "Failed to prune history");
        }
        Ok(history)
    }

    pub fn switcher<'a>(&'a self, history: Option<&'a History>) -> Switcher<'a, GitCli, Backend> {
        let switcher = Switcher::new(&self.vcs, &self.backend, &self.config);
        match history {
            Some(history) => switcher.with_history(history),
            None => switcher,
        }
    }

    /// Resolve the project to act on.
    ///
    /// An explicit name wins, then the project containing the current
    /// directory, then an interactive pick. `Ok(None)` means the pick was
    /// cancelled.
    pub fn resolve_project(&self, name: Option<&str>) -> Result<Option<Project>> {
        let projects = self.projects()?;
        if let Some(name) = name {
            return Ok(Some(discovery::resolve_project(&projects, name)?.clone()));
        }

        if let Ok(cwd) = std::env::current_dir() {
            if let Some(project) = project_for_path(&projects, &cwd) {
                tracing::debug!(project = %project.name, "Project from current directory");
                return Ok(Some(project.clone()));
            }
        }

        if projects.is_empty() {
            return Err(anyhow!(
                "no projects in {} (run `sesh clone <url>` first)",
                self.config.workspace_dir.display()
            ));
        }
        if !self.interactive {
            return Err(anyhow!(
                "not inside a project; pass --project when stdin is not a terminal"
            ));
        }

        let names: Vec<String> = projects.iter().map(|p| p.name.clone()).collect();
        let selector = self.selector()?;
        let selection = output::while_selecting(|| selector.select(&names, "project>", None))?;
        Ok(match selection {
            Selection::Selected(name) => projects.into_iter().find(|p| p.name == name),
            Selection::Cancelled => None,
        })
    }
}
