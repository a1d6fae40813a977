//! Stateless workspace discovery
//!
//! Nothing here is cached. Every call re-reads the filesystem and asks git,
//! so the result can't drift from what is actually on disk.
//!
//! The walk treats any `*.git` directory holding a `config` file as a bare
//! repository and does not descend into it. Directories containing a `.git`
//! entry are checked-out worktrees and are skipped too, which keeps the walk
//! proportional to the workspace layout rather than to repository contents.

use crate::backend::SessionBackend;
use crate::error::{Error, Result};
use crate::git::{Vcs, DETACHED};
use crate::naming::session_key;
use crate::types::{Project, Worktree};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A project and its worktrees, as returned by [`list_all`].
#[derive(Debug, Clone, Serialize)]
pub struct ProjectListing {
    pub project: Project,
    pub worktrees: Vec<Worktree>,
}

fn modified_at(path: &Path) -> Option<DateTime<Utc>> {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .map(DateTime::<Utc>::from)
}

fn is_bare_repo(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "git") && path.join("config").is_file()
}

/// Project name for a bare repo path below `root` (`<root>/a/b.git` -> `a/b`).
fn project_name(root: &Path, bare: &Path) -> Option<String> {
    let rel = bare.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    let joined = parts.join("/");
    joined.strip_suffix(".git").map(str::to_string)
}

/// Find every project below `root`.
///
/// Candidates whose `origin` can't be read are skipped. Walk errors abort.
pub fn discover_projects(vcs: &impl Vcs, root: &Path) -> Result<Vec<Project>> {
    if !root.is_dir() {
        tracing::debug!(root = %root.display(), "Workspace root does not exist");
        return Ok(Vec::new());
    }

    let mut projects = Vec::new();
    let mut walker = WalkDir::new(root).follow_links(false).min_depth(1).into_iter();

    while let Some(entry) = walker.next() {
        let entry = entry.map_err(|e| Error::Io(e.into()))?;
        if !entry.file_type().is_dir() {
            continue;
        }
        let path = entry.path();

        if is_bare_repo(path) {
            walker.skip_current_dir();
            let Some(name) = project_name(root, path) else {
                continue;
            };
            match vcs.remote_url(path) {
                Ok(remote_url) => projects.push(Project {
                    name: name.clone(),
                    remote_url,
                    bare_path: path.to_path_buf(),
                    path: crate::naming::project_path(root, &name),
                    created_at: modified_at(path).unwrap_or_else(Utc::now),
                }),
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "Skipping repository without origin");
                }
            }
        } else if path.join(".git").exists() {
            walker.skip_current_dir();
        }
    }

    projects.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(projects)
}

/// Worktrees of a project; the first one git reports is main.
pub fn discover_worktrees(vcs: &impl Vcs, project: &Project) -> Result<Vec<Worktree>> {
    let entries = vcs.list_worktrees(&project.bare_path)?;
    let now = Utc::now();

    Ok(entries
        .into_iter()
        .enumerate()
        .map(|(i, entry)| Worktree {
            detached: entry.branch.is_none(),
            branch: entry.branch.unwrap_or_else(|| DETACHED.to_string()),
            last_used: modified_at(&entry.path).unwrap_or(now),
            path: entry.path,
            is_main: i == 0,
        })
        .collect())
}

/// Live sessions of the backend. Errors propagate.
pub fn discover_sessions(backend: &impl SessionBackend) -> Result<Vec<String>> {
    backend.list()
}

/// Every project with its worktrees.
///
/// A project whose worktrees can't be listed is logged and left out so one
/// broken repository doesn't hide the rest.
pub fn list_all(vcs: &impl Vcs, root: &Path) -> Result<Vec<ProjectListing>> {
    let projects = discover_projects(vcs, root)?;
    let mut listings = Vec::with_capacity(projects.len());

    for project in projects {
        match discover_worktrees(vcs, &project) {
            Ok(worktrees) => listings.push(ProjectListing { project, worktrees }),
            Err(e) => {
                tracing::warn!(project = %project.name, error = %e, "Skipping project, failed to list worktrees");
            }
        }
    }
    Ok(listings)
}

// ============================================
// Resolution
// ============================================

/// Resolve a project by full name, or by short name when unambiguous.
pub fn resolve_project<'a>(projects: &'a [Project], name: &str) -> Result<&'a Project> {
    if let Some(project) = projects.iter().find(|p| p.name == name) {
        return Ok(project);
    }

    let matches: Vec<&Project> = projects
        .iter()
        .filter(|p| p.short_name() == name || p.name.ends_with(&format!("/{name}")))
        .collect();

    match matches.as_slice() {
        [] => Err(Error::ProjectNotFound(name.to_string())),
        [project] => Ok(*project),
        many => Err(Error::AmbiguousProject {
            name: name.to_string(),
            matches: many.iter().map(|p| p.name.clone()).collect(),
        }),
    }
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Project whose worktree directory or bare repo contains `path`.
pub fn project_for_path<'a>(projects: &'a [Project], path: &Path) -> Option<&'a Project> {
    let path = canonical(path);
    projects.iter().find(|p| {
        path.starts_with(canonical(&p.path)) || path.starts_with(canonical(&p.bare_path))
    })
}

/// Worktree checked out on `branch`.
pub fn find_worktree<'a>(worktrees: &'a [Worktree], branch: &str) -> Option<&'a Worktree> {
    worktrees.iter().find(|w| !w.detached && w.branch == branch)
}

/// Innermost worktree containing `path`.
pub fn find_worktree_by_path<'a>(worktrees: &'a [Worktree], path: &Path) -> Option<&'a Worktree> {
    let path = canonical(path);
    worktrees
        .iter()
        .filter(|w| path.starts_with(canonical(&w.path)))
        .max_by_key(|w| w.path.components().count())
}

/// Worktree whose session name is `session`, compared in folded form.
pub fn worktree_for_session<'a>(
    project: &Project,
    worktrees: &'a [Worktree],
    session: &str,
) -> Option<&'a Worktree> {
    let key = session_key(session);
    worktrees
        .iter()
        .find(|w| !w.detached && session_key(&project.session_name(&w.branch)) == key)
}
