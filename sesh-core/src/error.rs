//! Error types for sesh-core

use thiserror::Error;

/// Main error type for the sesh-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Database error (history store)
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// A git invocation failed
    #[error("git {operation} failed: {detail}")]
    Git { operation: String, detail: String },

    /// The backend is installed but the operation failed
    #[error("{backend} {operation} failed: {detail}")]
    Backend {
        backend: String,
        operation: String,
        detail: String,
    },

    /// The backend variant has no notion of this operation
    #[error("{backend} does not support {operation}")]
    Unsupported {
        backend: String,
        operation: &'static str,
    },

    /// No session backend is installed or selected
    #[error("no session backend available")]
    NoBackend,

    /// Project could not be resolved
    #[error("project not found: {0}")]
    ProjectNotFound(String),

    /// Short project name matched more than one project
    #[error("project name '{name}' is ambiguous, matches: {}", matches.join(", "))]
    AmbiguousProject { name: String, matches: Vec<String> },

    /// A project with this name already exists in the workspace
    #[error("project already exists: {0}")]
    ProjectExists(String),

    /// No worktree for the requested branch
    #[error("worktree not found for branch: {0}")]
    WorktreeNotFound(String),

    /// Branch does not exist locally or on the remote
    #[error("branch not found: {0}")]
    BranchNotFound(String),

    /// A new branch was requested but one with this name exists
    #[error("branch already exists: {0}")]
    BranchExists(String),

    /// The main worktree can't be removed on its own
    #[error("refusing to remove the main worktree ({0})")]
    MainWorktree(String),

    /// Session name doesn't follow the `<project>-<branch>` shape
    #[error("invalid session name: {0}")]
    InvalidSessionName(String),

    /// Remote URL could not be turned into a project name
    #[error("invalid remote URL '{url}': {reason}")]
    InvalidRemoteUrl { url: String, reason: String },

    /// History has no entry other than the current session
    #[error("no previous session found in history")]
    NoPreviousSession,

    /// History pointed at a session the backend no longer has
    #[error("previous session '{0}' no longer exists")]
    SessionGone(String),

    /// Two branches map to one session once the backend renames it
    #[error("session '{session}' for branch {branch} is already taken by branch {other}")]
    SessionCollision {
        session: String,
        branch: String,
        other: String,
    },

    /// Selector was handed an empty list
    #[error("nothing to select")]
    NothingToSelect,

    /// Fuzzy finder failed to run or exited abnormally
    #[error("selector error: {0}")]
    Selector(String),

    /// Pull-request provider error
    #[error("forge error: {0}")]
    Forge(String),

    /// Conflicting or missing user input
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Build a [`Error::Git`] from an operation label and captured stderr.
    pub fn git(operation: impl Into<String>, detail: impl Into<String>) -> Self {
        Error::Git {
            operation: operation.into(),
            detail: detail.into(),
        }
    }

    /// Build a [`Error::Backend`] for a failed backend invocation.
    pub fn backend(
        backend: impl Into<String>,
        operation: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Error::Backend {
            backend: backend.into(),
            operation: operation.into(),
            detail: detail.into(),
        }
    }

    /// True for errors that mean "this variant can't do that" rather than a failure.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Error::Unsupported { .. })
    }
}

/// Result type alias for sesh-core
pub type Result<T> = std::result::Result<T, Error>;
