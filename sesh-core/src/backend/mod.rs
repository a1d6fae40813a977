//! Session backends
//!
//! A session backend hosts the interactive session for a worktree. The set
//! of variants is closed:
//!
//! | Key | Variant | Notes |
//! |-----|---------|-------|
//! | `tmux` | [`Tmux`] | full support, preferred by auto-detection |
//! | `zellij` | [`Zellij`] | list parsed from text, asynchronous create |
//! | `code`, `cursor`, `zed` (`:mode`) | [`Editor`] | "open a path" only |
//! | `none` | [`NullBackend`] | worktree-only mode |
//!
//! [`create_backend`] turns a configuration key into a [`Backend`]. A
//! backend that isn't installed degrades to [`NullBackend`] instead of failing
//! startup. Operations a variant can't express return [`Error::Unsupported`].

mod editor;
mod null;
mod tmux;
mod zellij;

pub use editor::{Editor, EditorCommand, EditorMode};
pub use null::NullBackend;
pub use tmux::Tmux;
pub use zellij::Zellij;

use crate::error::{Error, Result};
use std::fmt;
use std::path::Path;

/// Capability set every session backend exposes.
pub trait SessionBackend {
    /// Selection key of this variant (`tmux`, `code:workspace`, ...)
    fn name(&self) -> String;

    /// Start a detached session rooted at `path`.
    fn create(&self, name: &str, path: &Path) -> Result<()>;

    /// Hand the terminal to `name`. Switches instead when already inside a session.
    fn attach(&self, name: &str) -> Result<()>;

    /// Move the current client to `name`.
    fn switch(&self, name: &str) -> Result<()>;

    /// Names of live sessions.
    fn list(&self) -> Result<Vec<String>>;

    /// Terminate a session.
    fn delete(&self, name: &str) -> Result<()>;

    /// Whether a session called `name` is live.
    fn exists(&self, name: &str) -> Result<bool>;

    /// Whether the backend program is installed.
    fn is_running(&self) -> bool;

    /// Whether this process runs inside one of the backend's sessions.
    fn is_inside_session(&self) -> bool;

    /// Session this process runs inside, if any.
    fn current_session_name(&self) -> Result<Option<String>>;

    /// Type `command` into a freshly created session.
    fn run_in_session(&self, _name: &str, _command: &str) -> Result<()> {
        Err(Error::Unsupported {
            backend: self.name(),
            operation: "run_in_session",
        })
    }

    /// False for variants with no session concept; callers then skip
    /// existence checks and only ever `create`.
    fn tracks_sessions(&self) -> bool {
        true
    }
}

// ============================================
// Selection
// ============================================

/// Parsed `session_backend` configuration value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Auto,
    Tmux,
    Zellij,
    Editor(EditorCommand, EditorMode),
    None,
}

impl BackendKind {
    /// Parse a selection key such as `auto`, `zellij` or `cursor:replace`.
    pub fn parse(key: &str) -> Result<Self> {
        let key = key.trim().to_ascii_lowercase();
        let (family, mode) = match key.split_once(':') {
            Some((family, mode)) => (family, Some(mode)),
            None => (key.as_str(), None),
        };

        let kind = match (family, mode) {
            ("auto", None) => BackendKind::Auto,
            ("tmux", None) => BackendKind::Tmux,
            ("zellij", None) => BackendKind::Zellij,
            ("none", None) => BackendKind::None,
            (family, mode) => {
                let command = EditorCommand::parse(family).ok_or_else(|| {
                    Error::Config(format!(
                        "unknown session backend '{key}' (expected auto, tmux, zellij, none, code, cursor or zed)"
                    ))
                })?;
                let mode = match mode {
                    Some(mode) => EditorMode::parse(command, mode).ok_or_else(|| {
                        Error::Config(format!(
                            "unknown mode '{mode}' for {} (expected {})",
                            command.program(),
                            command.supported_modes().join(", ")
                        ))
                    })?,
                    None => EditorMode::Open,
                };
                BackendKind::Editor(command, mode)
            }
        };
        Ok(kind)
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Auto => write!(f, "auto"),
            BackendKind::Tmux => write!(f, "tmux"),
            BackendKind::Zellij => write!(f, "zellij"),
            BackendKind::Editor(command, mode) => {
                write!(f, "{}:{}", command.program(), mode.as_str())
            }
            BackendKind::None => write!(f, "none"),
        }
    }
}

/// The closed set of backend variants.
#[derive(Debug, Clone)]
pub enum Backend {
    Tmux(Tmux),
    Zellij(Zellij),
    Editor(Editor),
    Null(NullBackend),
}

/// Forward a call to whichever variant is selected.
macro_rules! dispatch {
    ($self:ident, $b:ident => $call:expr) => {
        match $self {
            Backend::Tmux($b) => $call,
            Backend::Zellij($b) => $call,
            Backend::Editor($b) => $call,
            Backend::Null($b) => $call,
        }
    };
}

impl Backend {
    /// True for the degraded worktree-only variant
    pub fn is_null(&self) -> bool {
        matches!(self, Backend::Null(_))
    }
}

impl SessionBackend for Backend {
    fn name(&self) -> String {
        dispatch!(self, b => b.name())
    }

    fn create(&self, name: &str, path: &Path) -> Result<()> {
        dispatch!(self, b => b.create(name, path))
    }

    fn attach(&self, name: &str) -> Result<()> {
        dispatch!(self, b => b.attach(name))
    }

    fn switch(&self, name: &str) -> Result<()> {
        dispatch!(self, b => b.switch(name))
    }

    fn list(&self) -> Result<Vec<String>> {
        dispatch!(self, b => b.list())
    }

    fn delete(&self, name: &str) -> Result<()> {
        dispatch!(self, b => b.delete(name))
    }

    fn exists(&self, name: &str) -> Result<bool> {
        dispatch!(self, b => b.exists(name))
    }

    fn is_running(&self) -> bool {
        dispatch!(self, b => b.is_running())
    }

    fn is_inside_session(&self) -> bool {
        dispatch!(self, b => b.is_inside_session())
    }

    fn current_session_name(&self) -> Result<Option<String>> {
        dispatch!(self, b => b.current_session_name())
    }

    fn run_in_session(&self, name: &str, command: &str) -> Result<()> {
        dispatch!(self, b => b.run_in_session(name, command))
    }

    fn tracks_sessions(&self) -> bool {
        dispatch!(self, b => b.tracks_sessions())
    }
}

/// Build the backend selected by `key`, probing `PATH` for installed programs.
pub fn create_backend(key: &str) -> Result<Backend> {
    create_backend_with(key, crate::process::command_available)
}

/// Like [`create_backend`] with an explicit installed-program check.
pub fn create_backend_with(key: &str, installed: impl Fn(&str) -> bool) -> Result<Backend> {
    let kind = BackendKind::parse(key)?;
    let backend = match kind {
        BackendKind::Auto => detect_backend(&installed),
        BackendKind::None => Backend::Null(NullBackend),
        BackendKind::Tmux => Backend::Tmux(Tmux),
        BackendKind::Zellij => Backend::Zellij(Zellij::new()),
        BackendKind::Editor(command, mode) => Backend::Editor(Editor::new(command, mode)),
    };

    let program = match &backend {
        Backend::Tmux(_) => Some("tmux"),
        Backend::Zellij(_) => Some("zellij"),
        Backend::Editor(editor) => Some(editor.command().program()),
        Backend::Null(_) => None,
    };
    if let Some(program) = program {
        if !installed(program) {
            tracing::warn!(
                backend = %kind,
                program,
                "Session backend not installed, continuing without sessions"
            );
            return Ok(Backend::Null(NullBackend));
        }
    }

    tracing::debug!(backend = %backend.name(), "Selected session backend");
    Ok(backend)
}

/// Detect in priority order tmux, zellij; fall back to the null backend.
fn detect_backend(installed: &impl Fn(&str) -> bool) -> Backend {
    if installed("tmux") {
        Backend::Tmux(Tmux)
    } else if installed("zellij") {
        Backend::Zellij(Zellij::new())
    } else {
        Backend::Null(NullBackend)
    }
}
