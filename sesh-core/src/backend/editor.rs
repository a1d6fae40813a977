//! Editor-family backend (VS Code, Cursor, Zed)
//!
//! Editors have no sessions, only "open this path". `create` opens the
//! worktree; `attach`/`switch` open their argument when it names an existing
//! directory. Everything that needs a session registry is unsupported.

use super::SessionBackend;
use crate::error::{Error, Result};
use crate::process::{command_available, path_arg, run_capture};
use std::path::Path;

/// Editor program
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorCommand {
    Code,
    Cursor,
    Zed,
}

impl EditorCommand {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "code" => Some(EditorCommand::Code),
            "cursor" => Some(EditorCommand::Cursor),
            "zed" => Some(EditorCommand::Zed),
            _ => None,
        }
    }

    /// Executable name
    pub fn program(&self) -> &'static str {
        match self {
            EditorCommand::Code => "code",
            EditorCommand::Cursor => "cursor",
            EditorCommand::Zed => "zed",
        }
    }

    pub fn supported_modes(&self) -> &'static [&'static str] {
        match self {
            EditorCommand::Code | EditorCommand::Cursor => &["open", "workspace", "replace"],
            EditorCommand::Zed => &["open", "reuse"],
        }
    }
}

/// How the path is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorMode {
    /// New window
    Open,
    /// Add the folder to the current workspace
    Workspace,
    /// Replace the folder in the last active window
    Replace,
    /// Zed: reuse the existing window
    Reuse,
}

impl EditorMode {
    /// Parse a mode, accepting only those the command understands.
    pub fn parse(command: EditorCommand, s: &str) -> Option<Self> {
        let mode = match s {
            "open" => EditorMode::Open,
            "workspace" => EditorMode::Workspace,
            "replace" => EditorMode::Replace,
            "reuse" => EditorMode::Reuse,
            _ => return None,
        };
        command.supported_modes().contains(&s).then_some(mode)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EditorMode::Open => "open",
            EditorMode::Workspace => "workspace",
            EditorMode::Replace => "replace",
            EditorMode::Reuse => "reuse",
        }
    }

    fn flag(&self) -> Option<&'static str> {
        match self {
            EditorMode::Open => None,
            EditorMode::Workspace => Some("--add"),
            EditorMode::Replace | EditorMode::Reuse => Some("-r"),
        }
    }
}

/// Editor backend for one command and mode
#[derive(Debug, Clone, Copy)]
pub struct Editor {
    command: EditorCommand,
    mode: EditorMode,
}

impl Editor {
    pub fn new(command: EditorCommand, mode: EditorMode) -> Self {
        Self { command, mode }
    }

    pub fn command(&self) -> EditorCommand {
        self.command
    }

    /// Arguments passed to the editor to open `path`.
    pub fn open_args<'a>(&self, path: &'a str) -> Vec<&'a str> {
        let mut args = Vec::with_capacity(2);
        args.extend(self.mode.flag());
        args.push(path);
        args
    }

    fn open(&self, operation: &str, path: &Path) -> Result<()> {
        let program = self.command.program();
        let args = self.open_args(path_arg(path)?);
        tracing::info!(editor = %self.name(), path = %path.display(), "Opening in editor");

        let output = run_capture(program, &args, None)
            .map_err(|e| Error::backend(self.name(), operation, e.to_string()))?;
        if !output.success() {
            return Err(Error::backend(self.name(), operation, output.error_line()));
        }
        Ok(())
    }

    fn unsupported(&self, operation: &'static str) -> Error {
        Error::Unsupported {
            backend: self.name(),
            operation,
        }
    }

    /// Open `target` when it is a directory; editors can't resolve session names.
    fn open_target(&self, operation: &'static str, target: &str) -> Result<()> {
        let path = Path::new(target);
        if path.is_dir() {
            self.open(operation, path)
        } else {
            Err(self.unsupported(operation))
        }
    }
}

impl SessionBackend for Editor {
    fn name(&self) -> String {
        format!("{}:{}", self.command.program(), self.mode.as_str())
    }

    fn create(&self, _name: &str, path: &Path) -> Result<()> {
        self.open("create", path)
    }

    fn attach(&self, name: &str) -> Result<()> {
        self.open_target("attach", name)
    }

    fn switch(&self, name: &str) -> Result<()> {
        self.open_target("switch", name)
    }

    fn list(&self) -> Result<Vec<String>> {
        Err(self.unsupported("list"))
    }

    fn delete(&self, _name: &str) -> Result<()> {
        Err(self.unsupported("delete"))
    }

    fn exists(&self, _name: &str) -> Result<bool> {
        Err(self.unsupported("exists"))
    }

    fn is_running(&self) -> bool {
        command_available(self.command.program())
    }

    fn is_inside_session(&self) -> bool {
        false
    }

    fn current_session_name(&self) -> Result<Option<String>> {
        Err(self.unsupported("current session"))
    }

    fn tracks_sessions(&self) -> bool {
        false
    }
}
