//! Subprocess helpers shared by the git collaborator and session backends.
//!
//! Every call blocks until the child exits. There are no timeouts.

use crate::error::{Error, Result};
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};

/// True if `bin` resolves on `PATH`.
pub(crate) fn command_available(bin: &str) -> bool {
    which::which(bin).is_ok()
}

/// Captured output of a finished child.
#[derive(Debug)]
pub(crate) struct CmdOutput {
    pub(crate) status: ExitStatus,
    pub(crate) stdout: String,
    pub(crate) stderr: String,
}

impl CmdOutput {
    pub(crate) fn success(&self) -> bool {
        self.status.success()
    }

    /// Non-empty trimmed stdout lines
    pub(crate) fn lines(&self) -> Vec<&str> {
        self.stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect()
    }

    /// First non-empty stdout line, owned
    pub(crate) fn first_line(&self) -> Option<String> {
        self.lines().first().map(|line| (*line).to_string())
    }

    /// The most useful line of stderr for an error message
    pub(crate) fn error_line(&self) -> String {
        best_error_line(&self.stderr)
    }
}

/// Run `program` with captured stdout/stderr; stdin is closed.
pub(crate) fn run_capture(program: &str, args: &[&str], cwd: Option<&Path>) -> Result<CmdOutput> {
    let mut command = Command::new(program);
    command.args(args).stdin(Stdio::null());
    if let Some(cwd) = cwd {
        command.current_dir(cwd);
    }
    tracing::trace!(program, ?args, "Running command");
    let output = command.output()?;

    Ok(CmdOutput {
        status: output.status,
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    })
}

/// Replace the current process with `program`.
///
/// Only returns if the exec itself failed.
pub(crate) fn exec_replace(program: &str, args: &[&str]) -> Error {
    use std::os::unix::process::CommandExt;

    tracing::debug!(program, ?args, "Replacing process");
    let err = Command::new(program).args(args).exec();
    Error::Io(err)
}

/// Pick the line most likely to explain a failure.
pub(crate) fn best_error_line(stderr: &str) -> String {
    let lines: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    if let Some(line) = lines.iter().find(|line| {
        let lower = line.to_ascii_lowercase();
        lower.starts_with("error:") || lower.starts_with("fatal:")
    }) {
        return (*line).to_string();
    }

    lines
        .last()
        .map(|line| (*line).to_string())
        .unwrap_or_else(|| "unknown error".to_string())
}

/// Borrow a path as UTF-8 for use as a command argument.
pub(crate) fn path_arg(path: &Path) -> Result<&str> {
    path.to_str()
        .ok_or_else(|| Error::InvalidInput(format!("path is not valid UTF-8: {}", path.display())))
}
