//! tmux backend
//!
//! Targets are passed as `=name` so tmux matches the session name exactly
//! instead of by prefix (`has-session -t widgets-feat` would otherwise match
//! `widgets-feature`). tmux rewrites `.` and `:` in session names to `_`, so
//! names are normalized the same way before every call.

use super::SessionBackend;
use crate::error::{Error, Result};
use crate::process::{command_available, exec_replace, path_arg, run_capture, CmdOutput};
use std::path::Path;

const PROGRAM: &str = "tmux";

/// tmux session backend
#[derive(Debug, Clone, Copy, Default)]
pub struct Tmux;

impl Tmux {
    fn run(&self, operation: &str, args: &[&str]) -> Result<CmdOutput> {
        let output = run_capture(PROGRAM, args, None)
            .map_err(|e| Error::backend(PROGRAM, operation, e.to_string()))?;
        if !output.success() {
            return Err(Error::backend(PROGRAM, operation, output.error_line()));
        }
        Ok(output)
    }
}

/// Session name as tmux will store it.
pub(crate) fn tmux_name(name: &str) -> String {
    crate::naming::session_key(name)
}

/// Exact-match target for a session.
fn target(name: &str) -> String {
    format!("={}", tmux_name(name))
}

/// Output of a failed `list-sessions` that just means "no sessions".
fn is_no_server(stderr: &str) -> bool {
    let stderr = stderr.to_ascii_lowercase();
    stderr.contains("no server running") || stderr.contains("error connecting to")
}

impl SessionBackend for Tmux {
    fn name(&self) -> String {
        PROGRAM.to_string()
    }

    fn create(&self, name: &str, path: &Path) -> Result<()> {
        let session = tmux_name(name);
        tracing::info!(session = %session, path = %path.display(), "Creating tmux session");
        self.run(
            "create",
            &["new-session", "-d", "-s", &session, "-c", path_arg(path)?],
        )?;
        Ok(())
    }

    fn attach(&self, name: &str) -> Result<()> {
        if self.is_inside_session() {
            return self.switch(name);
        }
        let target = target(name);
        Err(Error::backend(
            PROGRAM,
            "attach",
            exec_replace(PROGRAM, &["attach-session", "-t", &target]).to_string(),
        ))
    }

    fn switch(&self, name: &str) -> Result<()> {
        self.run("switch", &["switch-client", "-t", &target(name)])?;
        Ok(())
    }

    fn list(&self) -> Result<Vec<String>> {
        let output = run_capture(PROGRAM, &["list-sessions", "-F", "#{session_name}"], None)
            .map_err(|e| Error::backend(PROGRAM, "list", e.to_string()))?;
        if !output.success() {
            if is_no_server(&output.stderr) {
                return Ok(Vec::new());
            }
            return Err(Error::backend(PROGRAM, "list", output.error_line()));
        }
        Ok(output.lines().into_iter().map(str::to_string).collect())
    }

    fn delete(&self, name: &str) -> Result<()> {
        tracing::info!(session = name, "Killing tmux session");
        self.run("delete", &["kill-session", "-t", &target(name)])?;
        Ok(())
    }

    fn exists(&self, name: &str) -> Result<bool> {
        let output = run_capture(PROGRAM, &["has-session", "-t", &target(name)], None)
            .map_err(|e| Error::backend(PROGRAM, "exists", e.to_string()))?;
        Ok(output.success())
    }

    fn is_running(&self) -> bool {
        command_available(PROGRAM)
    }

    fn is_inside_session(&self) -> bool {
        std::env::var_os("TMUX").is_some_and(|v| !v.is_empty())
    }

    fn current_session_name(&self) -> Result<Option<String>> {
        if !self.is_inside_session() {
            return Ok(None);
        }
        let output = self.run(
            "current session",
            &["display-message", "-p", "#{session_name}"],
        )?;
        Ok(output.first_line())
    }

    fn run_in_session(&self, name: &str, command: &str) -> Result<()> {
        let pane = format!("{}:", target(name));
        self.run("send-keys", &["send-keys", "-t", &pane, command, "Enter"])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_targets_are_exact_and_normalized() {
        assert_eq!(target("widgets-main"), "=widgets-main");
        assert_eq!(target("widgets-release-1.2"), "=widgets-release-1_2");
        assert_eq!(tmux_name("a:b.c"), "a_b_c");
    }

    #[test]
    fn test_no_server_detection() {
        assert!(is_no_server("no server running on /tmp/tmux-1000/default"));
        assert!(is_no_server(
            "error connecting to /tmp/tmux-1000/default (No such file or directory)"
        ));
        assert!(!is_no_server("unknown option -- z"));
    }

    #[test]
    fn test_identity() {
        assert_eq!(Tmux.name(), "tmux");
        assert!(Tmux.tracks_sessions());
    }
}
