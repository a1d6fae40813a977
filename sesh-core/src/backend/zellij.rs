//! zellij backend
//!
//! zellij has no structured session query, so `list` parses the text of
//! `list-sessions` and `exists` is derived from it. Background creation
//! returns before the session server is up; [`Zellij::create`] waits for a
//! short settling delay before returning.

use super::SessionBackend;
use crate::error::{Error, Result};
use crate::process::{command_available, exec_replace, run_capture, CmdOutput};
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Duration;

const PROGRAM: &str = "zellij";

/// Default wait after spawning a background session
const SETTLE_DELAY: Duration = Duration::from_millis(500);

/// zellij session backend
#[derive(Debug, Clone, Copy)]
pub struct Zellij {
    settle_delay: Duration,
}

impl Default for Zellij {
    fn default() -> Self {
        Self::new()
    }
}

impl Zellij {
    pub fn new() -> Self {
        Self {
            settle_delay: SETTLE_DELAY,
        }
    }

    fn run(&self, operation: &str, args: &[&str]) -> Result<CmdOutput> {
        let output = run_capture(PROGRAM, args, None)
            .map_err(|e| Error::backend(PROGRAM, operation, e.to_string()))?;
        if !output.success() {
            return Err(Error::backend(PROGRAM, operation, output.error_line()));
        }
        Ok(output)
    }
}

/// Session names from `zellij list-sessions` output.
///
/// Takes the first token of each line, so both `--short` output and the
/// decorated form (`name [Created 2h ago] (current)`) parse.
pub(crate) fn parse_session_list(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .filter(|name| !name.starts_with("ACTIVE"))
        .map(str::to_string)
        .collect()
}

impl SessionBackend for Zellij {
    fn name(&self) -> String {
        PROGRAM.to_string()
    }

    fn create(&self, name: &str, path: &Path) -> Result<()> {
        tracing::info!(session = name, path = %path.display(), "Creating zellij session");
        let status = Command::new(PROGRAM)
            .args(["attach", "--create-background", name])
            .current_dir(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| Error::backend(PROGRAM, "create", e.to_string()))?;
        if !status.success() {
            return Err(Error::backend(
                PROGRAM,
                "create",
                format!("exited with {status}"),
            ));
        }

        std::thread::sleep(self.settle_delay);
        Ok(())
    }

    fn attach(&self, name: &str) -> Result<()> {
        if self.is_inside_session() {
            return self.switch(name);
        }
        Err(Error::backend(
            PROGRAM,
            "attach",
            exec_replace(PROGRAM, &["attach", name]).to_string(),
        ))
    }

    fn switch(&self, name: &str) -> Result<()> {
        self.run("switch", &["action", "switch-session", name])?;
        Ok(())
    }

    fn list(&self) -> Result<Vec<String>> {
        let output = run_capture(
            PROGRAM,
            &["list-sessions", "--short", "--no-formatting"],
            None,
        )
        .map_err(|e| Error::backend(PROGRAM, "list", e.to_string()))?;

        if !output.success() {
            // zellij exits non-zero when there is nothing to list
            if output.stderr.to_ascii_lowercase().contains("no active zellij sessions") {
                return Ok(Vec::new());
            }
            return Err(Error::backend(PROGRAM, "list", output.error_line()));
        }
        Ok(parse_session_list(&output.stdout))
    }

    fn delete(&self, name: &str) -> Result<()> {
        tracing::info!(session = name, "Deleting zellij session");
        self.run("delete", &["delete-session", "--force", name])?;
        Ok(())
    }

    fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.list()?.iter().any(|s| s == name))
    }

    fn is_running(&self) -> bool {
        command_available(PROGRAM)
    }

    fn is_inside_session(&self) -> bool {
        std::env::var_os("ZELLIJ").is_some()
    }

    fn current_session_name(&self) -> Result<Option<String>> {
        if !self.is_inside_session() {
            return Ok(None);
        }
        Ok(std::env::var("ZELLIJ_SESSION_NAME")
            .ok()
            .filter(|name| !name.is_empty()))
    }

    fn run_in_session(&self, name: &str, command: &str) -> Result<()> {
        self.run(
            "write-chars",
            &["--session", name, "action", "write-chars", command],
        )?;
        // 13 is carriage return
        self.run("write", &["--session", name, "action", "write", "13"])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_short_output() {
        let out = "widgets-main\nwidgets-feature-x\n\n";
        assert_eq!(
            parse_session_list(out),
            vec!["widgets-main", "widgets-feature-x"]
        );
    }

    #[test]
    fn test_parse_decorated_output() {
        let out = "widgets-main [Created 2h ago] (current)\n  \nold-one [Created 3d ago] (EXITED - attach to resurrect)\n";
        assert_eq!(parse_session_list(out), vec!["widgets-main", "old-one"]);
    }

    #[test]
    fn test_parse_skips_header() {
        assert_eq!(
            parse_session_list("ACTIVE SESSIONS:\nfoo-main\n"),
            vec!["foo-main"]
        );
    }

    #[test]
    fn test_identity() {
        let z = Zellij::new();
        assert_eq!(z.name(), "zellij");
        assert!(z.tracks_sessions());
    }
}
