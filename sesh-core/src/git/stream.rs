//! Streaming branch production and background refresh
//!
//! ```text
//!   local branches ──┐
//!                    ├──▶ BranchLines ──▶ selector stdin
//!   git ls-remote ───┘        ▲
//!        ▲                    │
//!        └── ProducerHandle ──┘  kill + reap when the selector exits
//! ```
//!
//! Local branches are yielded first, then remote heads as `ls-remote` prints
//! them, skipping names already seen. Nothing is buffered beyond one line.

use crate::error::{Error, Result};
use crate::process::path_arg;
use std::collections::HashSet;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};
use std::thread::{self, JoinHandle};

/// A running branch producer.
pub struct BranchStream {
    local: Vec<String>,
    child: Child,
}

impl BranchStream {
    /// Start `git ls-remote --heads origin` for `repo`, with `local` yielded first.
    pub fn spawn(repo: &Path, local: Vec<String>) -> Result<Self> {
        let child = Command::new("git")
            .args(["-C", path_arg(repo)?, "ls-remote", "--heads", "origin"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| Error::git("ls-remote", e.to_string()))?;

        tracing::debug!(repo = %repo.display(), local = local.len(), "Streaming branches");
        Ok(Self { local, child })
    }

    /// Split into the line source and the handle that stops the producer.
    pub fn into_parts(mut self) -> (BranchLines, ProducerHandle) {
        let remote = self
            .child
            .stdout
            .take()
            .map(|stdout| BufReader::new(stdout).lines());
        let lines = BranchLines {
            local: self.local.into_iter(),
            seen: HashSet::new(),
            remote,
        };
        (
            lines,
            ProducerHandle {
                child: Some(self.child),
            },
        )
    }
}

/// Iterator over branch names, local first, deduplicated.
pub struct BranchLines {
    local: std::vec::IntoIter<String>,
    seen: HashSet<String>,
    remote: Option<Lines<BufReader<ChildStdout>>>,
}

impl Iterator for BranchLines {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        for branch in self.local.by_ref() {
            if self.seen.insert(branch.clone()) {
                return Some(branch);
            }
        }

        let remote = self.remote.as_mut()?;
        loop {
            match remote.next() {
                Some(Ok(line)) => {
                    if let Some(branch) = parse_ls_remote_line(&line) {
                        if self.seen.insert(branch.to_string()) {
                            return Some(branch.to_string());
                        }
                    }
                }
                // EOF, or the producer was killed under us
                Some(Err(_)) | None => {
                    self.remote = None;
                    return None;
                }
            }
        }
    }
}

/// Owns the producer process; stopping or dropping it kills and reaps the child.
pub struct ProducerHandle {
    child: Option<Child>,
}

impl ProducerHandle {
    /// Kill the producer if still running and wait for it to exit.
    pub fn stop(mut self) {
        self.reap();
    }

    fn reap(&mut self) {
        if let Some(mut child) = self.child.take() {
            // Already-exited children make kill() fail, which is fine
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl Drop for ProducerHandle {
    fn drop(&mut self) {
        self.reap();
    }
}

/// Branch name from a `<sha>\trefs/heads/<name>` line.
pub fn parse_ls_remote_line(line: &str) -> Option<&str> {
    let (_, reference) = line.split_once('\t')?;
    reference
        .trim()
        .strip_prefix("refs/heads/")
        .filter(|name| !name.is_empty())
}

/// Run `git fetch --prune origin` on a detached thread.
///
/// Nobody waits on the handle during normal use; the refreshed refs only
/// matter to later invocations.
pub fn spawn_background_fetch(repo: &Path) -> JoinHandle<()> {
    let repo: PathBuf = repo.to_path_buf();
    thread::spawn(move || {
        let status = Command::new("git")
            .arg("-C")
            .arg(&repo)
            .args(["fetch", "--prune", "--quiet", "origin"])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        match status {
            Ok(s) if s.success() => {
                tracing::debug!(repo = %repo.display(), "Background fetch finished")
            }
            Ok(s) => tracing::warn!(repo = %repo.display(), status = %s, "Background fetch failed"),
            Err(e) => tracing::warn!(repo = %repo.display(), error = %e, "Background fetch failed"),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ls_remote_line() {
        assert_eq!(
            parse_ls_remote_line("abc123\trefs/heads/feature/x"),
            Some("feature/x")
        );
        assert_eq!(parse_ls_remote_line("abc123\trefs/tags/v1.0"), None);
        assert_eq!(parse_ls_remote_line("abc123\tHEAD"), None);
        assert_eq!(parse_ls_remote_line("garbage"), None);
    }

    #[test]
    fn test_local_branches_come_first_and_dedupe() {
        let lines = BranchLines {
            local: vec!["main".to_string(), "dev".to_string(), "main".to_string()].into_iter(),
            seen: HashSet::new(),
            remote: None,
        };
        assert_eq!(lines.collect::<Vec<_>>(), vec!["main", "dev"]);
    }

    #[test]
    fn test_producer_is_killed_and_reaped() {
        let child = Command::new("sh")
            .args(["-c", "while true; do echo x; sleep 1; done"])
            .stdout(Stdio::piped())
            .spawn()
            .unwrap();
        let pid = child.id();
        let handle = ProducerHandle { child: Some(child) };
        handle.stop();

        // Reaped children no longer appear in the process table
        let alive = Command::new("kill")
            .args(["-0", &pid.to_string()])
            .stderr(Stdio::null())
            .status()
            .unwrap();
        assert!(!alive.success());
    }
}
