//! Parsing of `git worktree list --porcelain`

use std::path::PathBuf;

/// One record from `git worktree list --porcelain`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorktreeEntry {
    pub path: PathBuf,
    /// Short branch name, `None` when detached
    pub branch: Option<String>,
    /// Commit checked out, if reported
    pub head: Option<String>,
    /// The bare repository itself, which has no working directory
    pub bare: bool,
    /// Directory missing and flagged by git as prunable
    pub prunable: bool,
}

impl WorktreeEntry {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            branch: None,
            head: None,
            bare: false,
            prunable: false,
        }
    }
}

/// Parse porcelain output. Records are separated by blank lines.
pub fn parse_porcelain(output: &str) -> Vec<WorktreeEntry> {
    let mut entries = Vec::new();
    let mut current: Option<WorktreeEntry> = None;

    for line in output.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            entries.extend(current.take());
            continue;
        }

        let (key, value) = line.split_once(' ').unwrap_or((line, ""));
        match key {
            "worktree" => {
                entries.extend(current.take());
                current = Some(WorktreeEntry::new(PathBuf::from(value)));
            }
            "HEAD" => {
                if let Some(entry) = current.as_mut() {
                    entry.head = Some(value.to_string());
                }
            }
            "branch" => {
                if let Some(entry) = current.as_mut() {
                    let short = value.strip_prefix("refs/heads/").unwrap_or(value);
                    entry.branch = Some(short.to_string());
                }
            }
            "bare" => {
                if let Some(entry) = current.as_mut() {
                    entry.bare = true;
                }
            }
            "prunable" => {
                if let Some(entry) = current.as_mut() {
                    entry.prunable = true;
                }
            }
            // "detached", "locked" and future keys carry nothing we need
            _ => {}
        }
    }
    entries.extend(current.take());
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_layout() {
        let output = "\
worktree /ws/acme/widgets.git
bare

worktree /ws/acme/widgets/main
HEAD 1111111111111111111111111111111111111111
branch refs/heads/main

worktree /ws/acme/widgets/feature-x
HEAD 2222222222222222222222222222222222222222
branch refs/heads/feature/x

worktree /ws/acme/widgets/old
HEAD 3333333333333333333333333333333333333333
detached
prunable gitdir file points to non-existent location
";
        let entries = parse_porcelain(output);
        assert_eq!(entries.len(), 4);

        assert!(entries[0].bare);
        assert_eq!(entries[1].branch.as_deref(), Some("main"));
        assert_eq!(entries[2].branch.as_deref(), Some("feature/x"));
        assert_eq!(entries[2].path, PathBuf::from("/ws/acme/widgets/feature-x"));
        assert!(entries[3].branch.is_none());
        assert!(entries[3].prunable);
        assert_eq!(
            entries[3].head.as_deref(),
            Some("3333333333333333333333333333333333333333")
        );
    }

    #[test]
    fn test_parse_without_trailing_blank_line() {
        let entries = parse_porcelain("worktree /a\nHEAD abc\nbranch refs/heads/dev");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].branch.as_deref(), Some("dev"));
    }

    #[test]
    fn test_parse_empty() {
        assert!(parse_porcelain("").is_empty());
    }
}
