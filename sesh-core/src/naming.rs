//! Canonical paths and session names
//!
//! Layout of a workspace root:
//!
//! ```text
//! <root>/github.com/acme/widgets.git     bare repository
//! <root>/github.com/acme/widgets/main    worktree for `main`
//! <root>/github.com/acme/widgets/feat-x  worktree for `feat/x`
//! ```
//!
//! Session names are `<short project name>-<sanitized branch>`, e.g.
//! `widgets-feat-x`. Everything here is pure; no function touches the disk.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Characters that are unsafe in directory names or multiplexer targets.
const UNSAFE_CHARS: &[char] = &[
    '/', '\\', ':', '*', '?', '"', '<', '>', '|', '#', '%', '&', '{', '}', '$', '!', '\'', '`',
    '=', '@',
];

/// Directory holding a project's worktrees: `<root>/<project>`.
pub fn project_path(root: &Path, project_name: &str) -> PathBuf {
    root.join(project_name)
}

/// Bare repository location: `<root>/<project>.git`.
pub fn bare_repo_path(root: &Path, project_name: &str) -> PathBuf {
    root.join(format!("{project_name}.git"))
}

/// Worktree location for a branch: `<project path>/<sanitized branch>`.
pub fn worktree_path(project_path: &Path, branch: &str) -> PathBuf {
    project_path.join(sanitize_branch_name(branch))
}

/// Replace path- and multiplexer-unsafe characters with `-`.
///
/// Runs of `-` collapse to one and leading/trailing `-` are trimmed, so the
/// function is idempotent.
pub fn sanitize_branch_name(branch: &str) -> String {
    let mut out = String::with_capacity(branch.len());
    for c in branch.chars() {
        let c = if UNSAFE_CHARS.contains(&c) || c.is_whitespace() {
            '-'
        } else {
            c
        };
        if c == '-' && out.ends_with('-') {
            continue;
        }
        out.push(c);
    }
    out.trim_matches('-').to_string()
}

/// Last path segment of a project name (`github.com/acme/widgets` -> `widgets`).
pub fn short_name(project_name: &str) -> &str {
    project_name
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(project_name)
}

/// Session name for a (project, branch) pair.
pub fn generate_session_name(project_name: &str, branch: &str) -> String {
    format!(
        "{}-{}",
        sanitize_branch_name(short_name(project_name)),
        sanitize_branch_name(branch)
    )
}

/// Form used to compare session names across backends.
///
/// tmux stores `.` and `:` as `_`, so both sides of a comparison are folded
/// the same way.
pub fn session_key(name: &str) -> String {
    name.replace(['.', ':'], "_")
}

/// Split a session name into `(short project name, sanitized branch)`.
///
/// Splits on the first `-`. A project whose short name contains `-` cannot be
/// recovered: `my-app-main` parses as `("my", "app-main")`.
pub fn parse_session_name(name: &str) -> Result<(String, String)> {
    match name.split_once('-') {
        Some((project, branch)) if !project.is_empty() && !branch.is_empty() => {
            Ok((project.to_string(), branch.to_string()))
        }
        _ => Err(Error::InvalidSessionName(name.to_string())),
    }
}

/// Expand a leading `~` to the home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => crate::config::home_dir().join(rest),
        Err(_) => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRICKY: &[&str] = &[
        "",
        "main",
        "feature/login",
        "/leading/slash/",
        "a//b",
        "a - b",
        "--dashes--",
        "fix: *stuff*?",
        "user@host=1",
        "we{ird}$!'`\"<>|#%&",
        "back\\slash",
        "tab\there",
        "---",
        "ünïcode/брэнч",
    ];

    #[test]
    fn test_paths() {
        let root = Path::new("/ws");
        let project = project_path(root, "github.com/acme/widgets");
        assert_eq!(project, PathBuf::from("/ws/github.com/acme/widgets"));
        assert_eq!(
            bare_repo_path(root, "github.com/acme/widgets"),
            PathBuf::from("/ws/github.com/acme/widgets.git")
        );
        assert_eq!(
            worktree_path(&project, "feature/login"),
            PathBuf::from("/ws/github.com/acme/widgets/feature-login")
        );
        // worktree dir sits next to the bare repo's sibling project dir
        assert_eq!(
            worktree_path(&project, "x").parent().unwrap(),
            bare_repo_path(root, "github.com/acme/widgets").with_extension("")
        );
    }

    #[test]
    fn test_sanitize_examples() {
        assert_eq!(sanitize_branch_name("feature/login"), "feature-login");
        assert_eq!(sanitize_branch_name("/leading/slash/"), "leading-slash");
        assert_eq!(sanitize_branch_name("a - b"), "a-b");
        assert_eq!(sanitize_branch_name("fix: *stuff*?"), "fix-stuff");
        assert_eq!(sanitize_branch_name("release-1.2"), "release-1.2");
        assert_eq!(sanitize_branch_name("---"), "");
    }

    #[test]
    fn test_sanitize_idempotent_and_clean() {
        for input in TRICKY {
            let once = sanitize_branch_name(input);
            assert_eq!(sanitize_branch_name(&once), once, "input: {input:?}");
            assert!(!once.starts_with('-'), "leading dash for {input:?}");
            assert!(!once.ends_with('-'), "trailing dash for {input:?}");
            assert!(!once.contains("--"), "doubled dash for {input:?}");
            assert!(!once.chars().any(|c| UNSAFE_CHARS.contains(&c)));
        }
    }

    #[test]
    fn test_session_name_has_no_tmux_separator() {
        let name = generate_session_name("github.com/acme/widgets", "fix:colon");
        assert_eq!(name, "widgets-fix-colon");
        assert!(!name.contains(':'));
    }

    #[test]
    fn test_session_name_injective_for_safe_branches() {
        let branches = ["main", "feature-a", "feature-b", "feature.a", "feature_a"];
        let names: std::collections::HashSet<_> = branches
            .iter()
            .map(|b| generate_session_name("github.com/acme/widgets", b))
            .collect();
        assert_eq!(names.len(), branches.len());
    }

    #[test]
    fn test_session_keys_distinct_unless_only_dots_differ() {
        let key = |b: &str| session_key(&generate_session_name("github.com/acme/widgets", b));

        let branches = ["main", "feature-a", "feature-b", "feature_a", "release/1"];
        let keys: std::collections::HashSet<_> = branches.iter().map(|b| key(b)).collect();
        assert_eq!(keys.len(), branches.len());

        // The switcher refuses these instead of sharing one tmux session
        assert_eq!(key("feature.a"), key("feature_a"));
        assert_eq!(key("v1.2"), "widgets-v1_2");
    }

    #[test]
    fn test_parse_round_trip() {
        for branch in ["main", "feature/login", "a - b", "fix: x"] {
            let name = generate_session_name("github.com/acme/widgets", branch);
            let (project, parsed_branch) = parse_session_name(&name).unwrap();
            assert_eq!(project, "widgets");
            assert_eq!(parsed_branch, sanitize_branch_name(branch));
        }
    }

    #[test]
    fn test_parse_is_lossy_for_hyphenated_projects() {
        let name = generate_session_name("github.com/acme/my-app", "main");
        assert_eq!(name, "my-app-main");
        let (project, branch) = parse_session_name(&name).unwrap();
        assert_eq!(project, "my");
        assert_eq!(branch, "app-main");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(matches!(
            parse_session_name("nodash"),
            Err(Error::InvalidSessionName(_))
        ));
        assert!(parse_session_name("-main").is_err());
        assert!(parse_session_name("widgets-").is_err());
    }

    #[test]
    fn test_session_key_folds_tmux_specials() {
        assert_eq!(session_key("widgets-v1.2"), "widgets-v1_2");
        assert_eq!(session_key(&session_key("a.b")), "a_b");
    }

    #[test]
    fn test_short_name() {
        assert_eq!(short_name("github.com/acme/widgets"), "widgets");
        assert_eq!(short_name("widgets"), "widgets");
        assert_eq!(short_name("gitlab.com/a/b/c/"), "c");
    }

    #[test]
    fn test_expand_home() {
        let expanded = expand_home(Path::new("~/work"));
        assert!(expanded.ends_with("work"));
        assert!(!expanded.starts_with("~"));
        assert_eq!(expand_home(Path::new("/abs")), PathBuf::from("/abs"));
    }
}
