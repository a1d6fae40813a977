//! Remote URL parsing and project naming
//!
//! A project's name is `host/owner.../repo`, lowercase, with the scheme, user,
//! port and `.git` suffix dropped. Two URLs produce the same name iff they
//! point at the same repository:
//!
//! ```text
//! git@github.com:Acme/Widgets.git          -> github.com/acme/widgets
//! https://github.com/acme/widgets          -> github.com/acme/widgets
//! ssh://git@github.com:22/acme/widgets.git -> github.com/acme/widgets
//! ```

use crate::error::{Error, Result};

/// A remote URL split into host and path segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteUrl {
    /// Lowercase host without user or port
    pub host: String,
    /// Owner segments followed by the repository name, lowercase
    pub segments: Vec<String>,
}

impl RemoteUrl {
    /// Everything before the repository name (`acme`, or `group/sub` on GitLab)
    pub fn owner(&self) -> String {
        self.segments[..self.segments.len() - 1].join("/")
    }

    /// Repository name
    pub fn repo(&self) -> &str {
        &self.segments[self.segments.len() - 1]
    }

    /// `host/owner/repo`
    pub fn project_name(&self) -> String {
        format!("{}/{}", self.host, self.segments.join("/"))
    }
}

/// Parse an `origin` URL in URL form (`https://`, `ssh://`, `git://`) or SCP form
/// (`git@host:owner/repo.git`).
pub fn parse_remote_url(url: &str) -> Result<RemoteUrl> {
    let trimmed = url.trim();
    let invalid = |reason: &str| Error::InvalidRemoteUrl {
        url: url.to_string(),
        reason: reason.to_string(),
    };

    let (host, path) = if trimmed.contains("://") {
        let parsed = url::Url::parse(trimmed).map_err(|e| invalid(&e.to_string()))?;
        let host = parsed
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| invalid("missing host"))?
            .to_string();
        (host, parsed.path().to_string())
    } else {
        match trimmed.split_once(':') {
            Some((user_host, path)) if !user_host.contains('/') => {
                let host = user_host.rsplit('@').next().unwrap_or(user_host);
                if host.is_empty() {
                    return Err(invalid("missing host"));
                }
                (host.to_string(), path.to_string())
            }
            _ => return Err(invalid("expected scheme://host/path or user@host:path")),
        }
    };

    let path = path.trim_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);
    let segments: Vec<String> = path
        .split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
        .collect();

    if segments.len() < 2 {
        return Err(invalid("path must contain an owner and a repository"));
    }

    Ok(RemoteUrl {
        host: host.to_lowercase(),
        segments,
    })
}

/// Deterministic project name for a remote URL.
pub fn generate_project_name(url: &str) -> Result<String> {
    Ok(parse_remote_url(url)?.project_name())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equivalent_urls_collide() {
        let urls = [
            "git@github.com:acme/widgets.git",
            "git@github.com:Acme/Widgets",
            "https://github.com/acme/widgets",
            "https://github.com/acme/widgets.git",
            "https://user@GitHub.com/acme/widgets/",
            "ssh://git@github.com:22/acme/widgets.git",
            "git://github.com/acme/widgets.git",
        ];
        for url in urls {
            assert_eq!(
                generate_project_name(url).unwrap(),
                "github.com/acme/widgets",
                "url: {url}"
            );
        }
    }

    #[test]
    fn test_distinct_repos_differ() {
        let a = generate_project_name("git@github.com:acme/widgets.git").unwrap();
        let b = generate_project_name("git@github.com:acme/gadgets.git").unwrap();
        let c = generate_project_name("git@gitlab.com:acme/widgets.git").unwrap();
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_nested_groups() {
        let remote = parse_remote_url("https://gitlab.com/group/sub/project.git").unwrap();
        assert_eq!(remote.host, "gitlab.com");
        assert_eq!(remote.owner(), "group/sub");
        assert_eq!(remote.repo(), "project");
        assert_eq!(remote.project_name(), "gitlab.com/group/sub/project");
    }

    #[test]
    fn test_invalid_urls() {
        for url in [
            "",
            "not a url",
            "https://github.com/onlyone",
            "git@github.com:repo.git",
            "file:///tmp/repo.git",
            "@:acme/widgets",
        ] {
            assert!(
                matches!(
                    generate_project_name(url),
                    Err(Error::InvalidRemoteUrl { .. })
                ),
                "url: {url:?}"
            );
        }
    }
}
