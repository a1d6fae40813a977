//! Pull-request lookup
//!
//! Only GitHub (github.com or a configured Enterprise host) is supported.
//! [`GitHubClient`] talks to the REST API asynchronously; [`GitHubProvider`]
//! owns a current-thread runtime and exposes blocking calls for the CLI.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use serde::{Deserialize, Serialize};

use crate::config::GitHubConfig;
use crate::error::{Error, Result};
use crate::git::{parse_remote_url, RemoteUrl, Vcs};

/// An open pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    /// Head branch
    pub branch: String,
    /// Target branch
    pub base_branch: String,
    pub author: String,
    pub state: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub draft: bool,
    pub labels: Vec<String>,
}

impl PullRequest {
    /// One line for a finder or listing: `#12 Fix login (fix/login)`.
    pub fn display_line(&self) -> String {
        let draft = if self.draft { " [draft]" } else { "" };
        format!("#{} {}{} ({})", self.number, self.title, draft, self.branch)
    }
}

/// PR number from a [`PullRequest::display_line`] or a bare number.
pub fn parse_pr_number(selection: &str) -> Result<u64> {
    let token = selection
        .trim()
        .trim_start_matches('#')
        .split_whitespace()
        .next()
        .unwrap_or_default();
    token
        .parse()
        .map_err(|_| Error::InvalidInput(format!("not a pull request number: {selection}")))
}

// ============================================
// Wire format
// ============================================

#[derive(Debug, Deserialize)]
struct GhPull {
    number: u64,
    title: String,
    state: String,
    html_url: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    draft: bool,
    head: GhRef,
    base: GhRef,
    user: Option<GhUser>,
    #[serde(default)]
    labels: Vec<GhLabel>,
}

#[derive(Debug, Deserialize)]
struct GhRef {
    #[serde(rename = "ref")]
    name: String,
}

#[derive(Debug, Deserialize)]
struct GhUser {
    login: String,
}

#[derive(Debug, Deserialize)]
struct GhLabel {
    name: String,
}

#[derive(Debug, Deserialize)]
struct GhError {
    message: String,
}

impl From<GhPull> for PullRequest {
    fn from(pr: GhPull) -> Self {
        Self {
            number: pr.number,
            title: pr.title,
            branch: pr.head.name,
            base_branch: pr.base.name,
            author: pr.user.map(|u| u.login).unwrap_or_default(),
            state: pr.state.to_lowercase(),
            url: pr.html_url,
            created_at: pr.created_at,
            updated_at: pr.updated_at,
            draft: pr.draft,
            labels: pr.labels.into_iter().map(|l| l.name).collect(),
        }
    }
}

// ============================================
// Async client
// ============================================

/// HTTP client for the GitHub REST API
pub struct GitHubClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl GitHubClient {
    pub fn new(config: &GitHubConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert(USER_AGENT, HeaderValue::from_static("sesh"));
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );

        if let Some(token) = config.resolve_token() {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", token))
                    .map_err(|e| Error::Config(format!("invalid github token: {}", e)))?,
            );
        }

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }

    fn pulls_url(&self, repo: &RemoteUrl) -> String {
        format!(
            "{}/repos/{}/{}/pulls",
            self.base_url,
            urlencoding::encode(&repo.owner()),
            urlencoding::encode(repo.repo())
        )
    }

    /// Open pull requests, newest first (first page of 100).
    pub async fn list_open(&self, repo: &RemoteUrl) -> Result<Vec<PullRequest>> {
        let response = self
            .http_client
            .get(self.pulls_url(repo))
            .query(&[("state", "open"), ("per_page", "100")])
            .send()
            .await
            .map_err(|e| Error::Forge(format!("HTTP request failed: {}", e)))?;

        let pulls: Vec<GhPull> = Self::decode(response).await?;
        Ok(pulls.into_iter().map(PullRequest::from).collect())
    }

    /// A single pull request by number.
    pub async fn get(&self, repo: &RemoteUrl, number: u64) -> Result<PullRequest> {
        let url = format!("{}/{}", self.pulls_url(repo), number);
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Forge(format!("HTTP request failed: {}", e)))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::Forge(format!(
                "pull request #{} not found in {}/{}",
                number,
                repo.owner(),
                repo.repo()
            )));
        }
        let pull: GhPull = Self::decode(response).await?;
        Ok(pull.into())
    }

    async fn decode<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Forge(format!("failed to read response: {}", e)))?;

        if status.is_success() {
            return Ok(serde_json::from_str(&body)?);
        }

        let message = serde_json::from_str::<GhError>(&body)
            .map(|e| e.message)
            .unwrap_or(body);
        let hint = match status.as_u16() {
            401 | 403 => " (set GITHUB_TOKEN or github.token)",
            _ => "",
        };
        Err(Error::Forge(format!(
            "GitHub API returned {}: {}{}",
            status, message, hint
        )))
    }
}

// ============================================
// Blocking provider
// ============================================

/// Pull-request lookup for a repository on disk.
pub trait PullRequestProvider {
    fn name(&self) -> &'static str;

    /// Open pull requests of the repository at `repo`.
    fn list_open_prs(&self, repo: &Path) -> Result<Vec<PullRequest>>;

    /// Head branch of pull request `number`.
    fn pr_branch(&self, repo: &Path, number: u64) -> Result<String>;
}

/// GitHub provider with a blocking interface
pub struct GitHubProvider<V: Vcs> {
    vcs: V,
    host: String,
    client: GitHubClient,
    runtime: tokio::runtime::Runtime,
}

impl<V: Vcs> GitHubProvider<V> {
    pub fn new(vcs: V, config: &GitHubConfig) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| Error::Forge(format!("failed to create runtime: {}", e)))?;

        Ok(Self {
            vcs,
            host: config.host.to_lowercase(),
            client: GitHubClient::new(config)?,
            runtime,
        })
    }

    /// Owner and repository of `repo`'s origin, checked against the host.
    fn remote(&self, repo: &Path) -> Result<RemoteUrl> {
        let remote = parse_remote_url(&self.vcs.remote_url(repo)?)?;
        check_host(&remote, &self.host)?;
        Ok(remote)
    }
}

impl<V: Vcs> PullRequestProvider for GitHubProvider<V> {
    fn name(&self) -> &'static str {
        "github"
    }

    fn list_open_prs(&self, repo: &Path) -> Result<Vec<PullRequest>> {
        let remote = self.remote(repo)?;
        tracing::debug!(owner = %remote.owner(), repo = %remote.repo(), "Listing pull requests");
        self.runtime.block_on(self.client.list_open(&remote))
    }

    fn pr_branch(&self, repo: &Path, number: u64) -> Result<String> {
        let remote = self.remote(repo)?;
        let pull = self.runtime.block_on(self.client.get(&remote, number))?;
        tracing::info!(number, branch = %pull.branch, "Resolved pull request branch");
        Ok(pull.branch)
    }
}

fn check_host(remote: &RemoteUrl, github_host: &str) -> Result<()> {
    if remote.host == "github.com" || remote.host == github_host {
        Ok(())
    } else {
        Err(Error::Forge(format!(
            "unsupported forge host '{}' (only GitHub is supported)",
            remote.host
        )))
    }
}

/// Provider for the repository at `repo`, chosen from its origin host.
pub fn provider_for<V: Vcs>(vcs: V, repo: &Path, config: &GitHubConfig) -> Result<GitHubProvider<V>> {
    let remote = parse_remote_url(&vcs.remote_url(repo)?)?;
    check_host(&remote, &config.host.to_lowercase())?;
    GitHubProvider::new(vcs, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PULL_JSON: &str = r#"{
        "number": 42,
        "title": "Add login",
        "state": "open",
        "html_url": "https://github.com/acme/widgets/pull/42",
        "created_at": "2024-03-01T10:00:00Z",
        "updated_at": "2024-03-02T11:30:00Z",
        "draft": true,
        "head": {"ref": "feat/login", "sha": "abc"},
        "base": {"ref": "main", "sha": "def"},
        "user": {"login": "octocat", "id": 1},
        "labels": [{"name": "enhancement"}, {"name": "ui"}]
    }"#;

    #[test]
    fn test_pull_request_from_api() {
        let pull: GhPull = serde_json::from_str(PULL_JSON).unwrap();
        let pr = PullRequest::from(pull);
        assert_eq!(pr.number, 42);
        assert_eq!(pr.branch, "feat/login");
        assert_eq!(pr.base_branch, "main");
        assert_eq!(pr.author, "octocat");
        assert!(pr.draft);
        assert_eq!(pr.labels, vec!["enhancement", "ui"]);
        assert_eq!(pr.display_line(), "#42 Add login [draft] (feat/login)");
    }

    #[test]
    fn test_missing_optional_fields() {
        let json = r#"{
            "number": 7, "title": "t", "state": "OPEN", "html_url": "u",
            "created_at": "2024-03-01T10:00:00Z", "updated_at": "2024-03-01T10:00:00Z",
            "head": {"ref": "h"}, "base": {"ref": "b"}, "user": null
        }"#;
        let pr = PullRequest::from(serde_json::from_str::<GhPull>(json).unwrap());
        assert_eq!(pr.author, "");
        assert_eq!(pr.state, "open");
        assert!(!pr.draft);
        assert!(pr.labels.is_empty());
    }

    #[test]
    fn test_parse_pr_number() {
        assert_eq!(parse_pr_number("#42 Add login (feat/login)").unwrap(), 42);
        assert_eq!(parse_pr_number(" 7 ").unwrap(), 7);
        assert!(parse_pr_number("feat/login").is_err());
        assert!(parse_pr_number("").is_err());
    }

    #[test]
    fn test_host_check() {
        let github = parse_remote_url("git@github.com:acme/widgets.git").unwrap();
        let enterprise = parse_remote_url("https://git.corp.example/acme/widgets").unwrap();
        let gitlab = parse_remote_url("https://gitlab.com/group/sub/repo").unwrap();

        assert!(check_host(&github, "github.com").is_ok());
        assert!(check_host(&enterprise, "git.corp.example").is_ok());
        assert!(matches!(
            check_host(&gitlab, "github.com"),
            Err(Error::Forge(msg)) if msg.contains("gitlab.com")
        ));
    }

    #[test]
    fn test_pulls_url_encodes_segments() {
        let client = GitHubClient::new(&GitHubConfig {
            token: Some("t".to_string()),
            ..Default::default()
        })
        .unwrap();
        let remote = parse_remote_url("https://github.com/acme/widgets").unwrap();
        assert_eq!(
            client.pulls_url(&remote),
            "https://api.github.com/repos/acme/widgets/pulls"
        );
    }
}
