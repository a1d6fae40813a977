//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/sesh/config.toml`, then overridden
//! by `SESH_WORKSPACE`, `SESH_SESSION_BACKEND` and `SESH_FUZZY_FINDER`.
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/sesh/` (~/.config/sesh/)
//! - Data: `$XDG_DATA_HOME/sesh/` (~/.local/share/sesh/)
//! - State/Logs: `$XDG_STATE_HOME/sesh/` (~/.local/state/sesh/)
//!
//! Projects and branches can carry a `.sesh.toml` with a `startup_command`
//! that overrides the global one.

use crate::backend::BackendKind;
use crate::error::{Error, Result};
use crate::naming::expand_home;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name of per-project and per-branch overrides
pub const PROJECT_CONFIG_FILE: &str = ".sesh.toml";

/// Returns a best-effort home directory path.
pub(crate) fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    /// Root directory holding bare repositories and worktrees
    #[serde(default = "default_workspace_dir")]
    pub workspace_dir: PathBuf,

    /// Session backend key (`auto`, `tmux`, `zellij`, `none`, `code:open`, ...)
    #[serde(default = "default_session_backend")]
    pub session_backend: String,

    /// Fuzzy finder (`auto`, `fzf`, `peco`)
    #[serde(default = "default_fuzzy_finder")]
    pub fuzzy_finder: String,

    /// Command run inside newly created sessions
    #[serde(default)]
    pub startup_command: Option<String>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Session history configuration
    #[serde(default)]
    pub history: HistoryConfig,

    /// GitHub pull-request lookup
    #[serde(default)]
    pub github: GitHubConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workspace_dir: default_workspace_dir(),
            session_backend: default_session_backend(),
            fuzzy_finder: default_fuzzy_finder(),
            startup_command: None,
            logging: LoggingConfig::default(),
            history: HistoryConfig::default(),
            github: GitHubConfig::default(),
        }
    }
}

fn default_workspace_dir() -> PathBuf {
    home_dir().join(".sesh")
}

fn default_session_backend() -> String {
    "auto".to_string()
}

fn default_fuzzy_finder() -> String {
    "auto".to_string()
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Session history configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HistoryConfig {
    /// Entries older than this many days are pruned (0 keeps everything)
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            retention_days: default_retention_days(),
        }
    }
}

fn default_retention_days() -> u32 {
    90
}

/// GitHub configuration for pull-request lookups
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GitHubConfig {
    /// API token (falls back to GITHUB_TOKEN / GH_TOKEN)
    #[serde(default, skip_serializing)]
    pub token: Option<String>,

    /// REST API base URL
    #[serde(default = "default_github_api_url")]
    pub api_url: String,

    /// Remote host that identifies GitHub-hosted projects
    #[serde(default = "default_github_host")]
    pub host: String,

    /// HTTP request timeout in seconds
    #[serde(default = "default_github_timeout")]
    pub timeout_secs: u64,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_url: default_github_api_url(),
            host: default_github_host(),
            timeout_secs: default_github_timeout(),
        }
    }
}

impl GitHubConfig {
    /// Token from config, then `GITHUB_TOKEN`, then `GH_TOKEN`.
    pub fn resolve_token(&self) -> Option<String> {
        self.token
            .clone()
            .or_else(|| std::env::var("GITHUB_TOKEN").ok())
            .or_else(|| std::env::var("GH_TOKEN").ok())
            .filter(|t| !t.trim().is_empty())
    }
}

fn default_github_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_github_host() -> String {
    "github.com".to_string()
}

fn default_github_timeout() -> u64 {
    15
}

/// Per-project or per-branch overrides read from `.sesh.toml`
#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct ProjectConfig {
    /// Command run inside newly created sessions for this project/branch
    #[serde(default)]
    pub startup_command: Option<String>,
}

impl ProjectConfig {
    /// Load `.sesh.toml` from `dir`, returning `None` when the file is absent.
    pub fn load(dir: &Path) -> Result<Option<Self>> {
        let path = dir.join(PROJECT_CONFIG_FILE);
        if !path.is_file() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)
            .map_err(|e| Error::Config(format!("failed to read {}: {}", path.display(), e)))?;
        let config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse {}: {}", path.display(), e)))?;
        Ok(Some(config))
    }
}

impl Config {
    /// Load configuration from the default path and apply env overrides
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        let mut config = if config_path.exists() {
            Self::load_from(&config_path)?
        } else {
            tracing::debug!("No config file found at {:?}, using defaults", config_path);
            Config::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.workspace_dir = expand_home(&config.workspace_dir);
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Apply `SESH_*` overrides using `lookup` to read variables.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(dir) = non_empty("SESH_WORKSPACE") {
            self.workspace_dir = PathBuf::from(dir);
        }
        if let Some(backend) = non_empty("SESH_SESSION_BACKEND") {
            self.session_backend = backend;
        }
        if let Some(finder) = non_empty("SESH_FUZZY_FINDER") {
            self.fuzzy_finder = finder;
        }
    }

    /// Validate values that can't be checked by deserialization alone
    pub fn validate(&self) -> Result<()> {
        BackendKind::parse(&self.session_backend)?;

        if !matches!(self.fuzzy_finder.as_str(), "auto" | "fzf" | "peco") {
            return Err(Error::Config(format!(
                "fuzzy_finder must be one of auto, fzf, peco (got '{}')",
                self.fuzzy_finder
            )));
        }
        if self.workspace_dir.as_os_str().is_empty() {
            return Err(Error::Config("workspace_dir must not be empty".to_string()));
        }
        if self.github.timeout_secs == 0 {
            return Err(Error::Config(
                "github.timeout_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolve the startup command for a new session.
    ///
    /// Branch `.sesh.toml` (inside the worktree) wins over the project's
    /// `.sesh.toml` (in the project directory), which wins over the global value.
    pub fn resolve_startup_command(
        &self,
        project_dir: &Path,
        worktree_dir: &Path,
    ) -> Result<Option<String>> {
        for dir in [worktree_dir, project_dir] {
            if let Some(cmd) = ProjectConfig::load(dir)?.and_then(|c| c.startup_command) {
                return Ok(Some(cmd));
            }
        }
        Ok(self.startup_command.clone())
    }

    /// Render the effective configuration as TOML (token omitted)
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("failed to render config: {}", e)))
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/sesh/config.toml` (~/.config/sesh/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("sesh").join("config.toml")
    }

    /// Returns the data directory path (for the history database)
    ///
    /// `$XDG_DATA_HOME/sesh/` (~/.local/share/sesh/)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("sesh")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/sesh/` (~/.local/state/sesh/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("sesh")
    }

    /// Returns the history database path
    ///
    /// `$XDG_DATA_HOME/sesh/history.db`
    pub fn database_path() -> PathBuf {
        Self::data_dir().join("history.db")
    }

    /// Returns the log file path
    ///
    /// `$XDG_STATE_HOME/sesh/sesh.log`
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("sesh.log")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.session_backend, "auto");
        assert_eq!(config.fuzzy_finder, "auto");
        assert!(config.workspace_dir.ends_with(".sesh"));
        assert_eq!(config.history.retention_days, 90);
        assert_eq!(config.github.api_url, "https://api.github.com");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
workspace_dir = "/work"
session_backend = "zellij"
fuzzy_finder = "peco"
startup_command = "nvim ."

[logging]
level = "debug"

[history]
retention_days = 7

[github]
host = "github.example.com"
api_url = "https://github.example.com/api/v3"
"#;
        let config: Config = toml::from_str(toml).unwrap();

        assert_eq!(config.workspace_dir, PathBuf::from("/work"));
        assert_eq!(config.session_backend, "zellij");
        assert_eq!(config.fuzzy_finder, "peco");
        assert_eq!(config.startup_command.as_deref(), Some("nvim ."));
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.history.retention_days, 7);
        assert_eq!(config.github.host, "github.example.com");
        assert_eq!(config.github.timeout_secs, 15);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("SESH_WORKSPACE", "/tmp/ws"),
            ("SESH_SESSION_BACKEND", "none"),
            ("SESH_FUZZY_FINDER", ""),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.workspace_dir, PathBuf::from("/tmp/ws"));
        assert_eq!(config.session_backend, "none");
        // Empty values don't override
        assert_eq!(config.fuzzy_finder, "auto");
    }

    #[test]
    fn test_validate_rejects_unknown_values() {
        let config = Config {
            session_backend: "screen".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let config = Config {
            fuzzy_finder: "skim".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let config = Config {
            session_backend: "code:workspace".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_startup_command_precedence() {
        let temp = TempDir::new().unwrap();
        let project_dir = temp.path().join("project");
        let worktree_dir = project_dir.join("feature");
        std::fs::create_dir_all(&worktree_dir).unwrap();

        let config = Config {
            startup_command: Some("global".to_string()),
            ..Default::default()
        };

        assert_eq!(
            config
                .resolve_startup_command(&project_dir, &worktree_dir)
                .unwrap()
                .as_deref(),
            Some("global")
        );

        std::fs::write(
            project_dir.join(PROJECT_CONFIG_FILE),
            "startup_command = \"project\"\n",
        )
        .unwrap();
        assert_eq!(
            config
                .resolve_startup_command(&project_dir, &worktree_dir)
                .unwrap()
                .as_deref(),
            Some("project")
        );

        std::fs::write(
            worktree_dir.join(PROJECT_CONFIG_FILE),
            "startup_command = \"branch\"\n",
        )
        .unwrap();
        assert_eq!(
            config
                .resolve_startup_command(&project_dir, &worktree_dir)
                .unwrap()
                .as_deref(),
            Some("branch")
        );
    }

    #[test]
    fn test_rendered_config_omits_token() {
        let mut config = Config::default();
        config.github.token = Some("ghp_secret".to_string());
        let rendered = config.to_toml().unwrap();
        assert!(rendered.contains("session_backend"));
        assert!(!rendered.contains("ghp_secret"));
    }
}
