use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Model used when neither the config file nor the CLI picks one.
pub const DEFAULT_MODEL: &str = "claude-3-haiku-20240307";
/// Hard cap on diffs embedded in the prompt.
pub const DEFAULT_MAX_FILES: usize = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("model API key not found: set ANTHROPIC_API_KEY or [review].api_key in .pr-reviewer.toml")]
    MissingApiKey,
}

/// Top-level configuration loaded from `.pr-reviewer.toml`.
/// Every field is optional; env vars fill the gaps so the tool works with
/// zero config beyond an API key.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub github: GitHubConfig,

    #[serde(default)]
    pub review: ReviewConfig,

    #[serde(default)]
    pub jira: JiraConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GitHubConfig {
    /// GitHub API token. Falls back to the GITHUB_TOKEN env var.
    /// Unauthenticated fetches work but hit GitHub's stricter anonymous quota.
    pub token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewConfig {
    /// Model API key. Falls back to the ANTHROPIC_API_KEY env var.
    pub api_key: Option<String>,
    /// Model identifier; unknown models get the default token limit.
    pub model: Option<String>,
    /// Maximum number of file diffs embedded in the prompt.
    pub max_files: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JiraConfig {
    /// Base URL of the Jira instance, e.g. https://acme.atlassian.net
    pub base_url: Option<String>,
    pub email: Option<String>,
    pub api_token: Option<String>,
    /// Ticket-detail fetching is opt-in; references are always extracted.
    pub enabled: Option<bool>,
}

impl Config {
    /// Load `.pr-reviewer.toml` from the current directory, then apply
    /// env-var overrides for anything the file leaves unset.
    pub fn load() -> Result<Config, ConfigError> {
        let path = Path::new(".pr-reviewer.toml");
        let mut config = if path.exists() {
            Self::load_from(path)?
        } else {
            Config::default()
        };
        config.apply_env();
        Ok(config)
    }

    /// Load from a specific path (useful for testing).
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    fn apply_env(&mut self) {
        if self.github.token.is_none() {
            self.github.token = std::env::var("GITHUB_TOKEN").ok();
        }
        if self.review.api_key.is_none() {
            self.review.api_key = std::env::var("ANTHROPIC_API_KEY").ok();
        }
        if self.jira.base_url.is_none() {
            self.jira.base_url = std::env::var("JIRA_BASE_URL").ok();
        }
        if self.jira.email.is_none() {
            self.jira.email = std::env::var("JIRA_EMAIL").ok();
        }
        if self.jira.api_token.is_none() {
            self.jira.api_token = std::env::var("JIRA_API_TOKEN").ok();
        }
    }

    pub fn github_token(&self) -> Option<&str> {
        self.github.token.as_deref()
    }

    pub fn api_key(&self) -> Result<&str, ConfigError> {
        self.review
            .api_key
            .as_deref()
            .ok_or(ConfigError::MissingApiKey)
    }

    pub fn model(&self) -> &str {
        self.review.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    pub fn max_files(&self) -> usize {
        self.review.max_files.unwrap_or(DEFAULT_MAX_FILES)
    }
}

impl JiraConfig {
    /// Detail fetching needs explicit enablement plus a full credential set.
    pub fn is_usable(&self) -> bool {
        self.enabled.unwrap_or(false)
            && self.base_url.is_some()
            && self.email.is_some()
            && self.api_token.is_some()
    }
}
