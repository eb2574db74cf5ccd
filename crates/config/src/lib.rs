//! Configuration loading, validation, and management for repoloop.
//!
//! Loads configuration from `~/.repoloop/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.repoloop/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default LLM provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default temperature
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Default max tokens per LLM response
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Command loop settings
    #[serde(default)]
    pub agent: AgentConfig,

    /// Tool provider settings
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_provider() -> String {
    "openai".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_temperature() -> f32 {
    1.0
}
fn default_max_tokens() -> u32 {
    2048
}

fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("agent", &self.agent)
            .field("tools", &self.tools)
            .field("providers", &self.providers)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .finish()
    }
}

impl std::fmt::Debug for ToolsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolsConfig")
            .field("backend", &self.backend)
            .field("mcp_url", &self.mcp_url)
            .field("call_timeout_secs", &self.call_timeout_secs)
            .field("repos_dir", &self.repos_dir)
            .field("github_token", &redact(&self.github_token))
            .field("aliases", &self.aliases)
            .finish()
    }
}

/// Command loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum model calls per user turn before the turn is aborted
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Whether completions are streamed when a session starts
    #[serde(default = "default_true")]
    pub stream: bool,

    /// Replace the built-in system prompt entirely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt_override: Option<String>,
}

fn default_max_iterations() -> u32 {
    10
}
fn default_true() -> bool {
    true
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            stream: true,
            system_prompt_override: None,
        }
    }
}

/// Which tool provider backs the command loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolsBackend {
    /// Remote MCP server over SSE
    Mcp,
    /// In-process tools rooted at `repos_dir`
    Local,
}

impl std::str::FromStr for ToolsBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mcp" => Ok(Self::Mcp),
            "local" => Ok(Self::Local),
            other => Err(ConfigError::ValidationError(format!(
                "unknown tools backend '{other}' (expected 'mcp' or 'local')"
            ))),
        }
    }
}

/// Tool provider settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default = "default_tools_backend")]
    pub backend: ToolsBackend,

    /// SSE endpoint of the MCP server
    #[serde(default = "default_mcp_url")]
    pub mcp_url: String,

    /// Upper bound on a single tool call
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,

    /// Root directory of cloned repositories (local backend)
    #[serde(default = "default_repos_dir")]
    pub repos_dir: PathBuf,

    /// GitHub token for search and README lookups (local backend)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_token: Option<String>,

    /// Operation name → remote tool name, for servers that publish
    /// different names (e.g. `list_repos = "get_repo_list"`)
    #[serde(default)]
    pub aliases: HashMap<String, String>,
}

fn default_tools_backend() -> ToolsBackend {
    ToolsBackend::Mcp
}
fn default_mcp_url() -> String {
    "http://127.0.0.1:8080/sse".into()
}
fn default_call_timeout_secs() -> u64 {
    60
}
fn default_repos_dir() -> PathBuf {
    PathBuf::from("repos")
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            backend: default_tools_backend(),
            mcp_url: default_mcp_url(),
            call_timeout_secs: default_call_timeout_secs(),
            repos_dir: default_repos_dir(),
            github_token: None,
            aliases: HashMap::new(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.repoloop/config.toml).
    ///
    /// Environment variables take priority over the file:
    /// - `REPOLOOP_API_KEY`, then `OPENAI_API_KEY` (only if no key is configured)
    /// - `REPOLOOP_PROVIDER`, `REPOLOOP_MODEL`
    /// - `REPOLOOP_TOOLS_BACKEND`, `REPOLOOP_MCP_URL`
    /// - `GITHUB_TOKEN` (only if no token is configured)
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.api_key.is_none() {
            self.api_key = lookup("REPOLOOP_API_KEY").or_else(|| lookup("OPENAI_API_KEY"));
        }

        if let Some(provider) = lookup("REPOLOOP_PROVIDER") {
            self.default_provider = provider;
        }

        if let Some(model) = lookup("REPOLOOP_MODEL") {
            self.default_model = model;
        }

        if let Some(backend) = lookup("REPOLOOP_TOOLS_BACKEND") {
            self.tools.backend = backend.parse()?;
        }

        if let Some(url) = lookup("REPOLOOP_MCP_URL") {
            self.tools.mcp_url = url;
        }

        if self.tools.github_token.is_none() {
            self.tools.github_token = lookup("GITHUB_TOKEN");
        }

        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".repoloop")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.default_temperature < 0.0 || self.default_temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.agent.max_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_iterations must be at least 1".into(),
            ));
        }

        if self.tools.call_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "tools.call_timeout_secs must be at least 1".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            agent: AgentConfig::default(),
            tools: ToolsConfig::default(),
            providers: HashMap::new(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
