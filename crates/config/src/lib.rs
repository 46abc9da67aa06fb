//! Configuration loading, validation, and management for codewright.
//!
//! Loads configuration from `~/.codewright/config.toml` (or an explicit path)
//! with environment variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// The default instruction content of the system message.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an AI programming agent. You can use a variety of \
tools to work with code and files, look up information and carry out tasks. Always think step by \
step and use the available tools to complete the user's requests.";

/// The root configuration structure.
///
/// Maps directly to `config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden in `[llm]`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model endpoint settings
    #[serde(default)]
    pub llm: LlmConfig,

    /// Agent loop settings
    #[serde(default)]
    pub agent: AgentSettings,

    /// Per-tool settings, keyed by tool name
    #[serde(default)]
    pub tools: HashMap<String, ToolSettings>,

    /// Remote tool servers (MCP), keyed by server name
    #[serde(default)]
    pub mcp_servers: BTreeMap<String, McpServerConfig>,
}

/// Redact a secret for Debug output.
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
            .field("llm", &self.llm)
            .field("agent", &self.agent)
            .field("tools", &self.tools)
            .field("mcp_servers", &self.mcp_servers)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// "openai", "openrouter", "ollama" or "custom"
    #[serde(default = "default_provider")]
    pub provider: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Overrides the provider's default endpoint. Required for "custom".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// HTTP timeout for one model round-trip
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

fn default_provider() -> String {
    "openai".into()
}
fn default_model() -> String {
    "gpt-4o".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_llm_timeout() -> u64 {
    120
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: None,
            api_key: None,
            temperature: default_temperature(),
            max_tokens: None,
            timeout_secs: default_llm_timeout(),
        }
    }
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &redact(&self.api_key))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSettings {
    /// Maximum model round-trips per user turn
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Root directory local file tools are confined to
    #[serde(default = "default_workspace_root")]
    pub workspace_root: PathBuf,

    /// Content of the system message seeded into a new conversation
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Run the tool calls of one model reply concurrently
    #[serde(default)]
    pub parallel_tool_calls: bool,

    /// Upper bound for a single tool invocation
    #[serde(default = "default_tool_timeout")]
    pub tool_timeout_secs: u64,

    /// Upper bound for listing remote tools
    #[serde(default = "default_catalog_timeout")]
    pub catalog_timeout_secs: u64,
}

fn default_max_iterations() -> u32 {
    20
}
fn default_workspace_root() -> PathBuf {
    PathBuf::from(".")
}
fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.into()
}
fn default_tool_timeout() -> u64 {
    300
}
fn default_catalog_timeout() -> u64 {
    10
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            workspace_root: default_workspace_root(),
            system_prompt: default_system_prompt(),
            parallel_tool_calls: false,
            tool_timeout_secs: default_tool_timeout(),
            catalog_timeout_secs: default_catalog_timeout(),
        }
    }
}

/// Settings of one local tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Tool-specific settings (e.g. `max_timeout_secs`, `allowed_commands`)
    #[serde(flatten)]
    pub settings: HashMap<String, serde_json::Value>,
}

fn default_true() -> bool {
    true
}

impl ToolSettings {
    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.settings.get(key).and_then(|v| v.as_u64())
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.settings.get(key).and_then(|v| v.as_str())
    }

    pub fn get_string_list(&self, key: &str) -> Option<Vec<String>> {
        self.settings.get(key).and_then(|v| v.as_array()).map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().map(String::from))
                .collect()
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum McpTransport {
    #[default]
    Stdio,
    Http,
}

/// One remote tool server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpServerConfig {
    #[serde(default)]
    pub transport: McpTransport,

    /// Executable to spawn (stdio)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub env: HashMap<String, String>,

    /// Endpoint (http)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default = "default_mcp_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_mcp_timeout() -> u64 {
    30
}

impl AppConfig {
    /// Load configuration from `path`, or from `~/.codewright/config.toml`.
    ///
    /// Also checks environment variables:
    /// - `CODEWRIGHT_API_KEY`, `OPENAI_API_KEY`, `OPENROUTER_API_KEY` (in that order)
    /// - `CODEWRIGHT_PROVIDER`, `CODEWRIGHT_MODEL`
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::default_path);
        let mut config = Self::load_from(&path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path, without env overrides.
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

    /// Apply overrides from an environment-like lookup.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.api_key.is_none() {
            self.api_key = lookup("CODEWRIGHT_API_KEY")
                .or_else(|| lookup("OPENAI_API_KEY"))
                .or_else(|| lookup("OPENROUTER_API_KEY"));
        }

        if let Some(provider) = lookup("CODEWRIGHT_PROVIDER") {
            self.llm.provider = provider;
        }

        if let Some(model) = lookup("CODEWRIGHT_MODEL") {
            self.llm.model = model;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".codewright")
    }

    /// Default location of the config file.
    pub fn default_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::ValidationError(
                "llm.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.llm.provider == "custom" && self.llm.base_url.is_none() {
            return Err(ConfigError::ValidationError(
                "llm.base_url is required for the custom provider".into(),
            ));
        }

        if self.agent.max_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_iterations must be at least 1".into(),
            ));
        }

        for (name, server) in &self.mcp_servers {
            match server.transport {
                McpTransport::Stdio if server.command.is_none() => {
                    return Err(ConfigError::ValidationError(format!(
                        "mcp_servers.{name}: stdio transport requires 'command'"
                    )));
                }
                McpTransport::Http if server.url.is_none() => {
                    return Err(ConfigError::ValidationError(format!(
                        "mcp_servers.{name}: http transport requires 'url'"
                    )));
                }
                _ => {}
            }
        }

        Ok(())
    }

    /// The API key for the model endpoint (`[llm]` wins over top-level).
    pub fn effective_api_key(&self) -> Option<&str> {
        self.llm.api_key.as_deref().or(self.api_key.as_deref())
    }

    /// Whether a local tool is enabled. Tools without a section are enabled.
    pub fn is_tool_enabled(&self, name: &str) -> bool {
        self.tools.get(name).is_none_or(|t| t.enabled)
    }

    /// Settings of a local tool, if configured.
    pub fn tool_settings(&self, name: &str) -> Option<&ToolSettings> {
        self.tools.get(name)
    }

    /// Generate a default config TOML string (for `init`).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            llm: LlmConfig::default(),
            agent: AgentSettings::default(),
            tools: HashMap::new(),
            mcp_servers: BTreeMap::new(),
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
