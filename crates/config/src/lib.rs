//! Configuration loading, validation, and management for Onager.
//!
//! Loads configuration from `~/.onager/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.onager/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the completion provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Completion provider: "openrouter", "openai", or "ollama"
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Model identifier passed to the provider
    #[serde(default = "default_model")]
    pub model: String,

    /// Override the provider base URL (for self-hosted endpoints)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Max tokens per completion response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Control-loop policy settings
    #[serde(rename = "loop", default)]
    pub loop_settings: LoopSettings,

    /// Memory backend configuration
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Per-capability enablement and settings
    #[serde(default)]
    pub capabilities: HashMap<String, CapabilityConfig>,
}

fn default_provider() -> String {
    "openrouter".into()
}
fn default_model() -> String {
    "anthropic/claude-sonnet-4".into()
}
fn default_max_tokens() -> u32 {
    4096
}
fn default_true() -> bool {
    true
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
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("max_tokens", &self.max_tokens)
            .field("loop_settings", &self.loop_settings)
            .field("memory", &self.memory)
            .field("capabilities", &self.capabilities)
            .finish()
    }
}

/// Policy constants for the control loop.
///
/// These ship with defaults matching the loop's documented behavior;
/// deployments tune them here rather than in code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopSettings {
    /// Consecutive-failure count that aborts a run
    #[serde(default = "default_error_streak_limit")]
    pub error_streak_limit: u32,

    /// Capability output is truncated to this many characters
    #[serde(default = "default_output_max_chars")]
    pub output_max_chars: usize,

    /// Conversation window shown to the chat responder
    #[serde(default = "default_chat_history_window")]
    pub chat_history_window: usize,

    /// Conversation window shown to the planner
    #[serde(default = "default_planner_history_window")]
    pub planner_history_window: usize,

    /// Execution-log window shown to the planner
    #[serde(default = "default_log_window")]
    pub log_window: usize,

    /// Memory recall count for chat responses
    #[serde(default = "default_chat_recall_k")]
    pub chat_recall_k: usize,

    /// Memory recall count for planning
    #[serde(default = "default_planner_recall_k")]
    pub planner_recall_k: usize,

    /// Sampling temperature for intent classification
    #[serde(default = "default_classifier_temperature")]
    pub classifier_temperature: f32,

    /// Sampling temperature for planning
    #[serde(default = "default_planner_temperature")]
    pub planner_temperature: f32,

    /// Sampling temperature for outcome critique
    #[serde(default = "default_critic_temperature")]
    pub critic_temperature: f32,

    /// Sampling temperature for conversational replies
    #[serde(default = "default_chat_temperature")]
    pub chat_temperature: f32,
}

fn default_error_streak_limit() -> u32 {
    5
}
fn default_output_max_chars() -> usize {
    500
}
fn default_chat_history_window() -> usize {
    10
}
fn default_planner_history_window() -> usize {
    6
}
fn default_log_window() -> usize {
    8
}
fn default_chat_recall_k() -> usize {
    5
}
fn default_planner_recall_k() -> usize {
    3
}
fn default_classifier_temperature() -> f32 {
    0.0
}
fn default_planner_temperature() -> f32 {
    0.1
}
fn default_critic_temperature() -> f32 {
    0.1
}
fn default_chat_temperature() -> f32 {
    0.7
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            error_streak_limit: default_error_streak_limit(),
            output_max_chars: default_output_max_chars(),
            chat_history_window: default_chat_history_window(),
            planner_history_window: default_planner_history_window(),
            log_window: default_log_window(),
            chat_recall_k: default_chat_recall_k(),
            planner_recall_k: default_planner_recall_k(),
            classifier_temperature: default_classifier_temperature(),
            planner_temperature: default_planner_temperature(),
            critic_temperature: default_critic_temperature(),
            chat_temperature: default_chat_temperature(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Backend: "in_memory" or "none"
    #[serde(default = "default_memory_backend")]
    pub backend: String,

    /// Store each exchange back into memory after a run
    #[serde(default = "default_true")]
    pub auto_save: bool,
}

fn default_memory_backend() -> String {
    "in_memory".into()
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            backend: default_memory_backend(),
            auto_save: true,
        }
    }
}

/// Per-capability enablement and settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Capability-specific settings (varies per capability)
    #[serde(flatten)]
    pub settings: HashMap<String, serde_json::Value>,
}

impl Default for CapabilityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            settings: HashMap::new(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.onager/config.toml).
    ///
    /// Also checks environment variables for API keys:
    /// - `ONAGER_API_KEY` (highest priority)
    /// - `OPENROUTER_API_KEY`
    /// - `OPENAI_API_KEY`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        // Environment variable overrides (highest priority)
        if config.api_key.is_none() {
            config.api_key = std::env::var("ONAGER_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENROUTER_API_KEY").ok())
                .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        }

        if let Ok(provider) = std::env::var("ONAGER_PROVIDER") {
            config.provider = provider;
        }

        if let Ok(model) = std::env::var("ONAGER_MODEL") {
            config.model = model;
        }

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

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".onager")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.loop_settings.error_streak_limit == 0 {
            return Err(ConfigError::ValidationError(
                "loop.error_streak_limit must be at least 1".into(),
            ));
        }

        if self.loop_settings.output_max_chars == 0 {
            return Err(ConfigError::ValidationError(
                "loop.output_max_chars must be at least 1".into(),
            ));
        }

        for (name, t) in [
            ("classifier", self.loop_settings.classifier_temperature),
            ("planner", self.loop_settings.planner_temperature),
            ("critic", self.loop_settings.critic_temperature),
            ("chat", self.loop_settings.chat_temperature),
        ] {
            if !(0.0..=2.0).contains(&t) {
                return Err(ConfigError::ValidationError(format!(
                    "loop.{name}_temperature must be between 0.0 and 2.0"
                )));
            }
        }

        match self.memory.backend.as_str() {
            "in_memory" | "none" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "unknown memory backend: {other}"
                )));
            }
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Whether the named capability is enabled for this deployment.
    pub fn capability_enabled(&self, name: &str) -> bool {
        self.capabilities.get(name).map_or(true, |c| c.enabled)
    }

    /// Generate a default config TOML string (for first-run onboarding).
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            provider: default_provider(),
            model: default_model(),
            base_url: None,
            max_tokens: default_max_tokens(),
            loop_settings: LoopSettings::default(),
            memory: MemoryConfig::default(),
            capabilities: HashMap::new(),
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.provider, "openrouter");
        assert_eq!(config.loop_settings.error_streak_limit, 5);
        assert_eq!(config.loop_settings.output_max_chars, 500);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.provider, config.provider);
        assert_eq!(
            parsed.loop_settings.error_streak_limit,
            config.loop_settings.error_streak_limit
        );
    }

    #[test]
    fn zero_streak_limit_rejected() {
        let mut config = AppConfig::default();
        config.loop_settings.error_streak_limit = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn invalid_temperature_rejected() {
        let mut config = AppConfig::default();
        config.loop_settings.chat_temperature = 5.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_memory_backend_rejected() {
        let mut config = AppConfig::default();
        config.memory.backend = "postgres".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_ok());
        assert_eq!(result.unwrap().provider, "openrouter");
    }

    #[test]
    fn loads_loop_table_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
model = "qwen2.5:7b"

[loop]
error_streak_limit = 3
output_max_chars = 200
"#
        )
        .unwrap();
        let config = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(config.model, "qwen2.5:7b");
        assert_eq!(config.loop_settings.error_streak_limit, 3);
        assert_eq!(config.loop_settings.output_max_chars, 200);
        // Unspecified fields keep their defaults.
        assert_eq!(config.loop_settings.log_window, 8);
    }

    #[test]
    fn capability_enablement_defaults_to_on() {
        let toml_str = r#"
[capabilities.shell]
enabled = false
timeout_secs = 10
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert!(!config.capability_enabled("shell"));
        assert!(config.capability_enabled("file_read"));
        assert_eq!(
            config.capabilities["shell"].settings["timeout_secs"],
            serde_json::json!(10)
        );
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = AppConfig {
            api_key: Some("sk-secret".into()),
            ..AppConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("openrouter"));
        assert!(toml_str.contains("error_streak_limit"));
    }
}
