//! Configuration types and structures.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default port for the HTTP API.
pub const DEFAULT_PORT: u16 = 8501;

/// Service configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub assistant: AssistantConfig,

    #[serde(default)]
    pub chat: ChatConfig,
}

impl Config {
    /// Load configuration from a single YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        // Empty or comment-only files parse as null
        let config: Option<Config> = serde_yaml::from_str(&content)?;
        Ok(config.unwrap_or_default())
    }

    /// Ensure the database directory exists.
    pub fn ensure_db_dir(&self) -> Result<()> {
        if let Some(parent) = self.server.db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

/// Server-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Interface the HTTP API binds to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port for the HTTP API.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Lifetime of a login session, counted from login.
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            host: default_host(),
            port: default_port(),
            session_ttl_secs: default_session_ttl_secs(),
        }
    }
}

impl ServerConfig {
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("taskflow/taskflow.db")
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_session_ttl_secs() -> u64 {
    12 * 60 * 60
}

/// Reasoning-service (chat completions) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    /// Base URL of an OpenAI-compatible API.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// API key. Prefer `api_key_env` over writing keys into config files.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Environment variable read when `api_key` is unset.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Overrides for operation descriptions offered to the model, by operation name.
    #[serde(default)]
    pub tool_descriptions: HashMap<String, String>,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            model: default_model(),
            api_key: None,
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
            system_prompt: default_system_prompt(),
            tool_descriptions: HashMap::new(),
        }
    }
}

impl AssistantConfig {
    /// Resolve the API key from config or environment.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var(&self.api_key_env).ok())
            .filter(|k| !k.trim().is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    pub fn get_tool_description(&self, name: &str) -> Option<&str> {
        self.tool_descriptions.get(name).map(String::as_str)
    }
}

fn default_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_system_prompt() -> String {
    "You are TaskFlow, a helpful assistant that manages the user's personal tasks. \
     Use the available functions to read, add, update or delete tasks when the user asks. \
     Refer to tasks by their titles and keep answers short."
        .to_string()
}

/// Local chat command configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Tags attached to tasks created with `add task ...`.
    #[serde(default = "default_chat_tags")]
    pub default_tags: Vec<String>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            default_tags: default_chat_tags(),
        }
    }
}

fn default_chat_tags() -> Vec<String> {
    vec!["chatbot".to_string()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert_eq!(config.server.session_ttl(), Duration::from_secs(43_200));
        assert_eq!(config.assistant.timeout_secs, 30);
        assert_eq!(config.assistant.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.chat.default_tags, vec!["chatbot"]);
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config: Config = serde_yaml::from_str("assistant:\n  model: gpt-4o-mini\n").unwrap();
        assert_eq!(config.assistant.model, "gpt-4o-mini");
        assert_eq!(config.assistant.api_base, "https://api.openai.com/v1");
        assert_eq!(config.server.host, "127.0.0.1");
    }

    #[test]
    fn explicit_api_key_wins() {
        let assistant = AssistantConfig {
            api_key: Some("sk-test".to_string()),
            api_key_env: "TASKFLOW_TEST_UNSET_KEY_VAR".to_string(),
            ..Default::default()
        };
        assert_eq!(assistant.resolve_api_key().as_deref(), Some("sk-test"));

        let blank = AssistantConfig {
            api_key: Some("  ".to_string()),
            api_key_env: "TASKFLOW_TEST_UNSET_KEY_VAR".to_string(),
            ..Default::default()
        };
        assert_eq!(blank.resolve_api_key(), None);
    }

    #[test]
    fn timeout_is_at_least_one_second() {
        let assistant = AssistantConfig {
            timeout_secs: 0,
            ..Default::default()
        };
        assert_eq!(assistant.timeout(), Duration::from_secs(1));
    }
}
