//! Configuration loader with tier-based merging.
//!
//! Loads configuration from multiple tiers and merges them field-by-field.

use super::types::Config;
use anyhow::Result;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Configuration tier priority (lowest to highest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigTier {
    /// Built-in defaults (lowest priority)
    Defaults = 0,
    /// Project-level config ($CWD/taskflow/)
    Project = 1,
    /// User-level config (~/.taskflow/)
    User = 2,
    /// Environment variables (highest priority)
    Environment = 3,
}

impl std::fmt::Display for ConfigTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigTier::Defaults => write!(f, "defaults"),
            ConfigTier::Project => write!(f, "project"),
            ConfigTier::User => write!(f, "user"),
            ConfigTier::Environment => write!(f, "environment"),
        }
    }
}

/// Paths for each configuration tier.
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    /// Project-level config directory
    pub project_dir: Option<PathBuf>,
    /// User-level config directory
    pub user_dir: Option<PathBuf>,
}

impl Default for ConfigPaths {
    fn default() -> Self {
        Self::discover()
    }
}

impl ConfigPaths {
    /// Discover configuration paths from environment and defaults.
    pub fn discover() -> Self {
        // User dir: TASKFLOW_USER_DIR or ~/.taskflow
        let user_dir = std::env::var("TASKFLOW_USER_DIR")
            .ok()
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|h| h.join(".taskflow")));

        // Project dir: TASKFLOW_PROJECT_DIR or $CWD/taskflow
        let project_dir = std::env::var("TASKFLOW_PROJECT_DIR")
            .ok()
            .map(PathBuf::from)
            .or_else(|| Some(PathBuf::from("taskflow")));

        Self {
            project_dir,
            user_dir,
        }
    }

    /// Create paths with explicit directories.
    pub fn with_dirs(project_dir: Option<PathBuf>, user_dir: Option<PathBuf>) -> Self {
        Self {
            project_dir,
            user_dir,
        }
    }

    /// Config file of a tier, if that tier has a directory.
    pub fn config_file(&self, tier: ConfigTier) -> Option<PathBuf> {
        match tier {
            ConfigTier::Project => self.project_dir.as_ref().map(|d| d.join("config.yaml")),
            ConfigTier::User => self.user_dir.as_ref().map(|d| d.join("config.yaml")),
            ConfigTier::Defaults | ConfigTier::Environment => None,
        }
    }
}

/// Read one tier's YAML file. Missing files are skipped; broken ones are skipped with a warning.
fn read_tier(path: &Path, tier: ConfigTier) -> Option<Value> {
    if !path.exists() {
        return None;
    }
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!(path = %path.display(), tier = %tier, error = %e, "Failed to read config file");
            return None;
        }
    };
    match serde_yaml::from_str::<Value>(&content) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(path = %path.display(), tier = %tier, error = %e, "Ignoring invalid config file");
            None
        }
    }
}

/// Lay one tier over the merged result so far.
///
/// Sections merge key by key; any other value, lists included, replaces what
/// was there. Nulls in a tier leave the lower tier's value in place.
fn apply_layer(target: &mut Value, layer: Value) {
    match layer {
        Value::Null => {}
        Value::Object(layer) if target.is_object() => {
            let Some(sections) = target.as_object_mut() else {
                return;
            };
            for (key, value) in layer {
                match sections.get_mut(&key) {
                    Some(existing) => apply_layer(existing, value),
                    None if value.is_null() => {}
                    None => {
                        sections.insert(key, value);
                    }
                }
            }
        }
        layer => *target = layer,
    }
}

/// Configuration loader that handles tier-based merging.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Paths for each tier
    pub paths: ConfigPaths,
    /// Loaded configuration
    config: Config,
    /// Highest-priority config file that contributed (if any)
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Load configuration from all tiers with proper merging.
    pub fn load() -> Result<Self> {
        Self::load_with_paths(ConfigPaths::discover())
    }

    /// Load configuration with explicit paths.
    pub fn load_with_paths(paths: ConfigPaths) -> Result<Self> {
        // Explicit config path overrides every file tier
        if let Ok(explicit_path) = std::env::var("TASKFLOW_CONFIG_PATH") {
            let path = PathBuf::from(&explicit_path);
            let mut config = Config::load(&path)?;
            Self::apply_env_overrides(&mut config);
            return Ok(Self {
                paths,
                config,
                config_path: Some(path),
            });
        }

        let mut config_path = None;

        // Tier 1: Defaults
        let mut merged = serde_json::to_value(Config::default())?;

        // Tiers 2-3: Project, then user
        for tier in [ConfigTier::Project, ConfigTier::User] {
            if let Some(file) = paths.config_file(tier)
                && let Some(layer) = read_tier(&file, tier)
            {
                apply_layer(&mut merged, layer);
                config_path = Some(file);
            }
        }

        let mut config: Config = serde_json::from_value(merged)?;

        // Tier 4: Environment variable overrides
        Self::apply_env_overrides(&mut config);

        Ok(Self {
            paths,
            config,
            config_path,
        })
    }

    /// Apply environment variable overrides to config.
    fn apply_env_overrides(config: &mut Config) {
        if let Ok(db_path) = std::env::var("TASKFLOW_DB_PATH") {
            config.server.db_path = PathBuf::from(db_path);
        }

        if let Ok(host) = std::env::var("TASKFLOW_HOST") {
            config.server.host = host;
        }

        if let Ok(port) = std::env::var("TASKFLOW_PORT") {
            match port.parse() {
                Ok(port) => config.server.port = port,
                Err(_) => warn!(value = %port, "Ignoring invalid TASKFLOW_PORT"),
            }
        }

        if let Ok(model) = std::env::var("TASKFLOW_MODEL") {
            config.assistant.model = model;
        }
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get mutable access to the configuration.
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Consume the loader and return the configuration.
    pub fn into_config(self) -> Config {
        self.config
    }

    /// Get the config file path that was used.
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn layer_merges_sections_and_replaces_lists() {
        let mut merged = json!({
            "server": {"host": "127.0.0.1", "port": 8501},
            "chat": {"default_tags": ["chatbot", "inbox"]}
        });
        apply_layer(
            &mut merged,
            json!({"server": {"port": 9000}, "chat": {"default_tags": ["assistant"]}}),
        );
        assert_eq!(
            merged,
            json!({
                "server": {"host": "127.0.0.1", "port": 9000},
                "chat": {"default_tags": ["assistant"]}
            })
        );
    }

    #[test]
    fn null_in_layer_keeps_lower_tier() {
        let mut merged = json!({"assistant": {"api_key": "sk-project", "model": "m"}});
        apply_layer(&mut merged, json!({"assistant": {"api_key": null, "extra": null}}));
        assert_eq!(merged, json!({"assistant": {"api_key": "sk-project", "model": "m"}}));

        // An empty YAML file parses as null
        apply_layer(&mut merged, Value::Null);
        assert_eq!(merged["assistant"]["model"], "m");
    }

    #[test]
    fn test_config_paths_discover() {
        let paths = ConfigPaths::discover();
        assert!(paths.project_dir.is_some());
    }

    #[test]
    fn test_load_defaults_only() {
        let temp = TempDir::new().unwrap();
        let paths = ConfigPaths::with_dirs(
            Some(temp.path().join("project")),
            Some(temp.path().join("user")),
        );

        let loader = ConfigLoader::load_with_paths(paths).unwrap();
        let config = loader.config();

        assert_eq!(config.assistant.timeout_secs, 30);
        assert_eq!(config.chat.default_tags, vec!["chatbot"]);
        assert!(loader.config_path().is_none());
    }

    #[test]
    fn test_project_config_overrides_defaults() {
        let temp = TempDir::new().unwrap();
        let project_dir = temp.path().join("taskflow");
        std::fs::create_dir_all(&project_dir).unwrap();

        let config_content = r#"
assistant:
  timeout_secs: 10
"#;
        std::fs::write(project_dir.join("config.yaml"), config_content).unwrap();

        let paths = ConfigPaths::with_dirs(Some(project_dir), Some(temp.path().join("user")));

        let loader = ConfigLoader::load_with_paths(paths).unwrap();
        let config = loader.config();

        assert_eq!(config.assistant.timeout_secs, 10);
        // Untouched fields keep their defaults
        assert_eq!(config.assistant.api_key_env, "OPENAI_API_KEY");
    }

    #[test]
    fn test_user_config_overrides_project() {
        let temp = TempDir::new().unwrap();
        let project_dir = temp.path().join("taskflow");
        let user_dir = temp.path().join("user");
        std::fs::create_dir_all(&project_dir).unwrap();
        std::fs::create_dir_all(&user_dir).unwrap();

        let project_config = r#"
assistant:
  model: project-model
  timeout_secs: 45
"#;
        std::fs::write(project_dir.join("config.yaml"), project_config).unwrap();

        let user_config = r#"
assistant:
  model: user-model
"#;
        std::fs::write(user_dir.join("config.yaml"), user_config).unwrap();

        let paths = ConfigPaths::with_dirs(Some(project_dir), Some(user_dir.clone()));

        let loader = ConfigLoader::load_with_paths(paths).unwrap();
        let config = loader.config();

        assert_eq!(config.assistant.model, "user-model");
        assert_eq!(config.assistant.timeout_secs, 45);
        assert_eq!(loader.config_path(), Some(user_dir.join("config.yaml").as_path()));
    }

    #[test]
    fn test_invalid_yaml_is_skipped() {
        let temp = TempDir::new().unwrap();
        let project_dir = temp.path().join("taskflow");
        std::fs::create_dir_all(&project_dir).unwrap();
        std::fs::write(project_dir.join("config.yaml"), "server: [unclosed").unwrap();

        let paths = ConfigPaths::with_dirs(Some(project_dir), None);
        let loader = ConfigLoader::load_with_paths(paths).unwrap();
        assert_eq!(loader.config().server.host, "127.0.0.1");
    }
}
