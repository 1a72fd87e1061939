use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, ServeError};
use crate::providers::types::Role;

pub mod models;

pub use models::ModelIdentifier;

const CONFIG_FILE_NAME: &str = "chainserve.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub routing: RoutingConfig,
    #[serde(default = "default_routes")]
    pub routes: Vec<RouteConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_file_enabled")]
    pub log_file_enabled: bool,
    #[serde(default = "default_log_rotation")]
    pub log_rotation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<String>,
    #[serde(default = "default_log_file_prefix")]
    pub log_file_prefix: String,
    /// How rendered prompts and model outputs are logged: off, truncated or full
    #[serde(default = "default_payload_log")]
    pub payload_log: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            log_file_enabled: default_log_file_enabled(),
            log_rotation: default_log_rotation(),
            log_dir: None,
            log_file_prefix: default_log_file_prefix(),
            payload_log: default_payload_log(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub ollama: OllamaConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    #[serde(default = "default_openai_endpoint")]
    pub endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_openai_timeout")]
    pub timeout_secs: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            endpoint: default_openai_endpoint(),
            api_key: None,
            timeout_secs: default_openai_timeout(),
            temperature: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    #[serde(default = "default_ollama_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_ollama_timeout")]
    pub timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            endpoint: default_ollama_endpoint(),
            timeout_secs: default_ollama_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Model used by routes that do not name one
    #[serde(default = "default_model")]
    pub default_model: String,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            default_model: default_model(),
        }
    }
}

/// One served prompt: either a single `template` string or a list of `messages`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteConfig {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<MessageConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageConfig {
    pub role: Role,
    pub content: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file_enabled() -> bool {
    true
}

fn default_log_rotation() -> String {
    "daily".to_string()
}

fn default_log_file_prefix() -> String {
    "chainserve".to_string()
}

fn default_payload_log() -> String {
    "off".to_string()
}

fn default_openai_endpoint() -> String {
    "https://api.openai.com".to_string()
}

fn default_openai_timeout() -> u64 {
    60
}

fn default_ollama_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_timeout() -> u64 {
    120
}

fn default_model() -> String {
    "openai".to_string()
}

fn default_routes() -> Vec<RouteConfig> {
    vec![
        RouteConfig {
            path: "essay".to_string(),
            model: Some("openai".to_string()),
            template: Some("Explain the concept {topic} with 5 bullet points only ".to_string()),
            messages: Vec::new(),
        },
        RouteConfig {
            path: "poem".to_string(),
            model: Some("llama2".to_string()),
            template: Some("Write me an essay about {topic} using 500 words.".to_string()),
            messages: Vec::new(),
        },
        RouteConfig {
            path: "assistant".to_string(),
            model: None,
            template: None,
            messages: vec![
                MessageConfig {
                    role: Role::System,
                    content: "You are a helpful assistant, that knows a lot about programming languages. You would give concise answers for queries and write optimised code snippets.".to_string(),
                },
                MessageConfig {
                    role: Role::User,
                    content: "{user_input}".to_string(),
                },
            ],
        },
    ]
}

impl Config {
    /// Load `chainserve.toml` from the user config directory, overlaid with
    /// `CHAINSERVE_*` environment variables
    pub fn load() -> Result<Self> {
        let config_file = get_config_dir()?.join(CONFIG_FILE_NAME);
        Self::load_from(&config_file)
    }

    /// Load from an explicit file; a missing file yields the defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config: Config = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("CHAINSERVE_").split("__"))
            .extract()?;

        config.apply_env_fallbacks();
        Ok(config)
    }

    fn apply_env_fallbacks(&mut self) {
        let has_key = self
            .providers
            .openai
            .api_key
            .as_deref()
            .is_some_and(|key| !key.trim().is_empty());

        if !has_key && let Ok(api_key) = std::env::var("OPENAI_API_KEY") {
            tracing::debug!("OpenAI → API key via OPENAI_API_KEY");
            self.providers.openai.api_key = Some(api_key);
        }
    }

    pub fn config_dir() -> Result<PathBuf> {
        get_config_dir()
    }

    pub fn config_file() -> Result<PathBuf> {
        Ok(get_config_dir()?.join(CONFIG_FILE_NAME))
    }

    pub fn data_dir() -> Result<PathBuf> {
        get_data_dir()
    }

    pub fn log_dir(&self) -> Result<PathBuf> {
        if let Some(log_dir) = &self.server.log_dir {
            let path = PathBuf::from(log_dir);
            std::fs::create_dir_all(&path)?;
            Ok(path)
        } else {
            let log_dir = Self::data_dir()?.join("logs");
            std::fs::create_dir_all(&log_dir)?;
            Ok(log_dir)
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| ServeError::Other(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, toml_string)?;
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            providers: ProvidersConfig::default(),
            routing: RoutingConfig::default(),
            routes: default_routes(),
        }
    }
}

fn get_config_dir() -> Result<PathBuf> {
    let project_dirs = ProjectDirs::from("", "", "chainserve").ok_or_else(|| {
        ServeError::Config(figment::Error::from(
            "Could not determine config directory".to_string(),
        ))
    })?;

    let config_dir = project_dirs.config_dir();
    std::fs::create_dir_all(config_dir)?;

    Ok(config_dir.to_path_buf())
}

fn get_data_dir() -> Result<PathBuf> {
    let project_dirs = ProjectDirs::from("", "", "chainserve").ok_or_else(|| {
        ServeError::Config(figment::Error::from(
            "Could not determine data directory".to_string(),
        ))
    })?;

    let data_dir = project_dirs.data_dir();
    std::fs::create_dir_all(data_dir)?;

    Ok(data_dir.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_routes_match_served_prompts() {
        let config = Config::default();
        let paths: Vec<&str> = config.routes.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, vec!["essay", "poem", "assistant"]);
        assert_eq!(config.routes[1].model.as_deref(), Some("llama2"));
        assert!(config.routes[2].template.is_none());
        assert_eq!(config.routes[2].messages.len(), 2);
    }

    #[test]
    fn test_env_fallback_keeps_configured_key() {
        let mut config = Config::default();
        config.providers.openai.api_key = Some("sk-configured".to_string());
        config.apply_env_fallbacks();
        assert_eq!(
            config.providers.openai.api_key.as_deref(),
            Some("sk-configured")
        );
    }
}
