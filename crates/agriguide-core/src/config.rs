//! Configuration types for the AgriGuide backend

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::{Error, Result};

/// Environment variable prefix for layered configuration (`AGRIGUIDE__SERVER__PORT`)
pub const ENV_PREFIX: &str = "AGRIGUIDE";

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub genai: GenAiConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub auth: AuthConfig,
}

impl AppConfig {
    /// Load configuration from an optional TOML file plus `AGRIGUIDE__*` environment variables.
    ///
    /// The API key falls back to `GEMINI_API_KEY` when not set through either source.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        match path {
            Some(path) => {
                info!("Loading configuration from {:?}", path);
                builder = builder.add_source(config::File::from(path).required(true));
            }
            None => {
                builder = builder.add_source(config::File::with_name("agriguide").required(false));
            }
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let mut config: AppConfig = builder.build()?.try_deserialize()?;

        if config.genai.api_key.is_empty() {
            if let Ok(key) = std::env::var("GEMINI_API_KEY") {
                config.genai.api_key = key;
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the server cannot start with
    pub fn validate(&self) -> Result<()> {
        if self.genai.api_key.trim().is_empty() {
            return Err(Error::ConfigError(
                "GEMINI_API_KEY not found in configuration or environment".to_string(),
            ));
        }
        if self.storage.backend == StoreBackend::Redis && self.storage.redis_url.is_empty() {
            return Err(Error::ConfigError(
                "redis store selected but storage.redis_url is empty".to_string(),
            ));
        }
        if self.auth.tokens.is_empty() {
            warn!("No API tokens configured; every authenticated request will be rejected");
        }
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: default_cors_origins(),
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://127.0.0.1:3000".to_string(),
    ]
}

/// Upstream generative-AI service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenAiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub api_key: String,

    /// Model used for text chat and farming tips
    #[serde(default = "default_text_model")]
    pub text_model: String,

    /// Model used for combined text + speech responses
    #[serde(default = "default_voice_model")]
    pub voice_model: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GenAiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: String::new(),
            text_model: default_text_model(),
            voice_model: default_voice_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_text_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_voice_model() -> String {
    "gemini-2.0-flash-exp".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

/// Which conversation store backs sessions and the tip cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Redis,
}

/// Persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory where generated WAV responses are written
    #[serde(default = "default_audio_dir")]
    pub audio_dir: PathBuf,

    #[serde(default)]
    pub backend: StoreBackend,

    #[serde(default = "default_redis_url")]
    pub redis_url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            audio_dir: default_audio_dir(),
            backend: StoreBackend::default(),
            redis_url: default_redis_url(),
        }
    }
}

fn default_audio_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("agriguide")
        .join("audio")
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

/// Bearer tokens accepted by the API
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub tokens: Vec<ApiToken>,
}

/// A token issued by the identity provider and the user it identifies
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiToken {
    pub token: String,
    pub user: String,
}

impl AuthConfig {
    pub fn user_for_token(&self, token: &str) -> Option<&str> {
        self.tokens
            .iter()
            .find(|t| t.token == token)
            .map(|t| t.user.as_str())
    }
}
