use std::io::ErrorKind;
use std::path::Path;

use tokio::fs;

use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::llm::BedrockProvider;

/// Default config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "draftsmith.yaml";

// ============================================================================
// Config (root)
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

impl Config {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = match fs::read_to_string(path).await {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(ConfigError::Io(e)),
        };
        let config: Self = serde_saphyr::from_str(&contents)?;
        config.providers.validate()?;
        Ok(config)
    }
}

// ============================================================================
// ServerConfig
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3001
}

fn default_request_timeout() -> u64 {
    120
}

// ============================================================================
// ProvidersConfig
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct ProvidersConfig {
    /// Bound on a single provider call.
    #[serde(default = "default_provider_timeout")]
    pub timeout_seconds: u64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default)]
    pub bedrock: BedrockConfig,
    #[serde(default)]
    pub openai: OpenAIConfig,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_provider_timeout(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            bedrock: BedrockConfig::default(),
            openai: OpenAIConfig::default(),
        }
    }
}

impl ProvidersConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(ref base_url) = self.bedrock.base_url {
            Url::parse(base_url).map_err(|e| ConfigError::InvalidUrl {
                field: "providers.bedrock.base_url",
                source: e,
            })?;
        }
        Url::parse(&self.openai.base_url).map_err(|e| ConfigError::InvalidUrl {
            field: "providers.openai.base_url",
            source: e,
        })?;
        Ok(())
    }
}

fn default_provider_timeout() -> u64 {
    60
}

fn default_max_tokens() -> u32 {
    4000
}

fn default_temperature() -> f32 {
    0.7
}

// ============================================================================
// BedrockConfig
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct BedrockConfig {
    #[serde(default = "default_bedrock_model")]
    pub model: String,
    /// Overrides the regional runtime endpoint.
    #[serde(default)]
    pub base_url: Option<String>,
}

impl Default for BedrockConfig {
    fn default() -> Self {
        Self {
            model: default_bedrock_model(),
            base_url: None,
        }
    }
}

impl BedrockConfig {
    /// Runtime endpoint: the configured override, else the regional default.
    pub fn endpoint(&self, region: &str) -> Result<Url, url::ParseError> {
        match self.base_url {
            Some(ref base_url) => Url::parse(base_url),
            None => BedrockProvider::regional_endpoint(region),
        }
    }
}

fn default_bedrock_model() -> String {
    "anthropic.claude-3-5-sonnet-20240620-v1:0".to_string()
}

// ============================================================================
// OpenAIConfig
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAIConfig {
    #[serde(default = "default_openai_model")]
    pub model: String,
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            model: default_openai_model(),
            base_url: default_openai_base_url(),
        }
    }
}

fn default_openai_model() -> String {
    "gpt-4.1".to_string()
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

// ============================================================================
// ProviderCredentials
// ============================================================================

pub const ENV_BEDROCK_TOKEN: &str = "AWS_BEARER_TOKEN_BEDROCK";
pub const ENV_AWS_REGION: &str = "AWS_REGION";
pub const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";

/// Secrets read from the environment once at startup. Never logged.
#[derive(Clone, Default)]
pub struct ProviderCredentials {
    pub bedrock_token: Option<String>,
    pub aws_region: String,
    pub openai_api_key: Option<String>,
}

impl ProviderCredentials {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            bedrock_token: non_blank(ENV_BEDROCK_TOKEN),
            aws_region: non_blank(ENV_AWS_REGION).unwrap_or_else(|| "us-west-2".to_string()),
            openai_api_key: non_blank(ENV_OPENAI_API_KEY),
        }
    }
}

impl std::fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderCredentials")
            .field("bedrock_token", &self.bedrock_token.as_ref().map(|_| "***"))
            .field("aws_region", &self.aws_region)
            .field("openai_api_key", &self.openai_api_key.as_ref().map(|_| "***"))
            .finish()
    }
}

// ============================================================================
// ConfigError
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Yaml(#[from] serde_saphyr::Error),

    #[error("invalid url in {field}: {source}")]
    InvalidUrl {
        field: &'static str,
        source: url::ParseError,
    },
}

// ============================================================================
// Tests
// ============================================================================
