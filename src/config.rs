use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

use crate::error::{DigestError, Result};
use crate::summarize::SummaryMethod;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub summary: SummaryConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// How many recent messages to pull per run
    #[serde(default = "default_max_results")]
    pub max_results: u32,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryConfig {
    /// Summarization method: "abstractive", "textrank", or "openai"
    #[serde(default = "default_method")]
    pub method: String,
    /// OpenAI-compatible endpoint of the local model server
    #[serde(default = "default_ollama_url")]
    pub ollama_url: String,
    #[serde(default = "default_ollama_model")]
    pub ollama_model: String,
    #[serde(default = "default_openai_api_hostname")]
    pub openai_api_hostname: String,
    #[serde(default = "default_openai_model")]
    pub openai_model: String,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            method: default_method(),
            ollama_url: default_ollama_url(),
            ollama_model: default_ollama_model(),
            openai_api_hostname: default_openai_api_hostname(),
            openai_model: default_openai_model(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Email the finished summary back to the user
    #[serde(default)]
    pub email_summary: bool,
    #[serde(default = "default_subject")]
    pub subject: String,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            email_summary: false,
            subject: default_subject(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Google installed-app OAuth client secret file
    #[serde(default = "default_credentials_path")]
    pub credentials_path: String,
    /// Directory holding the per-scope token files
    #[serde(default = "default_token_dir")]
    pub token_dir: String,
    /// Loopback port for the interactive consent redirect
    #[serde(default = "default_redirect_port")]
    pub redirect_port: u16,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            credentials_path: default_credentials_path(),
            token_dir: default_token_dir(),
            redirect_port: default_redirect_port(),
        }
    }
}

fn default_max_results() -> u32 {
    20
}

fn default_method() -> String {
    "abstractive".to_string()
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "llama3.2".to_string()
}

fn default_openai_api_hostname() -> String {
    "https://api.openai.com".to_string()
}

fn default_openai_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_subject() -> String {
    "Your Daily Email Summary".to_string()
}

fn default_credentials_path() -> String {
    "credentials.json".to_string()
}

fn default_token_dir() -> String {
    ".gmail-digest".to_string()
}

fn default_redirect_port() -> u16 {
    8080
}

impl Config {
    pub async fn load(path: &Path) -> Result<Self> {
        // Missing file means defaults, not an error
        if !path.exists() {
            tracing::warn!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| DigestError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| DigestError::Config(format!("Failed to parse config file: {}", e)))?;

        config.validate()?;

        tracing::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                DigestError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| DigestError::Config(format!("Failed to serialize config: {}", e)))?;

        tokio::fs::write(path, content)
            .await
            .map_err(|e| DigestError::Config(format!("Failed to write config file: {}", e)))?;

        tracing::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.fetch.max_results == 0 {
            return Err(DigestError::Config(
                "fetch.max_results must be at least 1".to_string(),
            ));
        }
        // The Gmail list endpoint caps maxResults at 500 per page
        if self.fetch.max_results > 500 {
            return Err(DigestError::Config(
                "fetch.max_results cannot exceed 500".to_string(),
            ));
        }

        // Reject unknown method tags here, before anything downstream sees them
        SummaryMethod::from_str(&self.summary.method)?;

        if self.summary.ollama_url.is_empty() {
            return Err(DigestError::Config(
                "summary.ollama_url cannot be empty".to_string(),
            ));
        }
        if self.summary.openai_api_hostname.is_empty() {
            return Err(DigestError::Config(
                "summary.openai_api_hostname cannot be empty".to_string(),
            ));
        }

        if self.delivery.subject.is_empty() {
            return Err(DigestError::Config(
                "delivery.subject cannot be empty".to_string(),
            ));
        }

        if self.auth.token_dir.is_empty() {
            return Err(DigestError::Config(
                "auth.token_dir cannot be empty".to_string(),
            ));
        }
        if self.auth.redirect_port == 0 {
            return Err(DigestError::Config(
                "auth.redirect_port must be a fixed port".to_string(),
            ));
        }

        tracing::debug!("Configuration validation passed");
        Ok(())
    }

    /// Create an example configuration file
    pub async fn create_example(path: &Path) -> Result<()> {
        let config = Self::default();
        config.save(path).await
    }
}
