//! Configuration loading and validation
//!
//! All settings come from the environment (optionally a `.env` file).
//! Credentials are held as [`SecretString`] and never serialized.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Top-level service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Generative model provider settings
    pub model: ModelConfig,
    /// Sandbox provider settings
    pub sandbox: SandboxProviderConfig,
}

/// Generative model (Gemini) provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// API key
    #[serde(skip_serializing, default = "default_secret")]
    pub api_key: SecretString,
    /// Model identifier
    #[serde(default = "default_model")]
    pub model: String,
    /// Base URL
    #[serde(default = "default_model_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_model_timeout")]
    pub timeout_secs: u64,
}

/// Sandbox (Daytona) provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxProviderConfig {
    /// API key
    #[serde(skip_serializing, default = "default_secret")]
    pub api_key: SecretString,
    /// Base URL of the provider API
    #[serde(default = "default_sandbox_url")]
    pub base_url: String,
    /// Per-command execution timeout in seconds
    #[serde(default = "default_exec_timeout")]
    pub exec_timeout_secs: u64,
}

fn default_secret() -> SecretString {
    SecretString::from(String::new())
}

fn default_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_model_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_model_timeout() -> u64 {
    120
}

fn default_sandbox_url() -> String {
    "https://app.daytona.io/api".to_string()
}

fn default_exec_timeout() -> u64 {
    300
}

impl Default for Config {
    fn default() -> Self {
        Config {
            model: ModelConfig::default(),
            sandbox: SandboxProviderConfig::default(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig {
            api_key: default_secret(),
            model: default_model(),
            base_url: default_model_url(),
            timeout_secs: default_model_timeout(),
        }
    }
}

impl Default for SandboxProviderConfig {
    fn default() -> Self {
        SandboxProviderConfig {
            api_key: default_secret(),
            base_url: default_sandbox_url(),
            exec_timeout_secs: default_exec_timeout(),
        }
    }
}

impl Config {
    /// Verify that both provider credentials are present.
    ///
    /// Called per request before any remote call is made, so a misconfigured
    /// deployment reports a clear error instead of a provider failure.
    pub fn validate(&self) -> Result<()> {
        if self.model.api_key.expose_secret().is_empty() {
            return Err(Error::MissingConfiguration(
                "GEMINI_API_KEY is not set".to_string(),
            ));
        }
        if self.sandbox.api_key.expose_secret().is_empty() {
            return Err(Error::MissingConfiguration(
                "DAYTONA_API_KEY is not set".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load configuration from the environment.
///
/// Reads `.env` first if present, then applies environment variables on top
/// of the defaults.
pub fn load_config() -> Result<Config> {
    dotenvy::dotenv().ok();

    let mut config = Config::default();

    if let Ok(api_key) = std::env::var("GEMINI_API_KEY") {
        config.model.api_key = SecretString::from(api_key);
    }
    if let Ok(model) = std::env::var("GEMINI_MODEL") {
        config.model.model = model;
    }
    if let Ok(url) = std::env::var("GEMINI_BASE_URL") {
        config.model.base_url = url;
    }
    if let Ok(timeout) = std::env::var("GEMINI_TIMEOUT") {
        config.model.timeout_secs = timeout
            .parse()
            .map_err(|_| Error::Config(format!("Invalid GEMINI_TIMEOUT: {}", timeout)))?;
    }

    if let Ok(api_key) = std::env::var("DAYTONA_API_KEY") {
        config.sandbox.api_key = SecretString::from(api_key);
    }
    if let Ok(url) = std::env::var("DAYTONA_BASE_URL") {
        config.sandbox.base_url = url;
    }
    if let Ok(timeout) = std::env::var("SANDBOX_EXEC_TIMEOUT") {
        config.sandbox.exec_timeout_secs = timeout
            .parse()
            .map_err(|_| Error::Config(format!("Invalid SANDBOX_EXEC_TIMEOUT: {}", timeout)))?;
    }

    Ok(config)
}
