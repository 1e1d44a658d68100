//! Configuration management
//!
//! This module handles loading, validation, and management of the Foreman configuration.
//! Configuration is stored in TOML format at ~/.foreman/config.toml.
//!
//! # Configuration Sections
//!
//! - **core**: Log level
//! - **llm**: Model provider selection, endpoints and request timeout
//! - **executor**: Live or stub step execution
//!
//! API keys are never stored here. Each provider section names the
//! environment variable its key is read from (see `crate::secrets`).
//!
//! # Examples
//!
//! ```no_run
//! use foreman_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_or_create()?;
//!
//! println!("Provider: {}", config.llm.provider);
//! println!("Model: {}", config.llm.active_provider().map(|p| p.model.as_str()).unwrap_or("mock"));
//! # Ok(())
//! # }
//! ```

use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::conductor::executor::{ExecutionMode, ExecutorConfig};

/// Providers accepted in `llm.provider`
pub const PROVIDERS: [&str; 3] = ["openrouter", "openai", "mock"];

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Core settings
    #[serde(default)]
    pub core: CoreConfig,

    /// LLM provider configuration
    #[serde(default)]
    pub llm: LLMConfig,

    /// Step execution settings
    #[serde(default)]
    pub executor: ExecutorConfig,
}

/// Core configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    /// Active provider (openrouter, openai, mock)
    #[serde(default = "default_provider")]
    pub provider: String,

    /// HTTP request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// OpenRouter settings
    #[serde(default = "ProviderConfig::openrouter")]
    pub openrouter: ProviderConfig,

    /// OpenAI settings
    #[serde(default = "ProviderConfig::openai")]
    pub openai: ProviderConfig,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            timeout_secs: default_timeout_secs(),
            openrouter: ProviderConfig::openrouter(),
            openai: ProviderConfig::openai(),
        }
    }
}

impl LLMConfig {
    /// Endpoint settings for the active provider; `None` for the mock
    pub fn active_provider(&self) -> Option<&ProviderConfig> {
        match self.provider.as_str() {
            "openrouter" => Some(&self.openrouter),
            "openai" => Some(&self.openai),
            _ => None,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Endpoint settings for an OpenAI-compatible provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Base URL; `/chat/completions` is appended
    pub base_url: String,

    /// Model name
    pub model: String,

    /// Environment variable holding the API key
    pub api_key_env: String,
}

impl ProviderConfig {
    pub fn openrouter() -> Self {
        Self {
            base_url: "https://openrouter.ai/api/v1".to_string(),
            model: "deepseek/deepseek-r1:free".to_string(),
            api_key_env: "OPENROUTER_API_KEY".to_string(),
        }
    }

    pub fn openai() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_provider() -> String {
    "openrouter".to_string()
}

fn default_timeout_secs() -> u64 {
    300
}

impl Config {
    /// Load configuration from the default location (~/.foreman/config.toml)
    ///
    /// If the configuration file doesn't exist, writes a default configuration
    /// there and returns it.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file cannot be read or written
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load_or_create() -> Result<Self, EngineError> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            Self::create_default(&config_path)
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, EngineError> {
        let config: Config = toml::from_str(contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Create default configuration and save to path
    fn create_default(path: &Path) -> Result<Self, EngineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EngineError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let config = Self::default();
        config.validate()?;

        let toml_string = toml::to_string_pretty(&config)
            .map_err(|e| EngineError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| EngineError::Config(format!("Failed to write config file: {}", e)))?;

        tracing::info!("Wrote default configuration to {}", path.display());

        Ok(config)
    }

    /// Get the default configuration file path (~/.foreman/config.toml)
    pub fn default_config_path() -> Result<PathBuf, EngineError> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".foreman").join("config.toml"))
    }

    /// Validate field values that serde cannot check
    pub fn validate(&self) -> Result<(), EngineError> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        if !PROVIDERS.contains(&self.llm.provider.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid provider '{}'. Must be one of: {}",
                self.llm.provider,
                PROVIDERS.join(", ")
            )));
        }

        if self.llm.timeout_secs == 0 {
            return Err(EngineError::Config(
                "timeout_secs must be greater than 0".to_string(),
            ));
        }

        if let Some(provider) = self.llm.active_provider() {
            if provider.base_url.trim().is_empty() || provider.model.trim().is_empty() {
                return Err(EngineError::Config(format!(
                    "Provider '{}' needs both base_url and model",
                    self.llm.provider
                )));
            }
        }

        if self.executor.mode == ExecutionMode::Stub && self.executor.stub_output.is_empty() {
            return Err(EngineError::Config(
                "executor.stub_output must not be empty in stub mode".to_string(),
            ));
        }

        Ok(())
    }
}
