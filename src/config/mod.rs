//! # Configuration
//!
//! TOML configuration for the record API, default round parameters and
//! logging. Every section has defaults, so a config file only needs the
//! values it changes.
//!
//! ```toml
//! [api]
//! base_url = "https://api.shadowstudios.eu.org"
//! key = "your-api-key"
//! timeout_seconds = 10
//!
//! [game]
//! choice_count = 3
//! allowed_wrong_guesses = 1
//! timeout_seconds = 60
//! title = "Who's that?"
//!
//! [logging]
//! level = "info"
//! ```
//!
//! The API key can also come from the `GUESSMON_API_KEY` environment
//! variable, which wins over the file.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

pub const API_KEY_ENV: &str = "GUESSMON_API_KEY";
pub const DEFAULT_API_URL: &str = "https://api.shadowstudios.eu.org";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub game: GameConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub key: String,
    #[serde(default = "default_api_timeout")]
    pub timeout_seconds: u64,
}

/// Defaults applied to rounds started without explicit parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    #[serde(default = "default_choice_count")]
    pub choice_count: u8,
    #[serde(default = "default_allowed_wrong_guesses")]
    pub allowed_wrong_guesses: u8,
    #[serde(default = "default_round_timeout")]
    pub timeout_seconds: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_base_url() -> String { DEFAULT_API_URL.to_string() }
fn default_api_timeout() -> u64 { 10 }
fn default_choice_count() -> u8 { 3 }
fn default_allowed_wrong_guesses() -> u8 { 1 }
fn default_round_timeout() -> u64 { 60 }
fn default_log_level() -> String { "info".to_string() }

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig { base_url: default_base_url(), key: String::new(), timeout_seconds: default_api_timeout() }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            choice_count: default_choice_count(),
            allowed_wrong_guesses: default_allowed_wrong_guesses(),
            timeout_seconds: default_round_timeout(),
            title: None,
            description: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig { level: default_log_level() }
    }
}

impl Config {
    /// Load configuration from a file, then apply environment overrides.
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path).await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let mut config = Self::parse(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;
        config.apply_env();
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content).await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    fn apply_env(&mut self) {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                self.api.key = key.trim().to_string();
            }
        }
    }
}
