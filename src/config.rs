use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::ConfigError;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub podscript: PodscriptConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub ai: AiConfig,
}

#[derive(Debug, Deserialize)]
pub struct PodscriptConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default = "default_listen")]
    pub listen: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

impl Default for PodscriptConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            listen: default_listen(),
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            timezone: default_timezone(),
        }
    }
}

fn default_version() -> u32 {
    1
}
fn default_listen() -> String {
    "127.0.0.1:8080".to_string()
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_timezone() -> String {
    "UTC".to_string()
}

#[derive(Debug, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> String {
    "podscript.db".to_string()
}

#[derive(Debug, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_fetch_timeout")]
    pub timeout: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: default_fetch_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_fetch_timeout() -> String {
    "30s".to_string()
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (compatible; podscript/0.1; +https://github.com/podscript)".to_string()
}

#[derive(Debug, Deserialize)]
pub struct AiConfig {
    /// Providers tried in order before the local fallback.
    #[serde(default = "default_providers")]
    pub providers: Vec<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    #[serde(default = "default_ai_timeout")]
    pub timeout: String,
    #[serde(default = "default_max_content_chars")]
    pub max_content_chars: usize,
    #[serde(default)]
    pub gemini: ProviderConfig,
    #[serde(default)]
    pub openai: ProviderConfig,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            providers: default_providers(),
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
            timeout: default_ai_timeout(),
            max_content_chars: default_max_content_chars(),
            gemini: ProviderConfig::default(),
            openai: ProviderConfig::default(),
        }
    }
}

fn default_providers() -> Vec<String> {
    vec!["gemini".to_string(), "openai".to_string()]
}
fn default_temperature() -> f64 {
    0.7
}
fn default_max_output_tokens() -> u32 {
    8192
}
fn default_ai_timeout() -> String {
    "90s".to_string()
}
fn default_max_content_chars() -> usize {
    12_000
}

/// Per-provider overrides. Unset values fall back to the provider's defaults,
/// and a missing `api_key` is read from the provider's environment variable.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
}

impl Config {
    /// Resolve the database path (relative to data_dir if not absolute).
    pub fn db_path(&self) -> PathBuf {
        let db_path = Path::new(&self.database.path);
        if db_path.is_absolute() {
            db_path.to_path_buf()
        } else {
            self.podscript.data_dir.join(db_path)
        }
    }

    pub fn fetch_timeout(&self) -> Result<Duration> {
        humantime::parse_duration(&self.fetch.timeout).context("parsing fetch timeout")
    }

    pub fn timezone(&self) -> chrono_tz::Tz {
        self.podscript.timezone.parse().unwrap_or(chrono_tz::UTC)
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .map_err(ConfigError::ReadFile)
        .context("reading config file")?;
    let config: Config = toml::from_str(&content).map_err(ConfigError::Parse)?;
    Ok(config)
}

pub fn validate_config(config: &Config) -> Result<()> {
    if config.podscript.version != 1 {
        return Err(ConfigError::Validation(format!(
            "unsupported config version {} (this binary supports version 1)",
            config.podscript.version
        ))
        .into());
    }

    config
        .podscript
        .listen
        .parse::<SocketAddr>()
        .map_err(|e| ConfigError::Validation(format!("listen address '{}': {}", config.podscript.listen, e)))?;

    config
        .podscript
        .timezone
        .parse::<chrono_tz::Tz>()
        .map_err(|_| ConfigError::Validation(format!("unknown timezone '{}'", config.podscript.timezone)))?;

    humantime::parse_duration(&config.fetch.timeout)
        .map_err(|e| ConfigError::Validation(format!("fetch timeout '{}': {}", config.fetch.timeout, e)))?;

    if config.fetch.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation("fetch user_agent must not be empty".to_string()).into());
    }

    humantime::parse_duration(&config.ai.timeout)
        .map_err(|e| ConfigError::Validation(format!("ai timeout '{}': {}", config.ai.timeout, e)))?;

    let mut seen = HashSet::new();
    for provider in &config.ai.providers {
        if !matches!(provider.as_str(), "gemini" | "openai") {
            return Err(ConfigError::Validation(format!(
                "unknown ai provider '{provider}' (expected 'gemini' or 'openai')"
            ))
            .into());
        }
        if !seen.insert(provider) {
            return Err(ConfigError::Validation(format!("duplicate ai provider '{provider}'")).into());
        }
    }

    if !(0.0..=2.0).contains(&config.ai.temperature) {
        return Err(ConfigError::Validation(format!(
            "ai temperature {} out of range (0.0 to 2.0)",
            config.ai.temperature
        ))
        .into());
    }

    if config.ai.max_content_chars == 0 {
        return Err(ConfigError::Validation("ai max_content_chars must be greater than zero".to_string()).into());
    }

    if config.ai.max_output_tokens == 0 {
        return Err(ConfigError::Validation("ai max_output_tokens must be greater than zero".to_string()).into());
    }

    Ok(())
}
