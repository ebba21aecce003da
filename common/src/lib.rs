/*!
common/src/lib.rs

Shared configuration types for Newscast.

This file provides:
- Config data structures (deserialized from TOML)
- An async loader that merges a default file with an optional override file
- Environment overrides applied once at process start
*/

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_FEED_URL: &str = "https://techcrunch.com/feed/";
pub const DEFAULT_FEED_LIMIT: usize = 10;
pub const DEFAULT_PROVIDER: &str = "gemini";

/// HTTP server section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind: Option<String>,
    pub port: Option<u16>,
    /// Origins allowed by the CORS fairing. `"*"` allows any origin.
    pub cors_origins: Option<Vec<String>>,
}

/// RSS source section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedConfig {
    pub url: Option<String>,
    /// Number of entries requested by `GET /api/news`
    pub limit: Option<usize>,
    pub fetch_timeout_seconds: Option<u64>,
}

/// Vendor endpoint settings, one table per provider (`[ai.gemini]`, `[ai.openai]`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub api_url: Option<String>,
    /// Name of the environment variable holding the API key
    pub api_key_env: Option<String>,
    pub model: Option<String>,
    pub speech_model: Option<String>,
    pub voice: Option<String>,
    pub timeout_seconds: Option<u64>,
}

/// AI section: which provider is active for the whole process, plus vendor settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AiConfig {
    pub provider: Option<String>, // "gemini", "openai"
    pub gemini: Option<ProviderConfig>,
    pub openai: Option<ProviderConfig>,
}

/// Summarization fan-out settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub workers: Option<usize>,
    pub task_timeout_seconds: Option<u64>,
    pub batch_timeout_seconds: Option<u64>,
}

/// Top-level application configuration (deserialized from config.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl Config {
    /// Load configuration from a TOML file asynchronously.
    ///
    /// Example:
    ///   let cfg = Config::from_file("config.toml").await?;
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = tokio::fs::read_to_string(path.as_ref())
            .await
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let cfg: Config = toml::from_str(&data).context("Failed to parse TOML configuration")?;
        Ok(cfg)
    }

    /// Load configuration with an optional default file and an optional override file.
    /// If both are present, they are merged (override takes precedence). Missing files
    /// are skipped, so with neither present every section falls back to its defaults.
    pub async fn load_with_defaults(
        default_path: Option<&Path>,
        override_path: Option<&Path>,
    ) -> Result<Self> {
        let mut config_value = toml::Value::Table(toml::map::Map::new());

        for path in [default_path, override_path].into_iter().flatten() {
            if !path.exists() {
                continue;
            }
            let data = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let val: toml::Value = toml::from_str(&data)
                .with_context(|| format!("Failed to parse configuration: {}", path.display()))?;
            merge_toml(&mut config_value, val);
        }

        let cfg: Config = config_value
            .try_into()
            .context("Failed to parse merged configuration")?;
        Ok(cfg)
    }

    /// Apply process environment overrides. Called once at startup; the result is
    /// never mutated afterwards.
    ///
    /// Recognized variables: `AI_PROVIDER`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(provider) = lookup("AI_PROVIDER").filter(|p| !p.trim().is_empty()) {
            self.ai.provider = Some(provider);
        }
    }

    /// Active provider name, lowercased. Defaults to `gemini`.
    pub fn provider_name(&self) -> String {
        self.ai
            .provider
            .as_deref()
            .unwrap_or(DEFAULT_PROVIDER)
            .trim()
            .to_lowercase()
    }

    pub fn feed_url(&self) -> &str {
        self.feed.url.as_deref().unwrap_or(DEFAULT_FEED_URL)
    }

    pub fn feed_limit(&self) -> usize {
        self.feed.limit.unwrap_or(DEFAULT_FEED_LIMIT)
    }
}

fn merge_toml(a: &mut toml::Value, b: toml::Value) {
    match (a, b) {
        (toml::Value::Table(a_map), toml::Value::Table(b_map)) => {
            for (k, v) in b_map {
                if let Some(a_val) = a_map.get_mut(&k) {
                    merge_toml(a_val, v);
                } else {
                    a_map.insert(k, v);
                }
            }
        }
        (a_val, b_val) => *a_val = b_val,
    }
}
