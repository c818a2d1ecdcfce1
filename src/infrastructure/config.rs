//! Application configuration: JSON file with full defaults.
//!
//! Every section has a `Default` so a missing file or field never blocks a
//! run; `init-config` writes the sample file users are expected to edit.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{info, warn};

use crate::infrastructure::http_client::HttpClientConfig;

pub const DEFAULT_CONFIG_PATH: &str = "config/config.json";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub rate_limit: RateLimitConfig,
    pub fetch: HttpClientConfig,
    pub scraping: ScrapingConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    /// Product URLs scraped when the CLI is given none.
    pub target_products: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Maximum requests allowed inside the trailing window.
    pub max_requests: usize,
    /// Window length in seconds.
    pub time_window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 10,
            time_window_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapingConfig {
    /// URLs per sequential batch.
    pub batch_size: usize,
    /// Concurrent fetch+extract attempts within a batch.
    pub concurrent_limit: usize,
    /// Attempts for the optional caller-side retry wrapper.
    pub max_retries: u32,
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            batch_size: 5,
            concurrent_limit: 3,
            max_retries: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "data/reviews.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// tracing filter directive, e.g. "info" or "review_harvester=debug".
    pub level: String,
    pub file_output: bool,
    pub log_dir: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_output: false,
            log_dir: "logs".to_string(),
        }
    }
}

impl AppConfig {
    /// Load from a JSON file; a missing file yields defaults, a malformed
    /// file is an error (silent fallback there would hide typos).
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            warn!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: AppConfig = serde_json::from_str(&content)
            .with_context(|| format!("invalid config file {}", path.display()))?;

        info!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let content = serde_json::to_string_pretty(self).context("failed to serialize config")?;
        fs::write(path, content)
            .await
            .with_context(|| format!("failed to write config file {}", path.display()))?;
        Ok(())
    }

    /// Sample configuration written by `init-config`.
    pub fn sample() -> Self {
        Self {
            target_products: vec![
                "https://www.walmart.com/ip/example-product/123456".to_string(),
                "https://www.target.com/p/example-product/-/A-7890123".to_string(),
                "https://www.ulta.com/p/example-product-pimprod2034567".to_string(),
            ],
            ..Self::default()
        }
    }
}
