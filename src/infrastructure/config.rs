//! Configuration infrastructure.
//!
//! Run configuration is a single JSON file with sections per concern:
//! crawler limits, HTTP client, per-site selectors, logging. Loading is
//! forgiving (first run writes the defaults), validation is not —
//! malformed seed URLs or non-positive caps are fatal at startup, the
//! only fatal errors in the system.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::info;
use url::Url;

use crate::crawl_engine::coordinator::EngineSettings;
use crate::domain::task::{CrawlTask, TaskLabel};
use crate::infrastructure::http_fetcher::HttpFetcherConfig;
use crate::infrastructure::selector_adapter::SelectorConfig;

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub crawler: CrawlerConfig,
    pub http: HttpFetcherConfig,
    pub selectors: SelectorConfig,
    pub logging: LoggingConfig,
}

/// A seed URL with its initial routing label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryUrl {
    pub url: String,
    #[serde(default = "default_entry_label")]
    pub label: TaskLabel,
}

fn default_entry_label() -> TaskLabel {
    TaskLabel::Discover
}

/// Crawl limits and seeds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// Last page index the site will serve for one listing/filter view.
    pub page_cap: u32,
    /// Items per listing page.
    pub page_size: u32,
    /// Maximum concurrent in-flight tasks.
    pub max_concurrency: usize,
    /// Retry bound per task.
    pub max_request_retries: u32,
    /// Fixed persistence tick in seconds.
    pub persist_interval_secs: u64,
    /// Seed URLs, each with its initial label.
    pub entry_urls: Vec<EntryUrl>,
    /// Development mode: debug-level logs, local paths.
    #[serde(default)]
    pub development: bool,
    /// Verbose logging without the rest of development mode.
    #[serde(default)]
    pub debug: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            page_cap: 100,
            page_size: 60,
            max_concurrency: 10,
            max_request_retries: 3,
            persist_interval_secs: 60,
            entry_urls: Vec::new(),
            development: false,
            debug: false,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub level: String,
    /// Also write a rotated log file under the data directory.
    pub file_output: bool,
    /// Override for the log directory.
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_output: true,
            log_dir: None,
        }
    }
}

impl AppConfig {
    /// Startup validation; the only place a configuration problem is
    /// allowed to stop the run.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.page_cap == 0 {
            bail!("page_cap must be positive");
        }
        if self.crawler.page_size == 0 {
            bail!("page_size must be positive");
        }
        if self.crawler.max_concurrency == 0 {
            bail!("max_concurrency must be positive");
        }
        if self.crawler.entry_urls.is_empty() {
            bail!("at least one entry URL is required");
        }
        for entry in &self.crawler.entry_urls {
            Url::parse(&entry.url)
                .with_context(|| format!("malformed entry URL: {}", entry.url))?;
        }
        Ok(())
    }

    /// Engine knobs resolved from this configuration.
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            page_cap: self.crawler.page_cap,
            page_size: self.crawler.page_size,
            concurrency: self.crawler.max_concurrency,
            max_retries: self.crawler.max_request_retries,
            persist_interval: Duration::from_secs(self.crawler.persist_interval_secs),
            ..EngineSettings::default()
        }
    }

    /// Seed tasks for the configured entry URLs.
    pub fn seed_tasks(&self) -> Vec<CrawlTask> {
        self.crawler
            .entry_urls
            .iter()
            .map(|entry| CrawlTask::seed(entry.url.clone(), entry.label))
            .collect()
    }
}

/// Loads and persists the configuration file.
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Result<Self> {
        Ok(Self {
            config_path: Self::app_data_dir()?.join("config.json"),
        })
    }

    pub fn with_path(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }

    /// Application data directory (snapshots, output and logs live here too).
    pub fn app_data_dir() -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .context("Failed to get user data directory")?
            .join("catalog-crawler");
        Ok(data_dir)
    }

    /// Load the configuration, writing the defaults on first run.
    pub async fn initialize(&self) -> Result<AppConfig> {
        if !self.config_path.exists() {
            info!(
                "🎉 First run detected - writing default configuration to {:?}",
                self.config_path
            );
            let default_config = AppConfig::default();
            self.save_config(&default_config).await?;
            return Ok(default_config);
        }
        self.load_config().await
    }

    pub async fn load_config(&self) -> Result<AppConfig> {
        let content = fs::read_to_string(&self.config_path)
            .await
            .with_context(|| format!("Failed to read configuration {:?}", self.config_path))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("Invalid configuration file {:?}", self.config_path))?;
        info!("Loaded configuration from {:?}", self.config_path);
        Ok(config)
    }

    pub async fn save_config(&self, config: &AppConfig) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create config directory")?;
        }
        let content =
            serde_json::to_string_pretty(config).context("Failed to serialize configuration")?;
        fs::write(&self.config_path, content)
            .await
            .context("Failed to write configuration file")?;
        info!("Saved configuration to {:?}", self.config_path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.crawler.entry_urls = vec![EntryUrl {
            url: "https://shop.example/catalog".to_string(),
            label: TaskLabel::Discover,
        }];
        config
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_zero_page_cap_is_fatal() {
        let mut config = valid_config();
        config.crawler.page_cap = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_entry_url_is_fatal() {
        let mut config = valid_config();
        config.crawler.entry_urls[0].url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_entries_is_fatal() {
        let config = AppConfig::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_entry_label_defaults_to_discover() {
        let entry: EntryUrl = serde_json::from_str(r#"{"url": "https://shop.example"}"#).unwrap();
        assert_eq!(entry.label, TaskLabel::Discover);
    }

    #[tokio::test]
    async fn test_first_run_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ConfigManager::with_path(dir.path().join("config.json"));
        let config = manager.initialize().await.unwrap();
        assert!(config.crawler.entry_urls.is_empty());
        assert!(dir.path().join("config.json").exists());

        // Second initialize loads the file instead of rewriting it.
        let reloaded = manager.initialize().await.unwrap();
        assert_eq!(reloaded.crawler.page_cap, config.crawler.page_cap);
    }
}
