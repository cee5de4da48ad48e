#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

use crate::core::Environment;
use crate::utils::error::Result;
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_CATALOG_URLS: [&str; 2] = [
    "https://cloud-native-toolkit.github.io/automation-solutions/index.yaml",
    "https://modules.cloudnativetoolkit.dev/index.yaml",
];

pub fn default_catalog_urls() -> Vec<String> {
    DEFAULT_CATALOG_URLS.iter().map(|url| url.to_string()).collect()
}

/// Accepts either a JSON array (`["a","b"]`) or a comma separated list.
pub fn parse_catalog_urls(raw: &str) -> Vec<String> {
    let raw = raw.trim();
    if raw.starts_with('[') {
        if let Ok(urls) = serde_json::from_str::<Vec<String>>(raw) {
            return urls;
        }
    }
    raw.split(',')
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::Args))]
#[serde(default)]
pub struct EngineConfig {
    #[cfg_attr(
        feature = "cli",
        arg(
            long = "catalog-url",
            env = "AUTOMATION_CATALOGS",
            default_values_t = default_catalog_urls()
        )
    )]
    pub catalog_urls: Vec<String>,

    #[cfg_attr(feature = "cli", arg(long, env = "REDIS_URL"))]
    pub redis_url: Option<String>,

    #[cfg_attr(feature = "cli", arg(long, default_value_t = 2))]
    pub catalog_ttl_hours: u64,

    #[cfg_attr(feature = "cli", arg(long, default_value_t = 1))]
    pub sync_interval_hours: u64,

    #[cfg_attr(
        feature = "cli",
        arg(long, env = "APP_ENV", default_value_t = Environment::Production)
    )]
    pub environment: Environment,

    #[cfg_attr(feature = "cli", arg(long, default_value = "."))]
    pub data_dir: PathBuf,

    #[cfg_attr(feature = "cli", arg(long, default_value_t = 30))]
    pub request_timeout_secs: u64,

    #[cfg_attr(feature = "cli", arg(long, short, help = "Enable verbose output"))]
    pub verbose: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            catalog_urls: default_catalog_urls(),
            redis_url: None,
            catalog_ttl_hours: 2,
            sync_interval_hours: 1,
            environment: Environment::Production,
            data_dir: PathBuf::from("."),
            request_timeout_secs: 30,
            verbose: false,
        }
    }
}

impl EngineConfig {
    pub fn catalog_ttl(&self) -> Duration {
        Duration::from_secs(self.catalog_ttl_hours * 60 * 60)
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_hours * 60 * 60)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Validate for EngineConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_non_empty_list("catalog_urls", &self.catalog_urls)?;
        for url in &self.catalog_urls {
            validation::validate_url("catalog_urls", url)?;
        }
        if let Some(redis_url) = &self.redis_url {
            validation::validate_redis_url("redis_url", redis_url)?;
        }
        validation::validate_positive_number("catalog_ttl_hours", self.catalog_ttl_hours, 1)?;
        validation::validate_positive_number("sync_interval_hours", self.sync_interval_hours, 1)?;
        validation::validate_positive_number("request_timeout_secs", self.request_timeout_secs, 1)?;
        validation::validate_path("data_dir", &self.data_dir.to_string_lossy())?;
        Ok(())
    }
}
