use crate::config::{default_catalog_urls, EngineConfig};
use crate::core::Environment;
use crate::utils::error::{CatalogError, Result};
use crate::utils::validation::Validate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlSettings {
    #[serde(default)]
    pub catalog: CatalogSection,
    pub cache: Option<CacheSection>,
    pub sync: Option<SyncSection>,
    pub storage: Option<StorageSection>,
    pub http: Option<HttpSection>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogSection {
    pub urls: Option<Vec<String>>,
    pub ttl_hours: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSection {
    pub redis_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSection {
    pub interval_hours: Option<u64>,
    pub environment: Option<Environment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSection {
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpSection {
    pub request_timeout_secs: Option<u64>,
}

fn env_placeholder() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("valid placeholder pattern"))
}

impl TomlSettings {
    /// 從 TOML 檔案載入設定
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(CatalogError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析設定
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| CatalogError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${REDIS_URL})，未設定的變數保留原樣
    fn substitute_env_vars(content: &str) -> String {
        env_placeholder()
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .to_string()
    }

    pub fn into_engine_config(self) -> EngineConfig {
        let defaults = EngineConfig::default();
        // An unresolved placeholder means the variable was not set: run without a cache.
        let redis_url = self
            .cache
            .and_then(|cache| cache.redis_url)
            .filter(|url| !url.trim().is_empty() && !env_placeholder().is_match(url));

        EngineConfig {
            catalog_urls: self.catalog.urls.unwrap_or_else(default_catalog_urls),
            redis_url,
            catalog_ttl_hours: self.catalog.ttl_hours.unwrap_or(defaults.catalog_ttl_hours),
            sync_interval_hours: self
                .sync
                .as_ref()
                .and_then(|sync| sync.interval_hours)
                .unwrap_or(defaults.sync_interval_hours),
            environment: self
                .sync
                .as_ref()
                .and_then(|sync| sync.environment)
                .unwrap_or(defaults.environment),
            data_dir: self
                .storage
                .and_then(|storage| storage.data_dir)
                .unwrap_or(defaults.data_dir),
            request_timeout_secs: self
                .http
                .and_then(|http| http.request_timeout_secs)
                .unwrap_or(defaults.request_timeout_secs),
            verbose: false,
        }
    }
}

impl Validate for TomlSettings {
    fn validate(&self) -> Result<()> {
        self.clone().into_engine_config().validate()
    }
}
