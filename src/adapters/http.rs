use crate::domain::model::{Catalog, CatalogDocument};
use crate::domain::ports::{CatalogLoader, ManifestFetcher};
use crate::utils::error::FetchError;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// reqwest-backed fetcher for catalog indexes and manifest documents.
/// `file://` locations are read from disk.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("automation-catalog/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    async fn read_local(&self, location: &str) -> Result<String, FetchError> {
        let path = location
            .strip_prefix("file://")
            .or_else(|| location.strip_prefix("file:"))
            .unwrap_or(location);
        tokio::fs::read_to_string(path)
            .await
            .map_err(|source| FetchError::Io {
                path: path.to_string(),
                source,
            })
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

#[async_trait]
impl ManifestFetcher for HttpFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        if url.starts_with("file:") {
            return self.read_local(url).await;
        }

        tracing::debug!("Making request to: {}", url);
        let response = self.client.get(url).send().await?;
        let status = response.status();
        tracing::debug!("Response status: {}", status);

        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl CatalogLoader for HttpFetcher {
    async fn load_catalog(&self, urls: &[String]) -> Result<Catalog, FetchError> {
        let mut catalog = Catalog::default();

        for url in urls {
            let text = self.fetch_text(url).await?;
            let document: CatalogDocument =
                serde_yaml_ng::from_str(&text).map_err(|e| FetchError::Parse {
                    url: url.clone(),
                    message: e.to_string(),
                })?;
            tracing::debug!(
                "📂 {}: {} modules, {} categories, {} boms",
                url,
                document.modules.len(),
                document.categories.len(),
                document.boms.len()
            );
            catalog.merge(document);
        }

        Ok(catalog)
    }
}
