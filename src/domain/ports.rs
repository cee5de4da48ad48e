use crate::domain::model::{
    ArchitectureRecord, BomRecord, BundleFormat, BundleHandle, BundleOptions, Catalog,
    CatalogEntry, SolutionRecord, SyncReport,
};
use crate::utils::error::{CacheError, FetchError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Fetches and merges catalog source documents.
#[async_trait]
pub trait CatalogLoader: Send + Sync {
    async fn load_catalog(&self, urls: &[String]) -> std::result::Result<Catalog, FetchError>;
}

/// Retrieves a raw manifest document as text.
#[async_trait]
pub trait ManifestFetcher: Send + Sync {
    async fn fetch_text(&self, url: &str) -> std::result::Result<String, FetchError>;
}

/// Key-value cache. Every call is best-effort from the engine's point of view.
#[async_trait]
pub trait CacheService: Send + Sync {
    async fn get(&self, key: &str) -> std::result::Result<Option<String>, CacheError>;
    async fn set(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> std::result::Result<(), CacheError>;
}

#[async_trait]
pub trait BundleBuilder: Send + Sync {
    async fn build_bundle(&self, catalog: &Catalog, entries: &[CatalogEntry]) -> Result<BundleHandle>;
    async fn write_bundle(
        &self,
        handle: &BundleHandle,
        format: BundleFormat,
        options: &BundleOptions,
    ) -> Result<Vec<u8>>;
}

pub trait Record: Clone + Send + Sync + 'static {
    fn record_id(&self) -> String;
}

impl Record for SolutionRecord {
    fn record_id(&self) -> String {
        self.id.clone()
    }
}

impl Record for ArchitectureRecord {
    fn record_id(&self) -> String {
        self.arch_id.clone()
    }
}

impl Record for BomRecord {
    fn record_id(&self) -> String {
        format!("{}/{}", self.arch_id, self.desc)
    }
}

/// Durable key-value-by-id store with list capability.
#[async_trait]
pub trait Repository<T: Record>: Send + Sync {
    async fn create(&self, item: T) -> Result<T>;
    async fn find_by_id(&self, id: &str) -> Result<Option<T>>;
    async fn delete_by_id(&self, id: &str) -> Result<bool>;
    async fn list(&self) -> Result<Vec<T>>;
}

/// One background synchronization job.
#[async_trait]
pub trait CatalogSync: Send + Sync {
    fn name(&self) -> &'static str;
    async fn sync(&self) -> Result<SyncReport>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
