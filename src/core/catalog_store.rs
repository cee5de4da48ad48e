use crate::core::{CacheService, Catalog, CatalogLoader, Clock, Storage, SystemClock};
use crate::utils::error::{CatalogError, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};

pub const CATALOG_KEY: &str = "automation-catalog";
pub const CATALOG_TIMEOUT_KEY: &str = "automation-catalog-timeout";
pub const FALLBACK_ARTIFACT: &str = ".automation-catalog.ignore.yaml";
pub const DEFAULT_CATALOG_TTL: Duration = Duration::from_secs(2 * 60 * 60);

/// Owns the in-process catalog and mirrors it into the optional cache backend.
///
/// Once a catalog is held in process it is served for the life of the store;
/// freshness marks are only consulted while the store is still cold.
pub struct CatalogStore<S: Storage> {
    loader: Arc<dyn CatalogLoader>,
    cache: Option<Arc<dyn CacheService>>,
    storage: S,
    clock: Arc<dyn Clock>,
    catalog_urls: Vec<String>,
    ttl: Duration,
    current: RwLock<Option<Arc<Catalog>>>,
    refresh: Mutex<()>,
}

impl<S: Storage> CatalogStore<S> {
    pub fn new(loader: Arc<dyn CatalogLoader>, storage: S, catalog_urls: Vec<String>) -> Self {
        Self {
            loader,
            cache: None,
            storage,
            clock: Arc::new(SystemClock),
            catalog_urls,
            ttl: DEFAULT_CATALOG_TTL,
            current: RwLock::new(None),
            refresh: Mutex::new(()),
        }
    }

    pub fn with_cache(mut self, cache: Option<Arc<dyn CacheService>>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn cache(&self) -> Option<&Arc<dyn CacheService>> {
        self.cache.as_ref()
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn catalog_urls(&self) -> &[String] {
        &self.catalog_urls
    }

    pub async fn get_catalog(&self) -> Result<Arc<Catalog>> {
        if let Some(catalog) = self.current.read().await.clone() {
            return Ok(catalog);
        }

        // Single flight: concurrent cold callers wait for the first loader.
        let _guard = self.refresh.lock().await;
        if let Some(catalog) = self.current.read().await.clone() {
            return Ok(catalog);
        }

        match self.cache.clone() {
            Some(cache) => self.load_through_cache(cache.as_ref()).await,
            None => self.fetch_fresh().await,
        }
    }

    /// Forces a refetch and replaces the in-process catalog.
    pub async fn fetch_catalog(&self) -> Result<Arc<Catalog>> {
        let _guard = self.refresh.lock().await;
        self.fetch_fresh().await
    }

    /// One-off load from `urls`; the result is neither held nor cached.
    pub async fn load_catalog_from(&self, urls: &[String]) -> Result<Catalog> {
        self.loader
            .load_catalog(urls)
            .await
            .map_err(CatalogError::CatalogUnavailable)
    }

    async fn load_through_cache(&self, cache: &dyn CacheService) -> Result<Arc<Catalog>> {
        let now = self.clock.now();
        match self.freshness_mark(cache).await {
            Some(expires_at) if expires_at < now => {
                tracing::info!("Catalog cache timed out {}, retrieving catalog...", expires_at);
                self.fetch_fresh().await
            }
            Some(_) => {
                if let Some(catalog) = self.read_cached_payload(cache).await {
                    tracing::info!("Automation Catalog retrieved from cache");
                    return Ok(self.hold(catalog).await);
                }
                // The local artifact may predate the shared mark, so it only covers a failed fetch.
                match self.fetch_fresh().await {
                    Ok(catalog) => Ok(catalog),
                    Err(e) => match self.read_fallback_artifact().await {
                        Some(catalog) => {
                            tracing::warn!(
                                "Catalog fetch failed ({}), restored from {}",
                                e,
                                FALLBACK_ARTIFACT
                            );
                            Ok(self.hold(catalog).await)
                        }
                        None => Err(e),
                    },
                }
            }
            None => self.fetch_fresh().await,
        }
    }

    async fn fetch_fresh(&self) -> Result<Arc<Catalog>> {
        let catalog = self
            .loader
            .load_catalog(&self.catalog_urls)
            .await
            .map_err(CatalogError::CatalogUnavailable)?;
        tracing::info!(
            "📡 Automation Catalog fetched from {}",
            self.catalog_urls.join(", ")
        );

        let payload = serde_json::to_string(&catalog)?;
        if let Some(cache) = &self.cache {
            self.store_in_cache(cache.as_ref(), &payload).await;
        }
        if let Err(e) = self
            .storage
            .write_file(FALLBACK_ARTIFACT, payload.as_bytes())
            .await
        {
            tracing::warn!("Failed to write {}: {}", FALLBACK_ARTIFACT, e);
        }

        Ok(self.hold(catalog).await)
    }

    async fn hold(&self, catalog: Catalog) -> Arc<Catalog> {
        let catalog = Arc::new(catalog);
        *self.current.write().await = Some(catalog.clone());
        catalog
    }

    async fn store_in_cache(&self, cache: &dyn CacheService, payload: &str) {
        match cache.set(CATALOG_KEY, payload, None).await {
            Ok(()) => tracing::debug!("Automation Catalog stored in cache"),
            Err(e) => tracing::warn!("Failed to store catalog in cache: {}", e),
        }

        let ttl = chrono::Duration::from_std(self.ttl).unwrap_or_else(|_| chrono::Duration::zero());
        let expires_at = self.clock.now() + ttl;
        let mark = expires_at.timestamp_millis().to_string();
        match cache.set(CATALOG_TIMEOUT_KEY, &mark, None).await {
            Ok(()) => tracing::debug!("Automation Catalog timeout stored in cache: {}", expires_at),
            Err(e) => tracing::warn!("Failed to store catalog timeout in cache: {}", e),
        }
    }

    async fn freshness_mark(&self, cache: &dyn CacheService) -> Option<DateTime<Utc>> {
        let raw = match cache.get(CATALOG_TIMEOUT_KEY).await {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!("Failed to read catalog timeout from cache: {}", e);
                return None;
            }
        };

        match raw.trim().parse::<i64>() {
            Ok(millis) => DateTime::from_timestamp_millis(millis),
            Err(_) => {
                tracing::warn!("Ignoring malformed catalog timeout '{}'", raw);
                None
            }
        }
    }

    async fn read_cached_payload(&self, cache: &dyn CacheService) -> Option<Catalog> {
        let payload = match cache.get(CATALOG_KEY).await {
            Ok(payload) => payload?,
            Err(e) => {
                tracing::warn!("Failed to read catalog from cache: {}", e);
                return None;
            }
        };

        serde_json::from_str(&payload)
            .map_err(|e| tracing::warn!("Cached catalog is not readable: {}", e))
            .ok()
    }

    async fn read_fallback_artifact(&self) -> Option<Catalog> {
        let data = self.storage.read_file(FALLBACK_ARTIFACT).await.ok()?;
        serde_json::from_slice(&data)
            .map_err(|e| tracing::warn!("{} is not readable: {}", FALLBACK_ARTIFACT, e))
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::cache::MemoryCache;
    use crate::adapters::clock::ManualClock;
    use crate::adapters::storage::MemoryStorage;
    use crate::domain::model::ModuleDescriptor;
    use crate::utils::error::{CacheError, FetchError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingLoader {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingLoader {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail: false,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail: true,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CatalogLoader for CountingLoader {
        async fn load_catalog(&self, _urls: &[String]) -> std::result::Result<Catalog, FetchError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::time::sleep(Duration::from_millis(10)).await;
            if self.fail {
                return Err(FetchError::Status {
                    url: "http://catalog".to_string(),
                    status: 503,
                });
            }
            Ok(Catalog {
                modules: vec![ModuleDescriptor {
                    name: format!("module-{}", call),
                    ..Default::default()
                }],
                ..Default::default()
            })
        }
    }

    struct BrokenCache;

    #[async_trait]
    impl CacheService for BrokenCache {
        async fn get(&self, _key: &str) -> std::result::Result<Option<String>, CacheError> {
            Err(CacheError::Backend("connection refused".to_string()))
        }

        async fn set(
            &self,
            _key: &str,
            _value: &str,
            _ttl: Option<Duration>,
        ) -> std::result::Result<(), CacheError> {
            Err(CacheError::Backend("connection refused".to_string()))
        }
    }

    fn urls() -> Vec<String> {
        vec!["http://catalog/index.yaml".to_string()]
    }

    #[tokio::test]
    async fn test_without_cache_fetches_once_then_holds() {
        let loader = CountingLoader::new();
        let storage = MemoryStorage::new();
        let store = CatalogStore::new(loader.clone(), storage.clone(), urls());

        let first = store.get_catalog().await.unwrap();
        let second = store.get_catalog().await.unwrap();

        assert_eq!(loader.calls(), 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert!(storage.get_file(FALLBACK_ARTIFACT).await.is_some());
    }

    #[tokio::test]
    async fn test_fetch_writes_payload_and_freshness_mark() {
        let clock = Arc::new(ManualClock::at_millis(1_000_000));
        let cache = Arc::new(MemoryCache::new(clock.clone()));
        let store = CatalogStore::new(CountingLoader::new(), MemoryStorage::new(), urls())
            .with_cache(Some(cache.clone()))
            .with_clock(clock.clone());

        store.get_catalog().await.unwrap();

        let mark = cache.get(CATALOG_TIMEOUT_KEY).await.unwrap().unwrap();
        assert_eq!(mark, (1_000_000 + 2 * 60 * 60 * 1000).to_string());
        let payload = cache.get(CATALOG_KEY).await.unwrap().unwrap();
        let cached: Catalog = serde_json::from_str(&payload).unwrap();
        assert_eq!(cached.modules[0].name, "module-1");
    }

    #[tokio::test]
    async fn test_freshness_boundary() {
        let clock = Arc::new(ManualClock::at_millis(0));
        let cache = Arc::new(MemoryCache::new(clock.clone()));
        let loader = CountingLoader::new();

        let warm = CatalogStore::new(loader.clone(), MemoryStorage::new(), urls())
            .with_cache(Some(cache.clone()))
            .with_clock(clock.clone());
        warm.get_catalog().await.unwrap();
        assert_eq!(loader.calls(), 1);

        clock.advance(DEFAULT_CATALOG_TTL - Duration::from_secs(1));
        let before_expiry = CatalogStore::new(loader.clone(), MemoryStorage::new(), urls())
            .with_cache(Some(cache.clone()))
            .with_clock(clock.clone());
        let catalog = before_expiry.get_catalog().await.unwrap();
        assert_eq!(loader.calls(), 1);
        assert_eq!(catalog.modules[0].name, "module-1");

        clock.advance(Duration::from_secs(2));
        let after_expiry = CatalogStore::new(loader.clone(), MemoryStorage::new(), urls())
            .with_cache(Some(cache.clone()))
            .with_clock(clock.clone());
        let catalog = after_expiry.get_catalog().await.unwrap();
        assert_eq!(loader.calls(), 2);
        assert_eq!(catalog.modules[0].name, "module-2");
    }

    #[tokio::test]
    async fn test_evicted_payload_refetches_instead_of_local_artifact() {
        let clock = Arc::new(ManualClock::at_millis(0));
        let cache = Arc::new(MemoryCache::new(clock.clone()));
        let host_a_disk = MemoryStorage::new();
        let loader = CountingLoader::new();

        CatalogStore::new(loader.clone(), host_a_disk.clone(), urls())
            .with_cache(Some(cache.clone()))
            .with_clock(clock.clone())
            .get_catalog()
            .await
            .unwrap();

        // Another host refreshes later and moves the shared mark forward.
        clock.advance(Duration::from_secs(3 * 60 * 60));
        CatalogStore::new(loader.clone(), MemoryStorage::new(), urls())
            .with_cache(Some(cache.clone()))
            .with_clock(clock.clone())
            .fetch_catalog()
            .await
            .unwrap();
        cache.remove(CATALOG_KEY).await;

        let restarted = CatalogStore::new(loader.clone(), host_a_disk.clone(), urls())
            .with_cache(Some(cache.clone()))
            .with_clock(clock.clone());
        let catalog = restarted.get_catalog().await.unwrap();

        assert_eq!(loader.calls(), 3);
        assert_eq!(catalog.modules[0].name, "module-3");
    }

    #[tokio::test]
    async fn test_fallback_artifact_covers_failed_refetch() {
        let clock = Arc::new(ManualClock::at_millis(0));
        let cache = Arc::new(MemoryCache::new(clock.clone()));
        let storage = MemoryStorage::new();

        CatalogStore::new(CountingLoader::new(), storage.clone(), urls())
            .with_cache(Some(cache.clone()))
            .with_clock(clock.clone())
            .get_catalog()
            .await
            .unwrap();
        cache.remove(CATALOG_KEY).await;

        let offline = CountingLoader::failing();
        let cold = CatalogStore::new(offline.clone(), storage.clone(), urls())
            .with_cache(Some(cache.clone()))
            .with_clock(clock.clone());
        let catalog = cold.get_catalog().await.unwrap();
        assert_eq!(offline.calls(), 1);
        assert_eq!(catalog.modules[0].name, "module-1");

        let empty_disk = CatalogStore::new(CountingLoader::failing(), MemoryStorage::new(), urls())
            .with_cache(Some(cache.clone()))
            .with_clock(clock.clone());
        assert!(matches!(
            empty_disk.get_catalog().await,
            Err(CatalogError::CatalogUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_broken_cache_degrades_to_direct_fetch() {
        let loader = CountingLoader::new();
        let store = CatalogStore::new(loader.clone(), MemoryStorage::new(), urls())
            .with_cache(Some(Arc::new(BrokenCache)));

        let catalog = store.get_catalog().await.unwrap();
        assert_eq!(catalog.modules.len(), 1);
        assert_eq!(loader.calls(), 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_catalog_unavailable() {
        let store = CatalogStore::new(CountingLoader::failing(), MemoryStorage::new(), urls());

        let err = store.get_catalog().await.unwrap_err();
        assert!(matches!(err, CatalogError::CatalogUnavailable(_)));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_concurrent_cold_callers_share_one_fetch() {
        let loader = CountingLoader::new();
        let store = Arc::new(CatalogStore::new(loader.clone(), MemoryStorage::new(), urls()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.get_catalog().await.unwrap() })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(loader.calls(), 1);
    }

    #[tokio::test]
    async fn test_fetch_catalog_replaces_held_copy() {
        let loader = CountingLoader::new();
        let store = CatalogStore::new(loader.clone(), MemoryStorage::new(), urls());

        store.get_catalog().await.unwrap();
        store.fetch_catalog().await.unwrap();
        let catalog = store.get_catalog().await.unwrap();

        assert_eq!(loader.calls(), 2);
        assert_eq!(catalog.modules[0].name, "module-2");
    }
}
