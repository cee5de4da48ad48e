use crate::adapters::bundle::ManifestBundleBuilder;
use crate::adapters::http::HttpFetcher;
use crate::adapters::repository::InMemoryRepository;
use crate::adapters::storage::LocalStorage;
use crate::config::EngineConfig;
use crate::core::catalog_store::CatalogStore;
use crate::core::exporter::SolutionExporter;
use crate::core::service_indexer::ServiceIndexer;
use crate::core::solution_resolver::SolutionResolver;
use crate::core::sync::{PublicBomSync, PublicSolutionSync};
use crate::core::sync_scheduler::{CatalogSyncScheduler, SyncDecision};
use crate::core::{
    ArchitectureRecord, BomRecord, BundleBuilder, BundleOptions, CacheService, Catalog, CatalogLoader,
    CatalogSync, Clock, ManifestFetcher, Repository, ServiceSummary, SolutionRecord, Storage,
    SystemClock,
};
use crate::utils::error::Result;
use std::sync::Arc;

/// Collaborators the engine is assembled from.
pub struct EngineParts {
    pub loader: Arc<dyn CatalogLoader>,
    pub fetcher: Arc<dyn ManifestFetcher>,
    pub bundle_builder: Arc<dyn BundleBuilder>,
    pub cache: Option<Arc<dyn CacheService>>,
    pub clock: Arc<dyn Clock>,
    pub solutions: Arc<dyn Repository<SolutionRecord>>,
    pub architectures: Arc<dyn Repository<ArchitectureRecord>>,
    pub boms: Arc<dyn Repository<BomRecord>>,
}

impl EngineParts {
    /// HTTP fetching, in-memory repositories, system clock, no cache.
    pub fn with_fetcher(fetcher: Arc<HttpFetcher>) -> Self {
        Self {
            loader: fetcher.clone(),
            fetcher: fetcher.clone(),
            bundle_builder: Arc::new(ManifestBundleBuilder::new(fetcher)),
            cache: None,
            clock: Arc::new(SystemClock),
            solutions: Arc::new(InMemoryRepository::new()),
            architectures: Arc::new(InMemoryRepository::new()),
            boms: Arc::new(InMemoryRepository::new()),
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
}

/// Entry point tying the catalog components together.
pub struct CatalogEngine<S: Storage + 'static> {
    store: Arc<CatalogStore<S>>,
    indexer: ServiceIndexer<S>,
    resolver: Arc<SolutionResolver<S>>,
    exporter: SolutionExporter<S>,
    scheduler: CatalogSyncScheduler,
    solutions: Arc<dyn Repository<SolutionRecord>>,
    architectures: Arc<dyn Repository<ArchitectureRecord>>,
    boms: Arc<dyn Repository<BomRecord>>,
}

impl CatalogEngine<LocalStorage> {
    /// Builds an engine from configuration: HTTP fetching, local storage under
    /// `data_dir`, and a Redis cache when one is configured.
    pub async fn connect(config: &EngineConfig) -> Result<Self> {
        let fetcher = Arc::new(HttpFetcher::new(config.request_timeout())?);
        let cache = Self::connect_cache(config).await;
        let storage = LocalStorage::new(config.data_dir.clone());

        Ok(Self::new(
            config,
            storage,
            EngineParts::with_fetcher(fetcher).with_cache(cache),
        ))
    }

    #[cfg(feature = "redis")]
    async fn connect_cache(config: &EngineConfig) -> Option<Arc<dyn CacheService>> {
        let url = config.redis_url.as_deref()?;
        match crate::adapters::cache::RedisCache::connect(url).await {
            Ok(cache) => Some(Arc::new(cache)),
            Err(e) => {
                tracing::warn!("⚠️ Cache backend unavailable, continuing without cache: {}", e);
                None
            }
        }
    }

    #[cfg(not(feature = "redis"))]
    async fn connect_cache(config: &EngineConfig) -> Option<Arc<dyn CacheService>> {
        if config.redis_url.is_some() {
            tracing::warn!("⚠️ redis_url is set but the redis feature is disabled; running without cache");
        }
        None
    }
}

impl<S: Storage + 'static> CatalogEngine<S> {
    pub fn new(config: &EngineConfig, storage: S, parts: EngineParts) -> Self {
        let store = Arc::new(
            CatalogStore::new(parts.loader, storage, config.catalog_urls.clone())
                .with_cache(parts.cache.clone())
                .with_clock(parts.clock.clone())
                .with_ttl(config.catalog_ttl()),
        );
        let resolver = Arc::new(SolutionResolver::new(store.clone(), parts.fetcher.clone()));
        let exporter = SolutionExporter::new(
            store.clone(),
            resolver.clone(),
            parts.fetcher.clone(),
            parts.bundle_builder,
        );

        let syncs: Vec<Arc<dyn CatalogSync>> = vec![
            Arc::new(PublicSolutionSync::new(
                store.clone(),
                parts.fetcher.clone(),
                parts.solutions.clone(),
            )),
            Arc::new(PublicBomSync::new(
                store.clone(),
                parts.fetcher,
                parts.architectures.clone(),
                parts.boms.clone(),
            )),
        ];
        let scheduler = CatalogSyncScheduler::new(syncs, config.environment)
            .with_cache(parts.cache)
            .with_clock(parts.clock)
            .with_interval(config.sync_interval());

        Self {
            indexer: ServiceIndexer::new(store.clone()),
            store,
            resolver,
            exporter,
            scheduler,
            solutions: parts.solutions,
            architectures: parts.architectures,
            boms: parts.boms,
        }
    }

    pub async fn catalog(&self) -> Result<Arc<Catalog>> {
        self.store.get_catalog().await
    }

    pub async fn refresh_catalog(&self) -> Result<Arc<Catalog>> {
        self.store.fetch_catalog().await
    }

    pub async fn list_services(&self) -> Result<Vec<ServiceSummary>> {
        self.indexer.list_services().await
    }

    pub async fn get_service(&self, id: &str) -> Result<ServiceSummary> {
        self.indexer.get_service(id).await
    }

    pub async fn resolve_solution_boms(&self, solution_id: &str) -> Result<Vec<String>> {
        self.resolver.resolve_solution_boms(solution_id).await
    }

    pub async fn plan_architectures(
        &self,
        solution_id: Option<&str>,
        explicit: &[String],
    ) -> Result<Vec<String>> {
        self.resolver.plan_architectures(solution_id, explicit).await
    }

    pub async fn export_solution(
        &self,
        solution_id: &str,
        options: &BundleOptions,
    ) -> Result<String> {
        self.exporter.export_solution(solution_id, options).await
    }

    /// Request hook for the serving layer; returns without waiting for any sync.
    pub async fn on_request(&self, target: &str) -> SyncDecision {
        self.scheduler.on_request(target).await
    }

    /// Runs both sync jobs now and waits for them.
    pub async fn sync_now(&self) {
        self.scheduler.trigger();
        self.scheduler.tasks().drain().await;
    }

    /// Lets detached sync jobs finish.
    pub async fn shutdown(&self) {
        let pending = self.scheduler.tasks().in_flight();
        if pending > 0 {
            tracing::info!("Waiting for {} background task(s)", pending);
        }
        self.scheduler.tasks().drain().await;
    }

    pub fn scheduler(&self) -> &CatalogSyncScheduler {
        &self.scheduler
    }

    pub fn solutions(&self) -> &Arc<dyn Repository<SolutionRecord>> {
        &self.solutions
    }

    pub fn architectures(&self) -> &Arc<dyn Repository<ArchitectureRecord>> {
        &self.architectures
    }

    pub fn boms(&self) -> &Arc<dyn Repository<BomRecord>> {
        &self.boms
    }
}
