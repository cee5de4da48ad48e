use crate::core::catalog_store::CatalogStore;
use crate::core::version;
use crate::core::{Catalog, ServiceSummary, Storage};
use crate::utils::error::{CatalogError, Result};
use std::collections::HashSet;
use std::sync::Arc;

pub const MODULES_KEY: &str = "automation-modules";

pub fn module_key(name: &str) -> String {
    format!("module-{}", name)
}

/// Classifies every module and keeps the first occurrence of each name.
pub fn services_from_catalog(catalog: &Catalog) -> Vec<ServiceSummary> {
    let mut seen = HashSet::new();

    catalog
        .modules
        .iter()
        .filter(|module| seen.insert(module.name.as_str()))
        .map(|module| {
            let versions = module.version_strings();
            ServiceSummary {
                id: module.id.clone(),
                name: module.name.clone(),
                alias: module.alias.clone(),
                alias_ids: module.alias_ids.clone(),
                category: module.category.clone(),
                description: module.description.clone(),
                display_name: module.display_name.clone(),
                platforms: module.platforms.clone(),
                provider: module.provider.clone(),
                tags: module.tags.clone(),
                documentation: module.documentation.clone(),
                status: version::classify(&versions),
                versions,
            }
        })
        .collect()
}

pub struct ServiceIndexer<S: Storage> {
    store: Arc<CatalogStore<S>>,
}

impl<S: Storage> ServiceIndexer<S> {
    pub fn new(store: Arc<CatalogStore<S>>) -> Self {
        Self { store }
    }

    pub async fn list_services(&self) -> Result<Vec<ServiceSummary>> {
        if let Some(services) = self.cached_list().await {
            tracing::info!("Automation Modules retrieved from the cache");
            return Ok(services);
        }

        let catalog = self.store.get_catalog().await?;
        let services = services_from_catalog(&catalog);
        self.populate_cache(&services).await;
        Ok(services)
    }

    pub async fn get_service(&self, id: &str) -> Result<ServiceSummary> {
        if let Some(service) = self.cached_service(id).await {
            tracing::info!("Automation Module retrieved from the cache -> {}", id);
            return Ok(service);
        }

        let catalog = self.store.get_catalog().await?;
        let services = services_from_catalog(&catalog);
        self.populate_cache(&services).await;

        services
            .into_iter()
            .find(|service| service.name == id)
            .ok_or_else(|| CatalogError::NotFound { id: id.to_string() })
    }

    async fn cached_list(&self) -> Option<Vec<ServiceSummary>> {
        let cache = self.store.cache()?;
        match cache.get(MODULES_KEY).await {
            Ok(Some(raw)) => serde_json::from_str(&raw)
                .map_err(|e| tracing::warn!("Cached module list is not readable: {}", e))
                .ok(),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("Failed to read {} from cache: {}", MODULES_KEY, e);
                None
            }
        }
    }

    async fn cached_service(&self, id: &str) -> Option<ServiceSummary> {
        let cache = self.store.cache()?;
        let key = module_key(id);
        match cache.get(&key).await {
            Ok(Some(raw)) => serde_json::from_str(&raw)
                .map_err(|e| tracing::warn!("Cached module {} is not readable: {}", key, e))
                .ok(),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("Failed to read {} from cache: {}", key, e);
                None
            }
        }
    }

    /// Module entries share the catalog TTL so they never outlive the catalog they came from.
    async fn populate_cache(&self, services: &[ServiceSummary]) {
        let Some(cache) = self.store.cache() else {
            return;
        };
        let ttl = Some(self.store.ttl());

        for service in services {
            let key = module_key(&service.name);
            let stored = match serde_json::to_string(service) {
                Ok(raw) => cache.set(&key, &raw, ttl).await.map_err(|e| e.to_string()),
                Err(e) => Err(e.to_string()),
            };
            match stored {
                Ok(()) => tracing::debug!("Automation Module stored in cache -> {}", service.name),
                Err(e) => tracing::warn!("Failed to cache {}: {}", key, e),
            }
        }

        match serde_json::to_string(services) {
            Ok(raw) => {
                if let Err(e) = cache.set(MODULES_KEY, &raw, ttl).await {
                    tracing::warn!("Failed to cache {}: {}", MODULES_KEY, e);
                }
            }
            Err(e) => tracing::warn!("Failed to serialize module list: {}", e),
        }
    }
}
