use crate::core::catalog_store::CatalogStore;
use crate::core::manifest::{catalog_urls_for, parse_metadata};
use crate::core::solution_resolver::SolutionResolver;
use crate::core::{
    BundleBuilder, BundleFormat, BundleOptions, Catalog, CatalogEntry, ManifestFetcher, Storage,
};
use crate::utils::error::{CatalogError, Result};
use std::collections::HashSet;
use std::sync::Arc;

pub fn bundle_path(solution_id: &str) -> String {
    format!("solutions/{}/automation.zip", solution_id)
}

/// Packages a solution's resolved BOMs into a downloadable archive.
pub struct SolutionExporter<S: Storage> {
    store: Arc<CatalogStore<S>>,
    resolver: Arc<SolutionResolver<S>>,
    fetcher: Arc<dyn ManifestFetcher>,
    builder: Arc<dyn BundleBuilder>,
}

impl<S: Storage> SolutionExporter<S> {
    pub fn new(
        store: Arc<CatalogStore<S>>,
        resolver: Arc<SolutionResolver<S>>,
        fetcher: Arc<dyn ManifestFetcher>,
        builder: Arc<dyn BundleBuilder>,
    ) -> Self {
        Self {
            store,
            resolver,
            fetcher,
            builder,
        }
    }

    /// Returns the storage path the archive was written to.
    pub async fn export_solution(&self, solution_id: &str, options: &BundleOptions) -> Result<String> {
        let catalog = self.store.get_catalog().await?;
        let Some(solution) = catalog.solution(solution_id) else {
            return Err(CatalogError::NotFound {
                id: solution_id.to_string(),
            });
        };

        let bom_ids = self.resolver.resolve_solution_boms(solution_id).await?;
        let catalog = self
            .bundle_catalog(solution_id, solution.metadata_url(), catalog.clone())
            .await?;

        let mut seen = HashSet::new();
        let entries: Vec<CatalogEntry> = bom_ids
            .iter()
            .filter(|id| seen.insert(id.as_str()))
            .filter_map(|id| {
                let entry = catalog.entry(id).cloned();
                if entry.is_none() {
                    tracing::warn!("{}: BOM {} is not in the catalog, skipping", solution_id, id);
                }
                entry
            })
            .collect();

        tracing::info!("📦 Exporting {} with {} BOMs", solution_id, entries.len());
        let handle = self.builder.build_bundle(&catalog, &entries).await?;
        let bytes = self
            .builder
            .write_bundle(&handle, BundleFormat::Zip, options)
            .await?;

        let path = bundle_path(solution_id);
        self.store.storage().write_file(&path, &bytes).await?;
        tracing::info!("✅ Bundle written to {} ({} bytes)", path, bytes.len());
        Ok(path)
    }

    /// 方案可透過 `catalogUrl*` 註記加入額外的目錄來源
    async fn bundle_catalog(
        &self,
        solution_id: &str,
        metadata_url: Option<&str>,
        base: Arc<Catalog>,
    ) -> Result<Arc<Catalog>> {
        let Some(url) = metadata_url else {
            return Ok(base);
        };
        let metadata = match self.fetcher.fetch_text(url).await {
            Ok(text) => parse_metadata(&text),
            Err(e) => Err(e.into()),
        };
        let metadata = match metadata {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::warn!("{}: no manifest metadata, using base catalog: {}", solution_id, e);
                return Ok(base);
            }
        };

        let base_urls = self.store.catalog_urls();
        let urls = catalog_urls_for(&[metadata], base_urls);
        if urls.as_slice() == base_urls {
            return Ok(base);
        }

        tracing::info!("{}: bundling from {}", solution_id, urls.join(", "));
        Ok(Arc::new(self.store.load_catalog_from(&urls).await?))
    }
}
